//! Revision manifest for tile model builds

use std::collections::HashMap;

use crate::layers::{Layer, LayerId, LayerKind, LayerRegistry};

/// Snapshot of which layers a tile model build must consider, with the
/// revision each was last observed at.
///
/// Set semantics: an empty manifest filters nothing and includes every
/// layer. A non-empty manifest includes exactly the inserted layers,
/// except that inserting any elevation or land cover layer switches on
/// the whole category ("any inclusion implies category inclusion").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevisionManifest {
    layers: HashMap<LayerId, u64>,
    includes_elevation: bool,
    includes_land_cover: bool,
}

impl RevisionManifest {
    /// Creates an empty, include-everything manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a layer and its current revision.
    pub fn insert(&mut self, layer: &Layer) {
        self.layers.insert(layer.id(), layer.revision());
        match layer.kind() {
            LayerKind::Elevation(_) => self.includes_elevation = true,
            LayerKind::LandCover(_) => self.includes_land_cover = true,
            LayerKind::Color(_) => {}
        }
    }

    /// Returns true if the manifest filters nothing.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of recorded layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if a non-empty manifest omits this layer.
    pub fn excludes(&self, layer: &Layer) -> bool {
        !self.is_empty() && !self.layers.contains_key(&layer.id())
    }

    /// Returns true if this layer id is included.
    pub fn includes(&self, id: LayerId) -> bool {
        self.is_empty() || self.layers.contains_key(&id)
    }

    /// Returns true if the elevation category is included.
    pub fn includes_elevation(&self) -> bool {
        self.is_empty() || self.includes_elevation
    }

    /// Returns true if the land cover category is included.
    pub fn includes_land_cover(&self) -> bool {
        self.is_empty() || self.includes_land_cover
    }

    /// The revision a layer was last observed at, if recorded.
    pub fn recorded_revision(&self, id: LayerId) -> Option<u64> {
        self.layers.get(&id).copied()
    }

    /// Returns true if every recorded layer still present in the
    /// registry has an unchanged revision.
    ///
    /// Layers removed from the registry since they were recorded are
    /// ignored, not treated as stale.
    pub fn in_sync_with(&self, registry: &LayerRegistry) -> bool {
        for (id, recorded) in &self.layers {
            if let Some(layer) = registry.layer(*id) {
                if layer.revision() != *recorded {
                    return false;
                }
            }
        }
        true
    }

    /// Re-records the current revision of every layer still present.
    ///
    /// Revisions only grow, so recorded values are monotonically
    /// non-decreasing.
    pub fn update_revisions(&mut self, registry: &LayerRegistry) {
        for (id, recorded) in self.layers.iter_mut() {
            if let Some(layer) = registry.layer(*id) {
                *recorded = layer.revision();
            }
        }
    }
}

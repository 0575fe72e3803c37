//! Layer registry
//!
//! The registry owns the canonical layer objects: each wraps one data
//! source (color, elevation, or land cover), an open/closed state, and
//! a revision counter bumped whenever the layer's content changes.
//! The assembler reads the registry; mutation (adding and removing
//! layers, bumping revisions, toggling open state) is caller-driven
//! between assemblies. Open state and revisions are atomic so they can
//! change while assemblies for other tiles are in flight.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::landcover::LandCoverCompositor;
use crate::source::{ColorSource, ElevationSource};

/// Unique identity of a layer within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// The data category a layer renders into, with its category-specific
/// payload.
///
/// A closed set: discriminating on this enum replaces runtime type
/// inspection of layer objects.
pub enum LayerKind {
    /// Surface color imagery.
    Color(Arc<dyn ColorSource>),
    /// Terrain elevation.
    Elevation(Arc<dyn ElevationSource>),
    /// Composited land cover classification.
    LandCover(Arc<LandCoverCompositor>),
}

impl LayerKind {
    /// Category name for logging.
    pub fn category(&self) -> &'static str {
        match self {
            LayerKind::Color(_) => "color",
            LayerKind::Elevation(_) => "elevation",
            LayerKind::LandCover(_) => "land-cover",
        }
    }
}

impl fmt::Debug for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerKind::{}", self.category())
    }
}

/// One registry-owned layer.
///
/// Shared by `Arc`: the registry holds the canonical reference, the
/// assembler borrows for the duration of one tile model build.
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    name: String,
    kind: LayerKind,
    open: AtomicBool,
    revision: AtomicU64,
}

impl Layer {
    fn new(id: LayerId, name: String, kind: LayerKind) -> Self {
        Self {
            id,
            name,
            kind,
            open: AtomicBool::new(true),
            revision: AtomicU64::new(0),
        }
    }

    /// This layer's identity.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Human-readable layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The layer's category and payload.
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Returns true if the layer is open for reading.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Opens or closes the layer.
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }

    /// Current revision, bumped on every content change.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Marks the layer's content as changed.
    pub fn bump_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Ordered set of active layers.
///
/// Layer order is render order: for color layers it is the stacking
/// order of the produced tile model entries.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: Vec<Arc<Layer>>,
    next_id: u64,
    data_model_revision: u64,
}

impl LayerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer at the end of the render order, returning the
    /// canonical shared handle.
    pub fn add_layer(&mut self, name: impl Into<String>, kind: LayerKind) -> Arc<Layer> {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.data_model_revision += 1;
        let layer = Arc::new(Layer::new(id, name.into(), kind));
        debug!(id = %layer.id, name = %layer.name, category = layer.kind.category(), "layer added");
        self.layers.push(Arc::clone(&layer));
        layer
    }

    /// Removes a layer, returning its handle if it was present.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Arc<Layer>> {
        let index = self.layers.iter().position(|l| l.id == id)?;
        self.data_model_revision += 1;
        debug!(id = %id, "layer removed");
        Some(self.layers.remove(index))
    }

    /// Looks up a layer by id.
    pub fn layer(&self, id: LayerId) -> Option<&Arc<Layer>> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// All layers in render order.
    pub fn layers(&self) -> &[Arc<Layer>] {
        &self.layers
    }

    /// Revision of the layer set itself, bumped on add and remove.
    pub fn data_model_revision(&self) -> u64 {
        self.data_model_revision
    }
}

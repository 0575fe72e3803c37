//! Assembled per-tile data model

use std::sync::Arc;

use crate::coord::{ScaleBias, TileKey};
use crate::layers::LayerId;
use crate::raster::{ClassRaster, Heightfield, TextureHandle};

/// How a category's data was resolved during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryResolution {
    /// Data existed at the exact requested address.
    Direct,
    /// Data came from an ancestor this many levels up.
    Fallback(u32),
    /// No source covered this address; the entry carries the empty
    /// placeholder.
    Absent,
}

/// One color layer's contribution to a tile model.
#[derive(Debug, Clone)]
pub struct ColorLayerModel {
    pub layer: LayerId,
    pub texture: TextureHandle,
    pub scale_bias: ScaleBias,
    pub revision: u64,
    pub resolution: CategoryResolution,
}

/// The tile's elevation data.
#[derive(Debug, Clone)]
pub struct ElevationModel {
    pub heightfield: Arc<Heightfield>,
    pub scale_bias: ScaleBias,
    /// Combined revision over every open elevation layer.
    pub revision: u64,
    pub resolution: CategoryResolution,
}

/// The tile's composited land cover classification.
#[derive(Debug, Clone)]
pub struct LandCoverModel {
    pub layer: LayerId,
    pub raster: Arc<ClassRaster>,
    pub scale_bias: ScaleBias,
    /// Combined revision over every open land cover layer.
    pub revision: u64,
    pub resolution: CategoryResolution,
}

/// The complete data model assembled for one tile: per category, a
/// raster handle plus the transform mapping the tile's UV space into
/// the raster.
///
/// Immutable once returned; a layer change is observed through the
/// manifest going stale, which triggers a fresh assembly rather than
/// mutation in place.
#[derive(Debug, Clone)]
pub struct TileModel {
    pub key: TileKey,
    /// The registry's data model revision at assembly time.
    pub revision: u64,
    /// Color entries in render order.
    pub color_layers: Vec<ColorLayerModel>,
    pub elevation: Option<ElevationModel>,
    pub land_cover: Option<LandCoverModel>,
}

impl TileModel {
    pub(crate) fn new(key: TileKey, revision: u64) -> Self {
        Self {
            key,
            revision,
            color_layers: Vec::new(),
            elevation: None,
            land_cover: None,
        }
    }

    /// Finds the color entry contributed by a layer.
    pub fn color_layer(&self, id: LayerId) -> Option<&ColorLayerModel> {
        self.color_layers.iter().find(|m| m.layer == id)
    }
}

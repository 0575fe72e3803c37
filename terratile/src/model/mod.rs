//! Tile model assembly: manifests, per-category models, and the
//! assembler that builds them.
//!
//! ```text
//!                      +--------------------+
//!   LayerRegistry ---->|                    |       TileModel
//!   TileKey ---------->| TileModelAssembler |-----> +- color layers
//!   RevisionManifest ->|                    |       +- elevation
//!                      +--------------------+       +- land cover
//! ```
//!
//! The [`RevisionManifest`] both filters which layers participate in a
//! build and records the layer revisions the resulting model was built
//! from, so consumers can later ask whether the model is stale.

mod assembler;
mod manifest;
mod tile_model;

pub use assembler::{AssemblerOptions, AssemblyError, TileModelAssembler};
pub use manifest::RevisionManifest;
pub use tile_model::{
    CategoryResolution, ColorLayerModel, ElevationModel, LandCoverModel, TileModel,
};

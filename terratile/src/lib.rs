//! Terratile - terrain tile model assembly and land cover compositing
//!
//! This library builds renderer-agnostic tile models for a quadtree
//! terrain pyramid: color imagery, elevation heightfields, and a
//! classified land cover raster composited from multiple coverage
//! sources through a shared class dictionary.
//!
//! # High-Level API
//!
//! ```ignore
//! use terratile::layers::{LayerKind, LayerRegistry};
//! use terratile::model::{AssemblerOptions, RevisionManifest, TileModelAssembler};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut registry = LayerRegistry::new();
//! registry.add_layer("imagery", LayerKind::Color(imagery_source));
//! registry.add_layer("terrain", LayerKind::Elevation(elevation_source));
//!
//! let assembler = TileModelAssembler::new(AssemblerOptions::default());
//! let model = assembler.create_tile_model(
//!     &registry,
//!     &key,
//!     &RevisionManifest::default(),
//!     &CancellationToken::new(),
//! )?;
//! ```

pub mod coord;
pub mod landcover;
pub mod layers;
pub mod model;
pub mod raster;
pub mod source;

/// Version of the terratile library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

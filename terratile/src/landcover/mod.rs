//! Land cover classification
//!
//! Everything needed to turn a stack of raw classified rasters into
//! one per-tile land cover raster in a shared class vocabulary:
//!
//! - [`ClassDictionary`] - the shared vocabulary
//! - [`CodeMap`] - per-source raw-code remap tables
//! - [`LandCoverCompositor`] - the ordered merge with noise-based
//!   boundary warping
//!
//! # Pipeline
//!
//! ```text
//! CoverageSource ─┐
//! CoverageSource ─┼─► LandCoverCompositor ──► ClassRaster
//! CoverageSource ─┘         │
//!                    CodeMap per source
//!                    TiledNoise warping
//! ```

mod codemap;
mod compositor;
mod dictionary;
mod noise;

pub use codemap::{CodeMap, CodeMapping};
pub use compositor::{CompositorOptions, CoverageSlot, LandCoverCompositor};
pub use dictionary::{ClassDictionary, LandCoverClass};
pub use noise::TiledNoise;

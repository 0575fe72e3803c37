//! Quadtree tile addressing
//!
//! Provides the [`TileKey`] value type identifying a tile within a
//! [`TilingProfile`], plus the [`ScaleBias`] transform that maps a
//! finer tile's normalized UV coordinates into a coarser ancestor's.

mod scale_bias;
mod types;


pub use scale_bias::ScaleBias;
pub use types::{Ancestors, Extent, KeyError, TileKey, TilingProfile, MAX_LEVEL};

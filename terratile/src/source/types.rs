//! Raster source traits and errors

use image::RgbaImage;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::coord::TileKey;
use crate::raster::{CodeRaster, Heightfield};

/// Errors that can occur fetching tile data from a source.
///
/// "No data at this address" is not an error; fetches report it as
/// `Ok(None)` so callers can fall back to an ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The operation was cancelled by the caller
    #[error("tile operation cancelled")]
    Cancelled,

    /// The underlying source failed (I/O, decode, protocol)
    #[error("source error: {0}")]
    Source(String),
}

/// A source of raw classified coverage rasters.
///
/// Implementations must be safe to call concurrently for different
/// tiles. `Ok(None)` means the source has no data at this exact
/// address.
pub trait CoverageSource: Send + Sync {
    /// Fetches the raw classification raster for a tile, if present.
    fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Option<CodeRaster>, SourceError>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

/// A source of color imagery rasters.
pub trait ColorSource: Send + Sync {
    /// Fetches the color raster for a tile, if present.
    fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Option<RgbaImage>, SourceError>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

/// A source of elevation heightfields.
pub trait ElevationSource: Send + Sync {
    /// Fetches the heightfield for a tile, if present.
    fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Option<Heightfield>, SourceError>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

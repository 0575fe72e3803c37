//! Ancestor-chain resolution
//!
//! Generic "resolve data at a key by walking toward the root" used by
//! the color, elevation, and land cover paths. A request for a tile
//! whose source lacks native-resolution data is satisfied by the
//! nearest ancestor that has any, together with the [`ScaleBias`]
//! mapping the requested tile's UV space into the ancestor's.

use tokio_util::sync::CancellationToken;

use crate::coord::{ScaleBias, TileKey};
use crate::source::SourceError;

/// The best-available raster found for a requested key.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorSample<R> {
    /// The raster supplied by `found_key`.
    pub raster: R,
    /// The address that actually had data; never finer than requested.
    pub found_key: TileKey,
    /// Maps the requested key's UV space into `found_key`'s.
    pub scale_bias: ScaleBias,
}

impl<R> AncestorSample<R> {
    /// Number of levels walked from the requested key.
    pub fn hops_from(&self, requested: &TileKey) -> u32 {
        requested.level() - self.found_key.level()
    }
}

/// Resolves the best-available raster for `key` by trying the key
/// itself, then each successive ancestor, until `fetch` yields data or
/// the chain is exhausted at the root.
///
/// The transform is derived directly from the requested and found
/// extents in a single step (not composed per hop; the standalone
/// whole-category fallback in the assembler is the composing variant).
///
/// Cancellation is checked before every hop; a cancelled walk reports
/// [`SourceError::Cancelled`] rather than continuing.
pub fn sample_ancestors<R, F>(
    key: &TileKey,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<Option<AncestorSample<R>>, SourceError>
where
    F: FnMut(&TileKey) -> Result<Option<R>, SourceError>,
{
    for candidate in key.ancestors() {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        if let Some(raster) = fetch(&candidate)? {
            let scale_bias = ScaleBias::between(&key.extent(), &candidate.extent());
            return Ok(Some(AncestorSample {
                raster,
                found_key: candidate,
                scale_bias,
            }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TilingProfile;

    fn key(level: u32, x: u32, y: u32) -> TileKey {
        TileKey::new(level, x, y, TilingProfile::GlobalGeodetic).unwrap()
    }

    #[test]
    fn test_direct_hit_has_identity_transform() {
        let k = key(3, 5, 2);
        let cancel = CancellationToken::new();

        let sample = sample_ancestors(&k, &cancel, |candidate| {
            Ok(Some(candidate.level())) // any payload; hit immediately
        })
        .unwrap()
        .unwrap();

        assert_eq!(sample.found_key, k);
        assert_eq!(sample.hops_from(&k), 0);
        assert!(sample.scale_bias.is_identity());
    }

    #[test]
    fn test_walks_to_ancestor_with_data() {
        let k = key(4, 9, 5);
        let cancel = CancellationToken::new();
        let mut tried = Vec::new();

        let sample = sample_ancestors(&k, &cancel, |candidate| {
            tried.push(*candidate);
            if candidate.level() == 1 {
                Ok(Some("data"))
            } else {
                Ok(None)
            }
        })
        .unwrap()
        .unwrap();

        assert_eq!(sample.found_key.level(), 1);
        assert_eq!(sample.hops_from(&k), 3);
        // Every tried key is on the ancestor chain, coarsening monotonically.
        for pair in tried.windows(2) {
            assert_eq!(pair[1], pair[0].parent().unwrap());
        }
        // Three-hop child-to-ancestor scale is 2^-3 per axis.
        assert!((sample.scale_bias.scale[0] - 0.125).abs() < 1e-12);
        assert!((sample.scale_bias.scale[1] - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_exhausted_chain_reports_not_found() {
        let k = key(2, 1, 1);
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result: Option<AncestorSample<()>> = sample_ancestors(&k, &cancel, |_| {
            calls += 1;
            Ok(None)
        })
        .unwrap();

        assert!(result.is_none());
        assert_eq!(calls, 3, "level 2 chain is the key plus two ancestors");
    }

    #[test]
    fn test_cancellation_stops_walk() {
        let k = key(5, 0, 0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<Option<AncestorSample<()>>, _> =
            sample_ancestors(&k, &cancel, |_| panic!("fetch must not run after cancel"));
        assert_eq!(result.unwrap_err(), SourceError::Cancelled);
    }

    #[test]
    fn test_fetch_error_propagates() {
        let k = key(1, 0, 0);
        let cancel = CancellationToken::new();

        let result: Result<Option<AncestorSample<()>>, _> =
            sample_ancestors(&k, &cancel, |_| {
                Err(SourceError::Source("boom".to_string()))
            });
        assert!(matches!(result.unwrap_err(), SourceError::Source(_)));
    }
}

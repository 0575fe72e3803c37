//! Land cover compositing
//!
//! Merges an ordered stack of coverage sources into one classified
//! raster per tile. Each source's raw codes are remapped into the
//! shared class vocabulary, conflicts resolve in favor of the source
//! declared last, and the seams between differently-resolved source
//! tiles are disguised by displacing sample coordinates with coherent
//! noise evaluated at a fixed reference level.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coord::{ScaleBias, TileKey};
use crate::raster::{ClassRaster, ClassSample, CodeRaster, NODATA};
use crate::source::{sample_ancestors, AncestorSample, CoverageSource, SourceError};

use super::codemap::{CodeMap, CodeMapping};
use super::dictionary::{ClassDictionary, LandCoverClass};
use super::noise::TiledNoise;

/// One entry in the ordered coverage stack.
///
/// Ordering is significant: when two slots both contribute a valid
/// value at a pixel, the one declared later wins.
pub struct CoverageSlot {
    /// The raster source supplying raw codes.
    pub source: Arc<dyn CoverageSource>,
    /// Declared raw-code-to-class-name mappings for this source.
    pub mappings: Vec<CodeMapping>,
    /// Warp strength in UV units at the noise reference level.
    pub warp: f32,
    /// Disabled slots contribute nothing.
    pub enabled: bool,
}

impl CoverageSlot {
    /// Creates an enabled slot.
    pub fn new(source: Arc<dyn CoverageSource>, mappings: Vec<CodeMapping>, warp: f32) -> Self {
        Self {
            source,
            mappings,
            warp,
            enabled: true,
        }
    }
}

/// Compositor tuning knobs.
#[derive(Debug, Clone)]
pub struct CompositorOptions {
    /// Output raster edge length in pixels.
    pub tile_size: u32,
    /// Level of detail the noise field is anchored to; warping at
    /// deeper levels scales up so displacement stays geographically
    /// constant.
    pub noise_lod: u32,
    /// Seed for the warping noise field.
    pub noise_seed: u32,
}

impl Default for CompositorOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            noise_lod: 12,
            noise_seed: 0,
        }
    }
}

/// Per-call cache entry: an unwarped composite for one tile address,
/// plus the transform from that address's UV space into the raster
/// (which may have come from an ancestor).
struct MetaTile {
    raster: ClassRaster,
    scale_bias: ScaleBias,
}

/// Cache keyed by the tile address actually sampled, not the original
/// request: warped and edge pixels resolve into neighbor tiles.
type MetaCache = HashMap<TileKey, Option<MetaTile>>;

/// Lazily resolved per-slot raster during one tile composite.
enum SlotLoad {
    Pending,
    Missing,
    Loaded(AncestorSample<CodeRaster>),
}

/// Merges N ordered coverage sources into classified rasters.
///
/// Stateless between calls apart from configuration; safe to share
/// across threads composing different tiles concurrently.
pub struct LandCoverCompositor {
    slots: Vec<CoverageSlot>,
    code_maps: Vec<CodeMap>,
    options: CompositorOptions,
    noise: TiledNoise,
}

impl LandCoverCompositor {
    /// Builds a compositor, resolving each slot's declared mappings
    /// against the shared dictionary.
    pub fn new(
        slots: Vec<CoverageSlot>,
        dictionary: &ClassDictionary,
        options: CompositorOptions,
    ) -> Self {
        if dictionary.is_empty() {
            tracing::warn!("land cover dictionary is empty; every coverage code will be unmapped");
        }
        let code_maps = slots
            .iter()
            .map(|slot| CodeMap::build(&slot.mappings, dictionary))
            .collect();
        let noise = TiledNoise::new(options.noise_seed);
        Self {
            slots,
            code_maps,
            options,
            noise,
        }
    }

    /// Number of coverage slots, enabled or not.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Composes the classified raster for one tile.
    ///
    /// Returns `Ok(None)` when no source contributed a single real
    /// pixel, so callers can fall back to an ancestor tile. A
    /// cancelled composition never yields a partial raster.
    pub fn compose(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Option<ClassRaster>, SourceError> {
        let mut cache: MetaCache = HashMap::new();

        // Center probe: bail before the pixel loop when nothing up the
        // ancestor chain has data at all.
        if self.read_meta(&mut cache, key, 0.5, 0.5, cancel)?.is_none() {
            return Ok(None);
        }

        let size = self.options.tile_size;
        let mut out = ClassRaster::new(size);
        let mut written = 0u32;

        // UV displacement per unit of warp strength doubles each level
        // past the noise anchor, keeping it geographically constant.
        let warp_scale = 2f64.powi(key.level() as i32 - self.options.noise_lod as i32);

        for row in 0..size {
            let v = row as f64 / (size - 1) as f64;
            for col in 0..size {
                if cancel.is_cancelled() {
                    debug!(key = %key, "land cover composition cancelled");
                    return Err(SourceError::Cancelled);
                }
                let u = col as f64 / (size - 1) as f64;

                let Some(pixel) = self.read_meta(&mut cache, key, u, v, cancel)? else {
                    continue; // stays NODATA
                };
                if pixel.is_nodata() {
                    continue;
                }

                let warp = pixel.warp as f64 * warp_scale;
                let chosen = if warp != 0.0 {
                    let (nu, nv) = splat_coords(key, self.options.noise_lod, u, v);
                    let noise = self.noise.get(nu, nv);
                    let (wu, wv) = warp_coords(u, v, noise, warp);

                    match self.read_meta(&mut cache, key, wu, wv, cancel)? {
                        // A warped sample only replaces the unwarped one
                        // when it came from the same source; anything else
                        // would bleed classes across source seams.
                        Some(warped) if !warped.is_nodata() && warped.source == pixel.source => {
                            warped
                        }
                        _ => pixel,
                    }
                } else {
                    pixel
                };

                out.set(col, row, chosen);
                written += 1;
            }
        }

        if written > 0 {
            Ok(Some(out))
        } else {
            Ok(None)
        }
    }

    /// Translates a composited pixel back into its dictionary class.
    pub fn class_at<'d>(
        raster: &ClassRaster,
        u: f64,
        v: f64,
        dictionary: &'d ClassDictionary,
    ) -> Option<&'d LandCoverClass> {
        let sample = raster.sample(u, v);
        if sample.is_nodata() {
            return None;
        }
        dictionary.class_by_value(sample.code)
    }

    /// Samples the composite at (u, v) relative to `base_key`, where
    /// coordinates outside [0, 1] fold into the owning neighbor tile.
    ///
    /// The composite for whichever tile owns the coordinate is built
    /// on first touch (falling back to ancestors as needed) and cached
    /// for the rest of this composition.
    fn read_meta(
        &self,
        cache: &mut MetaCache,
        base_key: &TileKey,
        u: f64,
        v: f64,
        cancel: &CancellationToken,
    ) -> Result<Option<ClassSample>, SourceError> {
        // [0, 1] inclusive belongs to the requested tile; only strictly
        // outside coordinates fold into a neighbor. Folding at exactly
        // 1.0 would hand the last pixel row/column to the neighbor.
        let dx = if (0.0..=1.0).contains(&u) {
            0
        } else {
            u.floor() as i64
        };
        let dy = if (0.0..=1.0).contains(&v) {
            0
        } else {
            v.floor() as i64
        };

        let actual = if dx != 0 || dy != 0 {
            // +v walks north, which decreases the tile row.
            match base_key.neighbor(dx, -dy) {
                Some(key) => key,
                None => return Ok(None), // displaced past the pole
            }
        } else {
            *base_key
        };

        let u = if dx == 0 { u } else { u.rem_euclid(1.0) };
        let v = if dy == 0 { v } else { v.rem_euclid(1.0) };

        if !cache.contains_key(&actual) {
            let found = sample_ancestors(&actual, cancel, |k| self.compose_unwarped(k, cancel))?;
            cache.insert(
                actual,
                found.map(|s| MetaTile {
                    raster: s.raster,
                    scale_bias: s.scale_bias,
                }),
            );
        }

        match cache.get(&actual).and_then(|m| m.as_ref()) {
            Some(meta) => {
                let (su, sv) = meta.scale_bias.apply(u, v);
                Ok(Some(meta.raster.sample(su, sv)))
            }
            None => Ok(None),
        }
    }

    /// Builds the unwarped composite for one exact tile address.
    ///
    /// Walks the slot stack from highest to lowest priority per pixel;
    /// the first slot yielding an in-range, non-NODATA, remappable
    /// sample wins. Each slot's raster resolves lazily on first touch
    /// via the ancestor walk and is reused for the rest of this tile.
    fn compose_unwarped(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Option<ClassRaster>, SourceError> {
        if self.slots.is_empty() {
            return Ok(None);
        }

        let size = self.options.tile_size;
        let mut out = ClassRaster::new(size);
        let mut loads: Vec<SlotLoad> = self.slots.iter().map(|_| SlotLoad::Pending).collect();
        let mut written = 0u32;

        for row in 0..size {
            let v = row as f64 / (size - 1) as f64;
            for col in 0..size {
                if cancel.is_cancelled() {
                    debug!(key = %key, "coverage composite cancelled");
                    return Err(SourceError::Cancelled);
                }
                let u = col as f64 / (size - 1) as f64;

                // Later slots take priority, so search in reverse
                // declaration order and stop at the first contribution.
                for (index, slot) in self.slots.iter().enumerate().rev() {
                    if !slot.enabled {
                        continue;
                    }

                    if matches!(loads[index], SlotLoad::Pending) {
                        loads[index] =
                            match sample_ancestors(key, cancel, |k| slot.source.fetch(k, cancel))? {
                                Some(sample) => SlotLoad::Loaded(sample),
                                None => SlotLoad::Missing,
                            };
                    }
                    let SlotLoad::Loaded(sample) = &loads[index] else {
                        continue;
                    };

                    let (cu, cv) = sample.scale_bias.apply(u, v);
                    if !(0.0..=1.0).contains(&cu) || !(0.0..=1.0).contains(&cv) {
                        continue;
                    }

                    let raw = sample.raster.sample(cu, cv);
                    if raw == NODATA {
                        continue;
                    }
                    let Some(code) = self.code_maps[index].remap(raw) else {
                        continue;
                    };

                    out.set(
                        col,
                        row,
                        ClassSample {
                            code,
                            warp: slot.warp,
                            source: index as i32,
                        },
                    );
                    written += 1;
                    break;
                }
            }
        }

        if written > 0 {
            Ok(Some(out))
        } else {
            Ok(None)
        }
    }
}

/// Maps tile-local UV into the noise field's reference coordinates.
///
/// Dividing by `2^(level - noise_lod)` and adding the tile's position
/// within its reference-level ancestor makes adjacent tiles sample
/// adjacent windows of one continuous field, so warping cannot
/// introduce seams of its own.
fn splat_coords(key: &TileKey, noise_lod: u32, u: f64, v: f64) -> (f64, f64) {
    let d_level = key.level() as f64 - noise_lod as f64;
    let factor = 2f64.powf(d_level);
    let inv = 1.0 / factor;

    let mut out = (u * inv, v * inv);

    if factor >= 1.0 {
        let (tiles_x, _) = key.profile().num_tiles(key.level());
        let tile_x = key.x() as f64;
        // Flip the row so it grows with v (south to north).
        let tile_y = (tiles_x - 1 - key.y()) as f64;

        let ax = (tile_x * inv).floor();
        let ay = (tile_y * inv).floor();
        let bx = ax * factor;
        let by = ay * factor;
        let cx = (ax + 1.0) * factor;
        let cy = (ay + 1.0) * factor;

        out.0 += (tile_x - bx) / (cx - bx);
        out.1 += (tile_y - by) / (cy - by);
    }

    out
}

/// Displaces sample coordinates by the noise-derived angle.
///
/// The same scalar displacement lands on both axes on purpose: a
/// coherent swirl, not axis-independent jitter.
fn warp_coords(u: f64, v: f64, noise: f64, warp: f64) -> (f64, f64) {
    let angle = (2.0 * noise - 1.0) * TAU;
    let offset = angle.sin() * warp;
    (u + offset, v + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TilingProfile;

    fn key(level: u32, x: u32, y: u32) -> TileKey {
        TileKey::new(level, x, y, TilingProfile::GlobalGeodetic).unwrap()
    }

    fn dictionary() -> ClassDictionary {
        let mut dict = ClassDictionary::new();
        dict.insert("forest", 2);
        dict.insert("water", 7);
        dict.insert("urban", 11);
        dict
    }

    /// Coverage source holding rasters for explicit keys only.
    struct FixtureCoverage {
        name: String,
        rasters: HashMap<TileKey, CodeRaster>,
    }

    impl FixtureCoverage {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                rasters: HashMap::new(),
            }
        }

        fn with(mut self, key: TileKey, raster: CodeRaster) -> Self {
            self.rasters.insert(key, raster);
            self
        }
    }

    impl CoverageSource for FixtureCoverage {
        fn fetch(
            &self,
            key: &TileKey,
            _cancel: &CancellationToken,
        ) -> Result<Option<CodeRaster>, SourceError> {
            Ok(self.rasters.get(key).cloned())
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn small_options() -> CompositorOptions {
        CompositorOptions {
            tile_size: 16,
            noise_lod: 2,
            noise_seed: 0,
        }
    }

    fn forest_slot(key: TileKey, warp: f32) -> CoverageSlot {
        let source =
            FixtureCoverage::new("forest-cov").with(key, CodeRaster::filled(16, 5));
        CoverageSlot::new(
            Arc::new(source),
            vec![CodeMapping::new(5, "forest")],
            warp,
        )
    }

    #[test]
    fn test_zero_sources_is_no_contribution() {
        let compositor =
            LandCoverCompositor::new(Vec::new(), &dictionary(), small_options());
        let result = compositor
            .compose(&key(3, 1, 1), &CancellationToken::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_single_unwarped_source_reproduces_remap_exactly() {
        let k = key(3, 2, 1);
        let compositor = LandCoverCompositor::new(
            vec![forest_slot(k, 0.0)],
            &dictionary(),
            small_options(),
        );

        let raster = compositor
            .compose(&k, &CancellationToken::new())
            .unwrap()
            .expect("source covers the tile");

        for sample in raster.samples() {
            assert_eq!(sample.code, 2, "raw 5 must remap to forest=2 everywhere");
            assert_eq!(sample.source, 0);
        }
    }

    #[test]
    fn test_last_row_and_column_stay_with_the_requested_tile() {
        // The last pixel column and row sit at u = 1.0 / v = 1.0,
        // which the requested tile owns; they must never resolve into
        // the east or north neighbor.
        let k = key(3, 2, 1);
        let compositor = LandCoverCompositor::new(
            vec![forest_slot(k, 0.0)],
            &dictionary(),
            small_options(),
        );

        let raster = compositor
            .compose(&k, &CancellationToken::new())
            .unwrap()
            .expect("source covers the tile");

        let edge = raster.size() - 1;
        for i in 0..raster.size() {
            assert_eq!(
                raster.get(i, edge).code,
                2,
                "north edge pixel {} must keep the tile's own class",
                i
            );
            assert_eq!(
                raster.get(edge, i).code,
                2,
                "east edge pixel {} must keep the tile's own class",
                i
            );
        }
    }

    #[test]
    fn test_composition_is_idempotent() {
        let k = key(3, 2, 1);
        let compositor = LandCoverCompositor::new(
            vec![forest_slot(k, 0.02)],
            &dictionary(),
            small_options(),
        );

        let first = compositor.compose(&k, &CancellationToken::new()).unwrap();
        let second = compositor.compose(&k, &CancellationToken::new()).unwrap();
        assert_eq!(first, second, "identical inputs must give identical rasters");
    }

    #[test]
    fn test_later_slot_wins_conflicts() {
        let k = key(3, 2, 1);
        let forest = FixtureCoverage::new("forest-cov").with(k, CodeRaster::filled(16, 5));
        let water = FixtureCoverage::new("water-cov").with(k, CodeRaster::filled(16, 9));

        let compositor = LandCoverCompositor::new(
            vec![
                CoverageSlot::new(Arc::new(forest), vec![CodeMapping::new(5, "forest")], 0.0),
                CoverageSlot::new(Arc::new(water), vec![CodeMapping::new(9, "water")], 0.0),
            ],
            &dictionary(),
            small_options(),
        );

        let raster = compositor
            .compose(&k, &CancellationToken::new())
            .unwrap()
            .unwrap();
        for sample in raster.samples() {
            assert_eq!(sample.code, 7, "later water slot must shadow forest");
            assert_eq!(sample.source, 1);
        }
    }

    #[test]
    fn test_unmapped_codes_fall_through_to_earlier_slot() {
        let k = key(3, 2, 1);
        let forest = FixtureCoverage::new("forest-cov").with(k, CodeRaster::filled(16, 5));
        // Later slot emits a code it never declared, so it contributes
        // nothing and the earlier slot shows through.
        let broken = FixtureCoverage::new("broken-cov").with(k, CodeRaster::filled(16, 3));

        let compositor = LandCoverCompositor::new(
            vec![
                CoverageSlot::new(Arc::new(forest), vec![CodeMapping::new(5, "forest")], 0.0),
                CoverageSlot::new(Arc::new(broken), vec![CodeMapping::new(9, "water")], 0.0),
            ],
            &dictionary(),
            small_options(),
        );

        let raster = compositor
            .compose(&k, &CancellationToken::new())
            .unwrap()
            .unwrap();
        for sample in raster.samples() {
            assert_eq!(sample.code, 2);
            assert_eq!(sample.source, 0);
        }
    }

    #[test]
    fn test_disabled_slot_contributes_nothing() {
        let k = key(3, 2, 1);
        let mut slot = forest_slot(k, 0.0);
        slot.enabled = false;

        let compositor =
            LandCoverCompositor::new(vec![slot], &dictionary(), small_options());
        let result = compositor.compose(&k, &CancellationToken::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_resolves_through_ancestor_when_native_missing() {
        let parent = key(2, 1, 0);
        let child = parent.child(1, 1).unwrap();

        // Data exists only at the parent level.
        let compositor = LandCoverCompositor::new(
            vec![forest_slot(parent, 0.0)],
            &dictionary(),
            small_options(),
        );

        let raster = compositor
            .compose(&child, &CancellationToken::new())
            .unwrap()
            .expect("parent data must satisfy the child request");
        assert!(raster.has_data());
    }

    #[test]
    fn test_no_cross_source_bleeding_under_heavy_warp() {
        // Two adjacent tiles covered by different sources with
        // disjoint codes; warping must never pull source B's class
        // into source A's footprint.
        let west = key(3, 4, 2);
        let east = west.neighbor(1, 0).unwrap();

        let forest = FixtureCoverage::new("forest-cov").with(west, CodeRaster::filled(16, 5));
        let water = FixtureCoverage::new("water-cov").with(east, CodeRaster::filled(16, 9));

        let compositor = LandCoverCompositor::new(
            vec![
                // Warp far past the tile boundary.
                CoverageSlot::new(Arc::new(forest), vec![CodeMapping::new(5, "forest")], 2.0),
                CoverageSlot::new(Arc::new(water), vec![CodeMapping::new(9, "water")], 2.0),
            ],
            &dictionary(),
            small_options(),
        );

        let raster = compositor
            .compose(&west, &CancellationToken::new())
            .unwrap()
            .unwrap();
        for sample in raster.samples() {
            if !sample.is_nodata() {
                assert_eq!(
                    sample.code, 2,
                    "water from the east tile must not bleed into the west tile"
                );
            }
        }
    }

    #[test]
    fn test_pre_cancelled_composition_fails() {
        let k = key(3, 2, 1);
        let compositor = LandCoverCompositor::new(
            vec![forest_slot(k, 0.0)],
            &dictionary(),
            small_options(),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = compositor.compose(&k, &cancel);
        assert_eq!(result.unwrap_err(), SourceError::Cancelled);
    }

    #[test]
    fn test_class_at_translates_back_to_dictionary() {
        let k = key(3, 2, 1);
        let dict = dictionary();
        let compositor = LandCoverCompositor::new(
            vec![forest_slot(k, 0.0)],
            &dict,
            small_options(),
        );

        let raster = compositor
            .compose(&k, &CancellationToken::new())
            .unwrap()
            .unwrap();
        let class = LandCoverCompositor::class_at(&raster, 0.5, 0.5, &dict).unwrap();
        assert_eq!(class.name, "forest");
    }

    #[test]
    fn test_splat_coords_continuous_across_tile_boundary() {
        // East edge of one tile and west edge of its neighbor must map
        // to the same noise coordinate at the reference level.
        let left = key(4, 6, 3);
        let right = left.neighbor(1, 0).unwrap();

        let (lu, lv) = splat_coords(&left, 2, 1.0, 0.25);
        let (ru, rv) = splat_coords(&right, 2, 0.0, 0.25);
        assert!((lu - ru).abs() < 1e-12, "u must be continuous: {} vs {}", lu, ru);
        assert!((lv - rv).abs() < 1e-12);
    }

    #[test]
    fn test_warp_displaces_both_axes_equally() {
        let (u, v) = warp_coords(0.5, 0.25, 0.3, 0.1);
        assert!((u - 0.5 - (v - 0.25)).abs() < 1e-12, "same scalar on both axes");
    }
}

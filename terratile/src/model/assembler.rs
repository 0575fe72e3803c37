//! Tile model assembly
//!
//! Orchestrates per-tile composition across the color, elevation, and
//! land cover categories and produces a [`TileModel`].
//!
//! Two modes:
//!
//! - **Normal**: each category is requested at the exact tile address;
//!   absent data is legitimate and leaves the category out of the
//!   model (except at the first level of detail, where policy may
//!   substitute the empty placeholder so the pipeline always has a
//!   handle to bind).
//! - **Standalone**: the tile must receive *some* representative data,
//!   so each category that fails at the requested address retries at
//!   successive ancestors — whole-category fallback, with the
//!   parent-relative scale/bias transforms composed per hop so the
//!   final transform maps the tile's UV into whichever ancestor
//!   actually supplied data.

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::coord::{ScaleBias, TileKey};
use crate::landcover::LandCoverCompositor;
use crate::layers::{LayerKind, LayerRegistry};
use crate::raster::{ClassRaster, Heightfield, TextureHandle};
use crate::source::{ColorSource, SourceError};

use super::manifest::RevisionManifest;
use super::tile_model::{
    CategoryResolution, ColorLayerModel, ElevationModel, LandCoverModel, TileModel,
};

/// Errors terminating a tile model build.
///
/// Absent categories are not errors: the worst non-cancelled outcome
/// is an assembled model with some or all categories missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// The build was cancelled by the caller
    #[error("tile model assembly cancelled")]
    Cancelled,

    /// A source failed while resolving a category
    #[error("source failure during assembly: {0}")]
    Source(String),
}

impl From<SourceError> for AssemblyError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Cancelled => AssemblyError::Cancelled,
            SourceError::Source(msg) => AssemblyError::Source(msg),
        }
    }
}

/// Assembly policy knobs.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// The coarsest level of detail the consumer renders.
    pub first_level: u32,
    /// When true, a category with no data at `first_level` receives
    /// the empty placeholder instead of being left out.
    pub full_data_at_first_level: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            first_level: 0,
            full_data_at_first_level: false,
        }
    }
}

/// Builds [`TileModel`]s from the layers in a registry.
///
/// Internally synchronous; safe to invoke concurrently for different
/// tiles. Holds no cross-call state beyond configuration and the
/// lazily created placeholder rasters.
pub struct TileModelAssembler {
    options: AssemblerOptions,
    /// Created once on first use, never mutated afterward.
    empty_land_cover: OnceLock<Arc<ClassRaster>>,
}

impl TileModelAssembler {
    /// Creates an assembler with the given policy.
    pub fn new(options: AssemblerOptions) -> Self {
        Self {
            options,
            empty_land_cover: OnceLock::new(),
        }
    }

    /// Builds a tile model in normal mode.
    pub fn create_tile_model(
        &self,
        registry: &LayerRegistry,
        key: &TileKey,
        manifest: &RevisionManifest,
        cancel: &CancellationToken,
    ) -> Result<TileModel, AssemblyError> {
        self.assemble(registry, key, manifest, cancel, false)
    }

    /// Builds a tile model in standalone mode, falling back to
    /// ancestors at whole-category granularity.
    pub fn create_standalone_tile_model(
        &self,
        registry: &LayerRegistry,
        key: &TileKey,
        manifest: &RevisionManifest,
        cancel: &CancellationToken,
    ) -> Result<TileModel, AssemblyError> {
        self.assemble(registry, key, manifest, cancel, true)
    }

    fn assemble(
        &self,
        registry: &LayerRegistry,
        key: &TileKey,
        manifest: &RevisionManifest,
        cancel: &CancellationToken,
        standalone: bool,
    ) -> Result<TileModel, AssemblyError> {
        if cancel.is_cancelled() {
            return Err(AssemblyError::Cancelled);
        }

        let mut model = TileModel::new(*key, registry.data_model_revision());

        self.add_color_layers(&mut model, registry, key, manifest, cancel, standalone)?;
        self.add_elevation(&mut model, registry, key, manifest, cancel, standalone)?;
        self.add_land_cover(&mut model, registry, key, manifest, cancel, standalone)?;

        debug!(
            key = %key,
            colors = model.color_layers.len(),
            elevation = model.elevation.is_some(),
            land_cover = model.land_cover.is_some(),
            standalone,
            "assembled tile model"
        );

        Ok(model)
    }

    // ------------------------------------------------------------------
    // Color
    // ------------------------------------------------------------------

    fn add_color_layers(
        &self,
        model: &mut TileModel,
        registry: &LayerRegistry,
        key: &TileKey,
        manifest: &RevisionManifest,
        cancel: &CancellationToken,
        standalone: bool,
    ) -> Result<(), AssemblyError> {
        for layer in registry.layers() {
            if !layer.is_open() || manifest.excludes(layer) {
                continue;
            }
            let LayerKind::Color(source) = layer.kind() else {
                continue;
            };

            let resolved = if standalone {
                self.resolve_standalone(key, cancel, |k| self.resolve_color(source, k, cancel))?
            } else {
                self.resolve_color(source, key, cancel)?
                    .map(|texture| (texture, ScaleBias::IDENTITY, 0))
            };

            if let Some((texture, scale_bias, hops)) = resolved {
                let resolution = resolution_for(texture.is_empty(), hops);
                model.color_layers.push(ColorLayerModel {
                    layer: layer.id(),
                    texture,
                    scale_bias,
                    revision: layer.revision(),
                    resolution,
                });
            }
        }
        Ok(())
    }

    /// Resolves one color layer at one exact address, substituting the
    /// empty placeholder at the first level of detail when required.
    fn resolve_color(
        &self,
        source: &Arc<dyn ColorSource>,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Option<TextureHandle>, SourceError> {
        if let Some(image) = source.fetch(key, cancel)? {
            return Ok(Some(TextureHandle::from_image(image)));
        }
        if key.level() == self.options.first_level && self.options.full_data_at_first_level {
            return Ok(Some(TextureHandle::Empty));
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Elevation
    // ------------------------------------------------------------------

    fn add_elevation(
        &self,
        model: &mut TileModel,
        registry: &LayerRegistry,
        key: &TileKey,
        manifest: &RevisionManifest,
        cancel: &CancellationToken,
        standalone: bool,
    ) -> Result<(), AssemblyError> {
        let mut needed = manifest.includes_elevation();
        let mut combined = registry.data_model_revision();

        if !manifest.is_empty() {
            for layer in registry.layers() {
                if !matches!(layer.kind(), LayerKind::Elevation(_)) || !layer.is_open() {
                    continue;
                }
                if !needed && !manifest.excludes(layer) {
                    needed = true;
                }
                combined = combined.wrapping_add(layer.revision());
            }
        }
        if !needed {
            return Ok(());
        }

        let fetch = |k: &TileKey| -> Result<Option<Heightfield>, SourceError> {
            // First open, included elevation layer with data wins.
            for layer in registry.layers() {
                if !layer.is_open() || manifest.excludes(layer) {
                    continue;
                }
                let LayerKind::Elevation(source) = layer.kind() else {
                    continue;
                };
                if let Some(heightfield) = source.fetch(k, cancel)? {
                    return Ok(Some(heightfield));
                }
            }
            Ok(None)
        };

        let resolved = if standalone {
            self.resolve_standalone(key, cancel, fetch)?
        } else {
            fetch(key)?.map(|hf| (hf, ScaleBias::IDENTITY, 0))
        };

        if let Some((heightfield, scale_bias, hops)) = resolved {
            model.elevation = Some(ElevationModel {
                heightfield: Arc::new(heightfield),
                scale_bias,
                revision: combined,
                resolution: resolution_for(false, hops),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Land cover
    // ------------------------------------------------------------------

    fn add_land_cover(
        &self,
        model: &mut TileModel,
        registry: &LayerRegistry,
        key: &TileKey,
        manifest: &RevisionManifest,
        cancel: &CancellationToken,
        standalone: bool,
    ) -> Result<(), AssemblyError> {
        let mut needed = manifest.includes_land_cover();
        let mut combined = registry.data_model_revision();

        if !manifest.is_empty() {
            for layer in registry.layers() {
                if !matches!(layer.kind(), LayerKind::LandCover(_)) || !layer.is_open() {
                    continue;
                }
                if !needed && !manifest.excludes(layer) {
                    needed = true;
                }
                combined = combined.wrapping_add(layer.revision());
            }
        }
        if !needed {
            return Ok(());
        }

        // Only one land cover layer is supported per registry; the
        // first open, included one is composited.
        let Some((layer, compositor)) = registry.layers().iter().find_map(|layer| {
            if !layer.is_open() || manifest.excludes(layer) {
                return None;
            }
            match layer.kind() {
                LayerKind::LandCover(compositor) => {
                    Some((Arc::clone(layer), Arc::clone(compositor)))
                }
                _ => None,
            }
        }) else {
            return Ok(());
        };

        let resolve = |k: &TileKey| self.resolve_land_cover(&compositor, k, cancel);

        let resolved = if standalone {
            self.resolve_standalone(key, cancel, resolve)?
        } else {
            resolve(key)?.map(|raster| (raster, ScaleBias::IDENTITY, 0))
        };

        if let Some((raster, scale_bias, hops)) = resolved {
            let placeholder = !raster.has_data();
            model.land_cover = Some(LandCoverModel {
                layer: layer.id(),
                raster,
                scale_bias,
                revision: combined,
                resolution: resolution_for(placeholder, hops),
            });
        }
        Ok(())
    }

    /// Composes land cover at one exact address, substituting the
    /// placeholder raster at the first level of detail when required.
    fn resolve_land_cover(
        &self,
        compositor: &LandCoverCompositor,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<ClassRaster>>, SourceError> {
        if let Some(raster) = compositor.compose(key, cancel)? {
            return Ok(Some(Arc::new(raster)));
        }
        if key.level() == self.options.first_level && self.options.full_data_at_first_level {
            return Ok(Some(Arc::clone(self.empty_land_cover())));
        }
        Ok(None)
    }

    /// The 1x1 no-data raster bound when land cover is required but
    /// absent.
    fn empty_land_cover(&self) -> &Arc<ClassRaster> {
        self.empty_land_cover
            .get_or_init(|| Arc::new(ClassRaster::new(1)))
    }

    // ------------------------------------------------------------------
    // Whole-category ancestor fallback
    // ------------------------------------------------------------------

    /// Retries a category resolver at successive ancestors, composing
    /// the parent-relative scale/bias per hop.
    ///
    /// Distinct from the per-pixel ancestor walk inside the land cover
    /// compositor: this operates at whole-category granularity, and
    /// its transform is the per-hop composition rather than a single
    /// derivation from the final extents.
    fn resolve_standalone<R, F>(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
        mut resolve: F,
    ) -> Result<Option<(R, ScaleBias, u32)>, SourceError>
    where
        F: FnMut(&TileKey) -> Result<Option<R>, SourceError>,
    {
        let mut accumulated = ScaleBias::IDENTITY;
        let mut hops = 0u32;
        let mut current = Some(*key);

        while let Some(k) = current {
            if cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            if let Some(payload) = resolve(&k)? {
                return Ok(Some((payload, accumulated, hops)));
            }
            current = match k.parent() {
                Some(parent) => {
                    accumulated =
                        accumulated.post_mul(&ScaleBias::between(&k.extent(), &parent.extent()));
                    hops += 1;
                    Some(parent)
                }
                None => None,
            };
        }
        Ok(None)
    }
}

fn resolution_for(placeholder: bool, hops: u32) -> CategoryResolution {
    if placeholder {
        CategoryResolution::Absent
    } else if hops > 0 {
        CategoryResolution::Fallback(hops)
    } else {
        CategoryResolution::Direct
    }
}

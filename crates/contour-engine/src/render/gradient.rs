//! Per-layer color-ramp textures for gradient lines.
//!
//! A ramp is a `resolution × rows` RGBA texture sampled by line progress. One
//! row is rendered per line clip of the bucket, each row covering only its
//! clip's progress sub-range so disconnected runs never share texels.
//!
//! Ramps are regenerated when the layer's `gradient_version` moves or the
//! tile's bucket was rebuilt, since rows and resolution follow the bucket.

use std::collections::HashMap;
use std::sync::Arc;

use crate::style::{ColorRamp, LayerId, LineGradient};
use crate::tile::{BucketGeneration, EXTENT, LineClip, TileId};

use super::command::{CommandList, LineCommand};
use super::state::{TextureFilter, TextureUnit, TextureWrap};
use super::texture::{RgbaImage, TextureId};

/// Ramp width used for interpolated gradients.
pub const BASE_RAMP_RESOLUTION: u32 = 256;

/// Logical pixel size of a tile right before the next zoom level kicks in.
const MAX_TILE_PIXEL_SIZE: f64 = 1024.0;

/// Per-tile inputs to the ramp resolution heuristic.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileMetrics {
    /// Longest line of the bucket in tile units.
    pub max_line_length: f32,
    /// Canonical zoom of the tile.
    pub tile_zoom: u8,
    pub source_max_zoom: u8,
    pub renderer_max_zoom: u8,
    pub max_texture_size: u32,
}

/// Everything needed to produce the ramp of one layer on one tile.
#[derive(Debug, Copy, Clone)]
pub struct RampRequest<'a> {
    pub layer: &'a LayerId,
    pub gradient: &'a LineGradient,
    pub gradient_version: u64,
    pub tile: &'a TileId,
    /// Bucket the ramp is rendered for.
    pub bucket: BucketGeneration,
    /// Line clips of the tile's bucket; one ramp row each.
    pub clips: &'a [LineClip],
    pub metrics: TileMetrics,
}

/// How much a tile may still be magnified on screen.
///
/// Only tiles at the source's max zoom are ever overscaled; for those the
/// factor is `2^(renderer_max_zoom - tile_zoom)`. A renderer max zoom at or
/// below the tile zoom yields 1.
pub fn overzoom_factor(metrics: &TileMetrics) -> f64 {
    if metrics.tile_zoom != metrics.source_max_zoom {
        return 1.0;
    }
    let delta = metrics.renderer_max_zoom.saturating_sub(metrics.tile_zoom);
    2f64.powi(delta as i32)
}

/// Smallest power of two `>= value`; 1 for values `<= 1`.
pub fn next_power_of_two(value: f64) -> u32 {
    if value.is_nan() || value <= 1.0 {
        return 1;
    }
    let ceil = value.ceil().min(u32::MAX as f64) as u64;
    ceil.next_power_of_two().min(1 << 31) as u32
}

/// Ramp width for a layer on a tile.
///
/// Interpolated ramps use [`BASE_RAMP_RESOLUTION`]. Stepped ramps are sized so
/// each color band stays crisp along the longest line at the deepest zoom,
/// bounded below by the base resolution and above by the hardware limit.
pub fn ramp_resolution(step_interpolant: bool, metrics: &TileMetrics) -> u32 {
    if !step_interpolant {
        return BASE_RAMP_RESOLUTION;
    }
    let line_length = metrics.max_line_length as f64 / EXTENT as f64;
    let coverage = line_length * MAX_TILE_PIXEL_SIZE * overzoom_factor(metrics);
    next_power_of_two(coverage)
        .max(BASE_RAMP_RESOLUTION)
        .min(metrics.max_texture_size)
}

/// Samples `ramp` into an image, reusing `reuse`'s allocation when the size matches.
///
/// Without clips the single row covers progress `[0, 1]`.
pub fn render_color_ramp(
    ramp: &dyn ColorRamp,
    resolution: u32,
    clips: &[LineClip],
    reuse: Option<RgbaImage>,
) -> RgbaImage {
    let width = resolution.max(1);
    let rows = clips.len().max(1) as u32;
    let mut image = match reuse {
        Some(img) if img.width() == width && img.height() == rows => img,
        _ => RgbaImage::new(width, rows),
    };

    let denom = (width - 1).max(1) as f32;
    for row in 0..rows {
        let (start, end) = clips
            .get(row as usize)
            .map_or((0.0, 1.0), |c| (c.start, c.end));
        for x in 0..width {
            let progress = x as f32 / denom;
            let eval = start * (1.0 - progress) + end * progress;
            image.set_pixel(x, row, ramp.evaluate(eval).to_straight_rgba8());
        }
    }
    image
}

/// Ramp texture state of one layer on one tile.
#[derive(Debug, Clone, Default)]
pub struct GradientState {
    image: Option<Arc<RgbaImage>>,
    texture: Option<TextureId>,
    /// `None` until the first ramp was rendered.
    applied_version: Option<u64>,
    bucket: Option<BucketGeneration>,
    resolution: u32,
}

impl GradientState {
    #[inline]
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    #[inline]
    pub fn applied_version(&self) -> Option<u64> {
        self.applied_version
    }

    #[inline]
    pub fn bucket(&self) -> Option<BucketGeneration> {
        self.bucket
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_deref()
    }
}

/// Owns the ramp textures of every gradient line layer.
///
/// Entries live as long as their layer: [`GradientRampCache::remove_layer`]
/// (or [`GradientRampCache::retain_layers`]) releases them.
#[derive(Debug, Default)]
pub struct GradientRampCache {
    layers: HashMap<LayerId, HashMap<TileId, GradientState>>,
}

impl GradientRampCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure the ramp for the requested layer and tile matches its
    /// `gradient_version` and bucket, then binds it to the ramp texture unit.
    ///
    /// Regenerates (and records the upload) only when either changed.
    pub fn ensure_ramp(&mut self, req: &RampRequest<'_>, commands: &mut CommandList) -> TextureId {
        let state = self
            .layers
            .entry(req.layer.clone())
            .or_default()
            .entry(*req.tile)
            .or_default();

        let current = state
            .texture
            .filter(|_| state.applied_version == Some(req.gradient_version) && state.bucket == Some(req.bucket));
        let texture = match current {
            Some(texture) => texture,
            None => Self::regenerate(state, req, commands),
        };

        let filter = if req.gradient.step_interpolant {
            TextureFilter::Nearest
        } else {
            TextureFilter::Linear
        };
        commands.push(LineCommand::BindTexture {
            unit: TextureUnit::Ramp,
            texture,
            filter,
            wrap: TextureWrap::ClampToEdge,
        });
        texture
    }

    fn regenerate(
        state: &mut GradientState,
        req: &RampRequest<'_>,
        commands: &mut CommandList,
    ) -> TextureId {
        let resolution = ramp_resolution(req.gradient.step_interpolant, &req.metrics);

        // Reuse the previous allocation when nothing else holds on to it.
        let reuse = state.image.take().and_then(|img| Arc::try_unwrap(img).ok());
        let image = Arc::new(render_color_ramp(
            req.gradient.ramp.as_ref(),
            resolution,
            req.clips,
            reuse,
        ));

        let texture = match state.texture {
            Some(texture) => {
                commands.push(LineCommand::UpdateTexture { texture, image: Arc::clone(&image) });
                texture
            }
            None => {
                let texture = TextureId::allocate();
                commands.push(LineCommand::CreateTexture { texture, image: Arc::clone(&image) });
                texture
            }
        };

        log::debug!(
            "line gradient: layer `{}` tile {} ramp v{} at {}x{}",
            req.layer,
            req.tile,
            req.gradient_version,
            resolution,
            image.height()
        );

        state.image = Some(image);
        state.texture = Some(texture);
        state.applied_version = Some(req.gradient_version);
        state.bucket = Some(req.bucket);
        state.resolution = resolution;
        texture
    }

    /// State for `layer` on `tile`, if a ramp was ever rendered for it.
    pub fn state(&self, layer: &LayerId, tile: &TileId) -> Option<&GradientState> {
        self.layers.get(layer)?.get(tile)
    }

    /// Drops every ramp of `layer`, recording texture destruction.
    pub fn remove_layer(&mut self, layer: &LayerId, commands: &mut CommandList) {
        if let Some(states) = self.layers.remove(layer) {
            Self::destroy_all(states.into_values(), commands);
        }
    }

    /// Keeps only layers for which `keep` returns true.
    pub fn retain_layers(&mut self, mut keep: impl FnMut(&LayerId) -> bool, commands: &mut CommandList) {
        let dropped: Vec<LayerId> = self.layers.keys().filter(|id| !keep(id)).cloned().collect();
        for id in dropped {
            self.remove_layer(&id, commands);
        }
    }

    /// Drops the ramps of an evicted tile across all layers.
    pub fn evict_tile(&mut self, tile: &TileId, commands: &mut CommandList) {
        for states in self.layers.values_mut() {
            if let Some(state) = states.remove(tile) {
                Self::destroy_all(std::iter::once(state), commands);
            }
        }
    }

    fn destroy_all(states: impl Iterator<Item = GradientState>, commands: &mut CommandList) {
        for texture in states.filter_map(|s| s.texture) {
            commands.push(LineCommand::DestroyTexture { texture });
        }
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

use crate::tile::TileId;

use super::state::{ColorMode, CompareFunction, DepthMask, DepthMode, StencilMode};

/// Render pass currently executed by the frame scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderPass {
    Offscreen,
    Opaque,
    Translucent,
}

/// How terrain rendering shares the stencil buffer with tile clipping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum OverlapStencilType {
    #[default]
    None,
    /// Overlapping draped tiles are separated with clip masks.
    Clip,
    /// Overlapping draped tiles are separated with stencil masks.
    Mask,
}

/// Terrain state relevant to stencil usage.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TerrainState {
    pub overlap_stencil: OverlapStencilType,
}

impl TerrainState {
    /// True when terrain already guarantees non-overlapping stencil regions.
    #[inline]
    pub fn clip_or_mask_overlap_stencil_type(&self) -> bool {
        matches!(self.overlap_stencil, OverlapStencilType::Clip | OverlapStencilType::Mask)
    }
}

/// Per-frame renderer configuration handed down by the frame scheduler.
#[derive(Debug, Clone)]
pub struct FrameState {
    pub render_pass: RenderPass,
    /// Current (fractional) camera zoom.
    pub zoom: f32,
    /// Deepest zoom the camera may reach.
    pub max_zoom: u8,
    pub pixel_ratio: f32,
    /// Drawable size in logical pixels.
    pub viewport: [f32; 2],
    /// Hardware limit for either texture dimension.
    pub max_texture_size: u32,
    pub terrain: Option<TerrainState>,
    /// Index of the style layer being drawn, used to slice the depth range.
    pub current_layer: usize,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            render_pass: RenderPass::Translucent,
            zoom: 0.0,
            max_zoom: 22,
            pixel_ratio: 1.0,
            viewport: [1.0, 1.0],
            max_texture_size: 8192,
            terrain: None,
            current_layer: 0,
        }
    }
}

impl FrameState {
    /// Each layer owns this many depth slices.
    pub const NUM_SUBLAYERS: usize = 3;
    pub const DEPTH_EPSILON: f32 = 1.0 / 65536.0;

    /// Depth mode confining a draw to sublayer `n` of the current layer.
    pub fn depth_mode_for_sublayer(&self, n: usize, mask: DepthMask) -> DepthMode {
        let slice = (1 + self.current_layer) * Self::NUM_SUBLAYERS + n;
        let depth = 1.0 - slice as f32 * Self::DEPTH_EPSILON;
        DepthMode { compare: CompareFunction::LessEqual, mask, range: [depth, depth] }
    }

    pub fn color_mode_for_render_pass(&self) -> ColorMode {
        match self.render_pass {
            RenderPass::Opaque => ColorMode::Unblended,
            RenderPass::Translucent | RenderPass::Offscreen => ColorMode::AlphaBlended,
        }
    }

    /// `1 / pixels_to_gl_units` for the current viewport.
    pub fn units_to_pixels(&self) -> [f32; 2] {
        [self.viewport[0].max(1.0) / 2.0, -self.viewport[1].max(1.0) / 2.0]
    }
}

/// Frame-level services owned by the map painter.
///
/// Tile clipping allocates one stencil reference per tile per frame and draws
/// the clip masks; the renderer only asks for the resulting stencil mode and
/// tells the painter when the masks it relied on have been disturbed.
pub trait Painter {
    /// Stencil mode restricting a draw to `tile`'s clip mask, drawing masks first if needed.
    fn stencil_mode_for_clipping(&mut self, tile: &TileId) -> StencilMode;

    /// Forgets the drawn clip masks so the next layer redraws them.
    fn reset_stencil_clipping_masks(&mut self);

    /// Tile-to-clip-space matrix (column-major).
    fn projection_matrix(&self, tile: &TileId) -> [f32; 16];
}

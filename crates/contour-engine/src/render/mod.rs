//! Line layer rendering.
//!
//! [`LineRenderer`] turns a line layer and the tiles covering the view into a
//! [`CommandList`]: program selection, atlas and gradient ramp bindings, and
//! per-tile draws with their stencil, depth and color state. The list is
//! renderer-agnostic; [`gpu::LineGpuRenderer`] replays it with wgpu.
//!
//! Convention:
//! - Geometry is in tile units (`EXTENT` per tile edge); the painter's
//!   projection matrix takes it to clip space.
//! - Colors are linear premultiplied RGBA (`paint::Color`).

mod atlas_binder;
mod command;
mod ctx;
mod frame;
mod gradient;
mod line;
mod program;
mod state;
mod stencil;
mod texture;
mod uniforms;

pub mod gpu;

#[cfg(test)]
mod test_support;

pub use atlas_binder::AtlasBinder;
pub use command::{CommandList, DrawCall, LineCommand};
pub use ctx::{RenderCtx, RenderTarget};
pub use frame::{FrameState, OverlapStencilType, Painter, RenderPass, TerrainState};
pub use gradient::{
    BASE_RAMP_RESOLUTION, GradientRampCache, GradientState, RampRequest, TileMetrics,
    next_power_of_two, overzoom_factor, ramp_resolution, render_color_ramp,
};
pub use line::LineRenderer;
pub use program::{Defines, LineDefine, ProgramVariant};
pub use state::{
    ColorMode, CompareFunction, CullFaceMode, DepthMask, DepthMode, StencilFunc, StencilMode,
    StencilOp, TextureFilter, TextureUnit, TextureWrap,
};
pub use stencil::{
    BLEND_ALPHA_THRESHOLD, DrawSequence, STAMP_ALPHA_THRESHOLD, StencilClipController,
    StencilStrategy,
};
pub use texture::{RgbaImage, TextureId};
pub use uniforms::{DATA_DRIVEN, LineUniforms, UniformInputs, line_pattern_uniform_values, line_uniform_values, tile_ratio};

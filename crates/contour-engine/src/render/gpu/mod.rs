//! wgpu backend for recorded line commands.
//!
//! [`LineGpuRenderer::submit`] replays a [`crate::render::CommandList`] into a
//! color + depth/stencil target. The depth/stencil attachment is expected to
//! carry the tile clip masks drawn by the painter.

mod common;
mod plan;
mod renderer;

pub use common::{DEPTH_STENCIL_FORMAT, LineVertex};
pub use renderer::LineGpuRenderer;

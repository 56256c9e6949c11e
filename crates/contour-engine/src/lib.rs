//! Contour engine crate.
//!
//! Renders the line layers of a tiled vector map: per-layer gradient ramp
//! textures, dash and pattern atlas bindings, and seam-free stencil drawing
//! of translucent lines across overlapping tiles.
//!
//! The renderer records a [`render::CommandList`]; [`render::gpu`] replays it
//! on wgpu. Tile loading, tessellation and atlas packing live upstream and
//! hand their results over through [`tile`].

pub mod device;
pub mod logging;
pub mod paint;
pub mod render;
pub mod style;
pub mod tile;

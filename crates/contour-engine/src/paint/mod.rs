//! Paint model shared between style snapshots and renderers.
//!
//! Scope:
//! - color representation (linear premultiplied alpha)

pub mod color;

pub use color::Color;

//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a window
//! - creating offscreen color + depth/stencil targets
//! - providing encoders and submitting recorded work

mod gpu;
mod init;

pub use gpu::{Gpu, OffscreenTarget};
pub use init::GpuInit;

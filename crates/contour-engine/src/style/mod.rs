//! Style snapshots consumed by the line renderer.
//!
//! Parsing style documents and evaluating expressions happens upstream; this
//! module only describes the already-evaluated values a frame needs:
//! - constant-or-data-driven paint values
//! - cross-faded atlas references (dash arrays, pattern images)
//! - color ramps for gradient lines

mod layer;
mod ramp;
mod value;

pub use layer::{DashArray, ImageId, LayerId, LineCap, LineGradient, LineLayerConfig};
pub use ramp::{ColorRamp, SharedRamp, StopRamp};
pub use value::{CrossFaded, Crossfade, PaintValue};

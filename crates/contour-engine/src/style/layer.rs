use std::fmt;

use crate::paint::Color;

use super::ramp::{DebugRamp, SharedRamp};
use super::value::{CrossFaded, Crossfade, PaintValue};

/// Style layer identity. Stable for the lifetime of the layer in the style.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an image registered in a tile's image atlas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Line end cap. Round caps change how dash segments are rasterized into the line atlas.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Dash lengths in line-width units, alternating dash and gap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashArray(pub Vec<f32>);

impl DashArray {
    pub fn new(lengths: impl Into<Vec<f32>>) -> Self {
        Self(lengths.into())
    }

    #[inline]
    pub fn lengths(&self) -> &[f32] {
        &self.0
    }
}

/// Gradient paint: a color ramp sampled over line progress.
#[derive(Clone)]
pub struct LineGradient {
    pub ramp: SharedRamp,
    /// Stepped (non-interpolated) ramps need nearest sampling and a higher resolution.
    pub step_interpolant: bool,
}

impl fmt::Debug for LineGradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineGradient")
            .field("ramp", &DebugRamp(&self.ramp))
            .field("step_interpolant", &self.step_interpolant)
            .finish()
    }
}

/// Per-frame snapshot of the paint/layout values of one line layer.
///
/// `pattern` and `dasharray` are `None` when the property is unset, and
/// `Some(DataDriven)` when it varies per feature (still counts as active).
#[derive(Debug, Clone)]
pub struct LineLayerConfig {
    pub id: LayerId,
    pub opacity: PaintValue<f32>,
    pub width: PaintValue<f32>,
    pub color: PaintValue<Color>,
    pub blur: PaintValue<f32>,
    pub dasharray: Option<PaintValue<CrossFaded<DashArray>>>,
    pub cap: PaintValue<LineCap>,
    pub pattern: Option<PaintValue<CrossFaded<ImageId>>>,
    pub gradient: Option<LineGradient>,
    /// Bumped by the style layer whenever the gradient expression or its zoom input changes.
    pub gradient_version: u64,
    pub crossfade: Crossfade,
}

impl LineLayerConfig {
    /// Solid black, fully opaque, one pixel wide.
    pub fn new(id: impl Into<LayerId>) -> Self {
        Self {
            id: id.into(),
            opacity: PaintValue::Constant(1.0),
            width: PaintValue::Constant(1.0),
            color: PaintValue::Constant(Color::black()),
            blur: PaintValue::Constant(0.0),
            dasharray: None,
            cap: PaintValue::Constant(LineCap::Butt),
            pattern: None,
            gradient: None,
            gradient_version: 0,
            crossfade: Crossfade::default(),
        }
    }

    #[inline]
    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    #[inline]
    pub fn has_dash(&self) -> bool {
        self.dasharray.is_some()
    }

    #[inline]
    pub fn has_gradient(&self) -> bool {
        self.gradient.is_some()
    }

    /// True when opacity or width folds to exactly zero, i.e. nothing can be visible.
    pub fn is_invisible(&self) -> bool {
        self.opacity.constant_or(1.0) == 0.0 || self.width.constant_or(1.0) == 0.0
    }
}

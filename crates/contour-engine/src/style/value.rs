/// A paint or layout value that either folds to a constant for the whole layer
/// or has to be evaluated per feature (and therefore lives in per-vertex data).
#[derive(Debug, Clone, PartialEq)]
pub enum PaintValue<T> {
    Constant(T),
    DataDriven,
}

impl<T> PaintValue<T> {
    /// Returns the constant value, or `None` when the value is data-driven.
    #[inline]
    pub fn constant(&self) -> Option<&T> {
        match self {
            PaintValue::Constant(v) => Some(v),
            PaintValue::DataDriven => None,
        }
    }

    #[inline]
    pub fn is_data_driven(&self) -> bool {
        matches!(self, PaintValue::DataDriven)
    }
}

impl<T: Clone> PaintValue<T> {
    /// Returns the constant value, or `fallback` when the value is data-driven.
    #[inline]
    pub fn constant_or(&self, fallback: T) -> T {
        match self {
            PaintValue::Constant(v) => v.clone(),
            PaintValue::DataDriven => fallback,
        }
    }
}

impl<T> From<T> for PaintValue<T> {
    fn from(value: T) -> Self {
        PaintValue::Constant(value)
    }
}

/// Two atlas entries blended during a zoom transition (`from` fades out, `to` fades in).
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFaded<T> {
    pub from: T,
    pub to: T,
}

impl<T> CrossFaded<T> {
    #[inline]
    pub fn new(from: T, to: T) -> Self {
        Self { from, to }
    }
}

impl<T: Clone> CrossFaded<T> {
    /// Same entry on both sides; no visible transition.
    #[inline]
    pub fn settled(value: T) -> Self {
        Self { from: value.clone(), to: value }
    }
}

/// Blend parameters between the `from` and `to` atlas entries.
///
/// Derived by the style layer from the zoom history; consumed read-only here.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Crossfade {
    pub from_scale: f32,
    pub to_scale: f32,
    /// Weight of the `to` entry in `[0, 1]`.
    pub t: f32,
}

impl Default for Crossfade {
    fn default() -> Self {
        Self { from_scale: 1.0, to_scale: 1.0, t: 1.0 }
    }
}

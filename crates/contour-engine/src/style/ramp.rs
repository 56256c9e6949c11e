use std::fmt;

use crate::paint::Color;

/// Color expression evaluated along a line, keyed by normalized line progress.
///
/// Implementations come from the style layer's expression engine. Evaluation is
/// infallible from the renderer's point of view: an expression that cannot be
/// evaluated must be rejected before it reaches a layer snapshot.
pub trait ColorRamp {
    fn evaluate(&self, line_progress: f32) -> Color;
}

impl<F> ColorRamp for F
where
    F: Fn(f32) -> Color,
{
    fn evaluate(&self, line_progress: f32) -> Color {
        self(line_progress)
    }
}

/// A color ramp defined by sorted stops, interpolated linearly or stepped.
///
/// Progress outside the first/last stop clamps to the edge colors.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRamp {
    stops: Vec<(f32, Color)>,
    stepped: bool,
}

impl StopRamp {
    /// Linear interpolation between stops. Stops are sorted by position.
    pub fn interpolated(stops: impl IntoIterator<Item = (f32, Color)>) -> Self {
        Self::build(stops, false)
    }

    /// Each stop holds its color until the next stop position.
    pub fn stepped(stops: impl IntoIterator<Item = (f32, Color)>) -> Self {
        Self::build(stops, true)
    }

    fn build(stops: impl IntoIterator<Item = (f32, Color)>, stepped: bool) -> Self {
        let mut stops: Vec<_> = stops.into_iter().filter(|(t, _)| t.is_finite()).collect();
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { stops, stepped }
    }

    #[inline]
    pub fn is_stepped(&self) -> bool {
        self.stepped
    }
}

impl ColorRamp for StopRamp {
    fn evaluate(&self, line_progress: f32) -> Color {
        let Some(&(first_t, first_c)) = self.stops.first() else {
            return Color::transparent();
        };
        if line_progress <= first_t {
            return first_c;
        }

        // Index of the first stop strictly past `line_progress`.
        let next = self.stops.partition_point(|(t, _)| *t <= line_progress);
        if next >= self.stops.len() {
            return self.stops[self.stops.len() - 1].1;
        }

        let (t0, c0) = self.stops[next - 1];
        if self.stepped {
            return c0;
        }
        let (t1, c1) = self.stops[next];
        let span = t1 - t0;
        if span <= 0.0 {
            c1
        } else {
            c0.lerp(c1, (line_progress - t0) / span)
        }
    }
}

/// Shared handle type stored in layer snapshots.
pub type SharedRamp = std::sync::Arc<dyn ColorRamp + Send + Sync>;

pub(crate) struct DebugRamp<'a>(pub &'a SharedRamp);

impl fmt::Debug for DebugRamp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorRamp@{:p}", std::sync::Arc::as_ptr(self.0))
    }
}

use std::fmt;

use crate::style::LineLayerConfig;

/// Compiled shader program family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProgramVariant {
    Line,
    LinePattern,
}

impl ProgramVariant {
    /// Pattern lines use a dedicated program; everything else shares `line`.
    pub fn for_layer(layer: &LineLayerConfig) -> Self {
        if layer.has_pattern() { ProgramVariant::LinePattern } else { ProgramVariant::Line }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProgramVariant::Line => "line",
            ProgramVariant::LinePattern => "linePattern",
        }
    }
}

/// Preprocessor-style switches selecting shader features within a variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LineDefine {
    RenderLineDash,
    RenderLineGradient,
    RenderLineAlphaDiscard,
}

impl LineDefine {
    pub const ALL: [LineDefine; 3] = [
        LineDefine::RenderLineDash,
        LineDefine::RenderLineGradient,
        LineDefine::RenderLineAlphaDiscard,
    ];

    #[inline]
    fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            LineDefine::RenderLineDash => "RENDER_LINE_DASH",
            LineDefine::RenderLineGradient => "RENDER_LINE_GRADIENT",
            LineDefine::RenderLineAlphaDiscard => "RENDER_LINE_ALPHA_DISCARD",
        }
    }
}

/// Set of [`LineDefine`]s; part of the program identity.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Defines(u8);

impl Defines {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Defines implied by a layer's paint values.
    ///
    /// Alpha discard is only useful for translucent, non-pattern lines: it lets
    /// the stencil pass stamp the solid interior of a line. Data-driven
    /// opacity folds to 1 here, so such layers draw in a single pass.
    pub fn for_layer(layer: &LineLayerConfig) -> Self {
        let mut defines = Self::empty();
        if layer.has_dash() {
            defines.insert(LineDefine::RenderLineDash);
        }
        if layer.has_gradient() {
            defines.insert(LineDefine::RenderLineGradient);
        }
        if !layer.has_pattern() && layer.opacity.constant_or(1.0) != 1.0 {
            defines.insert(LineDefine::RenderLineAlphaDiscard);
        }
        defines
    }

    #[inline]
    pub fn insert(&mut self, define: LineDefine) {
        self.0 |= define.bit();
    }

    #[inline]
    pub fn contains(&self, define: LineDefine) -> bool {
        self.0 & define.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = LineDefine> + '_ {
        LineDefine::ALL.into_iter().filter(|d| self.contains(*d))
    }
}

impl FromIterator<LineDefine> for Defines {
    fn from_iter<I: IntoIterator<Item = LineDefine>>(iter: I) -> Self {
        let mut defines = Self::empty();
        for d in iter {
            defines.insert(d);
        }
        defines
    }
}

impl fmt::Debug for Defines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(LineDefine::name)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{CrossFaded, DashArray, ImageId, PaintValue};

    #[test]
    fn opaque_solid_line_has_no_defines() {
        let layer = LineLayerConfig::new("roads");
        assert!(Defines::for_layer(&layer).is_empty());
        assert_eq!(ProgramVariant::for_layer(&layer), ProgramVariant::Line);
    }

    #[test]
    fn translucent_line_requests_alpha_discard() {
        let mut layer = LineLayerConfig::new("roads");
        layer.opacity = PaintValue::Constant(0.6);
        assert!(Defines::for_layer(&layer).contains(LineDefine::RenderLineAlphaDiscard));

        layer.opacity = PaintValue::DataDriven;
        assert!(!Defines::for_layer(&layer).contains(LineDefine::RenderLineAlphaDiscard));
    }

    #[test]
    fn pattern_lines_never_alpha_discard() {
        let mut layer = LineLayerConfig::new("trails");
        layer.opacity = PaintValue::Constant(0.6);
        layer.pattern = Some(PaintValue::Constant(CrossFaded::settled(ImageId::from("dots"))));
        let defines = Defines::for_layer(&layer);
        assert!(!defines.contains(LineDefine::RenderLineAlphaDiscard));
        assert_eq!(ProgramVariant::for_layer(&layer), ProgramVariant::LinePattern);
    }

    #[test]
    fn dash_define_follows_dasharray() {
        let mut layer = LineLayerConfig::new("borders");
        layer.dasharray = Some(PaintValue::Constant(CrossFaded::settled(DashArray::new(vec![2.0, 2.0]))));
        let defines = Defines::for_layer(&layer);
        assert!(defines.contains(LineDefine::RenderLineDash));
        assert_eq!(defines.iter().count(), 1);
    }

    #[test]
    fn debug_lists_define_names() {
        let defines: Defines = [LineDefine::RenderLineGradient].into_iter().collect();
        assert_eq!(format!("{defines:?}"), "{\"RENDER_LINE_GRADIENT\"}");
    }
}

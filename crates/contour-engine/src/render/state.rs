//! Fixed-function GPU state carried by recorded draw commands.
//!
//! These mirror the knobs the line renderer needs and map 1:1 onto wgpu
//! pipeline state in `render::gpu`.

/// Stencil / depth comparison function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Operation applied to the stencil buffer value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
}

/// Stencil test: `(reference & mask) <compare> (stored & mask)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StencilFunc {
    pub compare: CompareFunction,
    pub mask: u8,
}

/// Complete stencil configuration for one draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StencilMode {
    pub func: StencilFunc,
    pub reference: u8,
    pub write_mask: u8,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl StencilMode {
    pub const fn new(
        func: StencilFunc,
        reference: u8,
        write_mask: u8,
        fail: StencilOp,
        depth_fail: StencilOp,
        pass: StencilOp,
    ) -> Self {
        Self { func, reference, write_mask, fail, depth_fail, pass }
    }

    /// Stencil test always passes and nothing is written.
    pub const fn disabled() -> Self {
        Self::new(
            StencilFunc { compare: CompareFunction::Always, mask: 0 },
            0,
            0,
            StencilOp::Keep,
            StencilOp::Keep,
            StencilOp::Keep,
        )
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        *self == Self::disabled()
    }
}

/// Whether a draw may write depth.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DepthMask {
    ReadOnly,
    ReadWrite,
}

/// Depth test configuration. `range` is the viewport depth range the draw is squeezed into.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DepthMode {
    pub compare: CompareFunction,
    pub mask: DepthMask,
    pub range: [f32; 2],
}

impl DepthMode {
    pub const fn disabled() -> Self {
        Self { compare: CompareFunction::Always, mask: DepthMask::ReadOnly, range: [0.0, 1.0] }
    }
}

/// Color blending applied to a draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// Overwrite (opaque pass).
    Unblended,
    /// Premultiplied source-over.
    AlphaBlended,
    /// Color writes masked off.
    Disabled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CullFaceMode {
    Disabled,
    Back,
}

/// Texture slots visible to the line shaders.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureUnit {
    /// Dash or pattern atlas.
    Atlas = 0,
    /// Gradient ramp.
    Ramp = 1,
}

impl TextureUnit {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
}

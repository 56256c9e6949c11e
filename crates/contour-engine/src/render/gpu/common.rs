//! Vertex layout, shader assembly and state conversions shared by the line pipelines.

use bytemuck::{Pod, Zeroable};

use crate::render::program::{Defines, LineDefine, ProgramVariant};
use crate::render::state::{
    ColorMode, CompareFunction, CullFaceMode, DepthMask, StencilMode, StencilOp, TextureFilter,
    TextureWrap,
};
use crate::render::uniforms::LineUniforms;

/// Depth/stencil attachment format expected in [`crate::render::RenderTarget`].
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

// ── blend ─────────────────────────────────────────────────────────────────

pub(super) fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

pub(super) fn color_target(format: wgpu::TextureFormat, mode: ColorMode) -> wgpu::ColorTargetState {
    let (blend, write_mask) = match mode {
        ColorMode::Unblended => (None, wgpu::ColorWrites::ALL),
        ColorMode::AlphaBlended => (Some(premul_alpha_blend()), wgpu::ColorWrites::ALL),
        ColorMode::Disabled => (None, wgpu::ColorWrites::empty()),
    };
    wgpu::ColorTargetState { format, blend, write_mask }
}

// ── depth / stencil ───────────────────────────────────────────────────────

pub(super) fn compare_function(f: CompareFunction) -> wgpu::CompareFunction {
    match f {
        CompareFunction::Never => wgpu::CompareFunction::Never,
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::Equal => wgpu::CompareFunction::Equal,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Greater => wgpu::CompareFunction::Greater,
        CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        CompareFunction::Always => wgpu::CompareFunction::Always,
    }
}

pub(super) fn stencil_operation(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        StencilOp::Invert => wgpu::StencilOperation::Invert,
        StencilOp::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
        StencilOp::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
    }
}

/// Stencil state for `mode`. The reference is dynamic and set per draw.
pub(super) fn stencil_state(mode: &StencilMode) -> wgpu::StencilState {
    let face = wgpu::StencilFaceState {
        compare: compare_function(mode.func.compare),
        fail_op: stencil_operation(mode.fail),
        depth_fail_op: stencil_operation(mode.depth_fail),
        pass_op: stencil_operation(mode.pass),
    };
    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: mode.func.mask as u32,
        write_mask: mode.write_mask as u32,
    }
}

pub(super) fn cull_mode(mode: CullFaceMode) -> Option<wgpu::Face> {
    match mode {
        CullFaceMode::Disabled => None,
        CullFaceMode::Back => Some(wgpu::Face::Back),
    }
}

/// Everything that bakes into a line render pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub variant: ProgramVariant,
    pub defines: Defines,
    pub depth_compare: CompareFunction,
    pub depth_mask: DepthMask,
    /// Stencil mode with the reference zeroed.
    pub stencil: StencilMode,
    pub color: ColorMode,
    pub cull: CullFaceMode,
}

impl PipelineKey {
    pub fn from_draw(variant: ProgramVariant, defines: Defines, draw: &crate::render::DrawCall) -> Self {
        Self {
            variant,
            defines,
            depth_compare: draw.depth.compare,
            depth_mask: draw.depth.mask,
            stencil: StencilMode { reference: 0, ..draw.stencil },
            color: draw.color,
            cull: draw.cull,
        }
    }

    pub fn depth_stencil(&self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DEPTH_STENCIL_FORMAT,
            depth_write_enabled: self.depth_mask == DepthMask::ReadWrite,
            depth_compare: compare_function(self.depth_compare),
            stencil: stencil_state(&self.stencil),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

// ── samplers ──────────────────────────────────────────────────────────────

pub(super) fn sampler_descriptor(
    filter: TextureFilter,
    wrap: TextureWrap,
) -> wgpu::SamplerDescriptor<'static> {
    let address_mode = match wrap {
        TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
    };
    let filter_mode = match filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    };
    wgpu::SamplerDescriptor {
        label: Some("contour line sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter_mode,
        min_filter: filter_mode,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    }
}

// ── shader ────────────────────────────────────────────────────────────────

const LINE_SHADER: &str = include_str!("shaders/line.wgsl");

/// WGSL source of a program: one boolean constant per define, then the shared shader body.
pub(super) fn shader_source(defines: Defines) -> String {
    let mut src = String::with_capacity(LINE_SHADER.len() + 128);
    for define in LineDefine::ALL {
        src.push_str(&format!("const {}: bool = {};\n", define.name(), defines.contains(define)));
    }
    src.push_str(LINE_SHADER);
    src
}

pub(super) fn fragment_entry(variant: ProgramVariant) -> &'static str {
    match variant {
        ProgramVariant::Line => "fs_line",
        ProgramVariant::LinePattern => "fs_pattern",
    }
}

// ── uniforms ──────────────────────────────────────────────────────────────

/// Distance between consecutive uniform blocks in the dynamic-offset buffer.
pub(super) fn uniform_stride(min_alignment: u32) -> u64 {
    let size = std::mem::size_of::<LineUniforms>() as u64;
    let align = u64::from(min_alignment.max(1));
    size.div_ceil(align) * align
}

pub(super) fn uniform_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<LineUniforms>() as u64)
        .expect("LineUniforms has non-zero size by construction")
}

// ── vertex ────────────────────────────────────────────────────────────────

/// One tessellated line vertex.
///
/// `pos` is in tile units; the vertex is pushed out along `extrude` (unit
/// length) by half the line width in pixels. `side` is -1 or 1 on the two
/// edges of the line and interpolates to 0 along its center. Paint attributes
/// (`width`, `opacity`, `color`) are read when the matching uniform is
/// data-driven.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub pos: [f32; 2],
    pub extrude: [f32; 2],
    pub side: f32,
    /// Distance from the line start in tile units (dash and pattern coordinates).
    pub linesofar: f32,
    /// Normalized line progress within the gradient row, in `[0, 1]`.
    pub progress: f32,
    /// Gradient row (line clip index).
    pub clip_row: f32,
    pub width: f32,
    pub opacity: f32,
    pub color: [f32; 4],
}

impl LineVertex {
    const ATTRS: [wgpu::VertexAttribute; 9] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2, // extrude
        2 => Float32,   // side
        3 => Float32,   // linesofar
        4 => Float32,   // progress
        5 => Float32,   // clip_row
        6 => Float32,   // width
        7 => Float32,   // opacity
        8 => Float32x4  // color
    ];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

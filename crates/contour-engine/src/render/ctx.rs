/// Renderer-facing context (device/queue + color format + target size).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
    /// Target size in physical pixels.
    pub viewport: [u32; 2],
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        color_format: wgpu::TextureFormat,
        viewport: [u32; 2],
    ) -> Self {
        Self { device, queue, color_format, viewport }
    }
}

/// Target for drawing (encoder + color view + depth/stencil view).
///
/// The depth/stencil view must use [`crate::render::gpu::DEPTH_STENCIL_FORMAT`]
/// and already hold the tile clip masks drawn by the painter.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub depth_stencil_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        depth_stencil_view: &'a wgpu::TextureView,
    ) -> Self {
        Self { encoder, color_view, depth_stencil_view }
    }
}

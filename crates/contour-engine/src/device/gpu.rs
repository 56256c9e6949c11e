use anyhow::{Context, Result};

use crate::render::gpu::DEPTH_STENCIL_FORMAT;
use crate::render::{RenderCtx, RenderTarget};

use super::GpuInit;

/// Owns wgpu core objects for offscreen rendering.
///
/// This type is the low-level rendering context:
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates offscreen targets sized in physical pixels
/// - hands out encoders and submits them
pub struct Gpu {
    /// wgpu instance used to create the adapter.
    _instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Color format of created targets.
    color_format: wgpu::TextureFormat,
}

/// Color and depth/stencil textures of one offscreen frame.
pub struct OffscreenTarget {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_stencil: wgpu::Texture,
    pub depth_stencil_view: wgpu::TextureView,
    /// Size in physical pixels.
    pub size: [u32; 2],
}

impl OffscreenTarget {
    /// Borrows the views together with `encoder` as a render target.
    pub fn as_render_target<'a>(&'a self, encoder: &'a mut wgpu::CommandEncoder) -> RenderTarget<'a> {
        RenderTarget::new(encoder, &self.color_view, &self.depth_stencil_view)
    }
}

impl Gpu {
    /// Creates a GPU context without a surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new_headless(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("contour-engine device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!("gpu: {} ({:?}, {:?})", info.name, info.device_type, info.backend);

        Ok(Gpu {
            _instance: instance,
            adapter,
            device,
            queue,
            color_format: init.color_format,
        })
    }

    /// Blocking variant of [`Gpu::new_headless`] for callers without an executor.
    pub fn new_headless_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new_headless(init))
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Hardware limit for either texture dimension; feeds `FrameState::max_texture_size`.
    pub fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Renderer context for a target of `size` physical pixels.
    pub fn render_ctx(&self, size: [u32; 2]) -> RenderCtx<'_> {
        RenderCtx::new(&self.device, &self.queue, self.color_format, size)
    }

    /// Creates an offscreen color + depth/stencil target.
    pub fn create_target(&self, size: [u32; 2]) -> Result<OffscreenTarget> {
        let [width, height] = size;
        anyhow::ensure!(width > 0 && height > 0, "offscreen target has zero size");
        let max = self.max_texture_size();
        anyhow::ensure!(
            width <= max && height <= max,
            "offscreen target {}x{} exceeds device limit {}",
            width,
            height,
            max
        );

        let extent = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let color = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("contour offscreen color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth_stencil = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("contour offscreen depth/stencil"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Ok(OffscreenTarget {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_stencil_view: depth_stencil.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            depth_stencil,
            size,
        })
    }

    /// Creates an encoder for one frame of work.
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("contour frame encoder"),
        })
    }

    /// Clears color, depth and stencil of `target`.
    pub fn clear_target(&self, encoder: &mut wgpu::CommandEncoder, target: &OffscreenTarget, color: wgpu::Color) {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("contour clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_stencil_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    /// Submits the recorded commands.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

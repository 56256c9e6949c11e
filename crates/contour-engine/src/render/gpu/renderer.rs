use std::collections::HashMap;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::render::command::CommandList;
use crate::render::program::Defines;
use crate::render::state::{TextureFilter, TextureWrap};
use crate::render::texture::{RgbaImage, TextureId};
use crate::render::{RenderCtx, RenderTarget};
use crate::tile::GeometryId;

use super::common::{
    LineVertex, PipelineKey, color_target, cull_mode, fragment_entry, sampler_descriptor,
    shader_source, uniform_min_binding_size, uniform_stride,
};
use super::plan::{TextureBinding, plan};

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: [u32; 2],
}

struct GpuGeometry {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

/// wgpu backend replaying recorded line commands.
///
/// Owns every GPU resource the command stream refers to by handle: uploaded
/// geometry, textures (ramps and tile atlases), and one pipeline per distinct
/// program/state combination. The stencil reference of a draw is dynamic, so
/// tiles share pipelines.
#[derive(Default)]
pub struct LineGpuRenderer {
    color_format: Option<wgpu::TextureFormat>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: Option<wgpu::PipelineLayout>,

    shaders: HashMap<Defines, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    samplers: HashMap<(TextureFilter, TextureWrap), wgpu::Sampler>,

    textures: HashMap<TextureId, GpuTexture>,
    /// 1x1 white texture bound to units nothing was bound to.
    fallback: Option<GpuTexture>,

    geometries: HashMap<GeometryId, GpuGeometry>,
    next_geometry: u64,

    uniform_buffer: Option<wgpu::Buffer>,
    uniform_capacity: usize,
}

impl LineGpuRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads tessellated line geometry and returns the handle buckets refer to.
    pub fn upload_geometry(&mut self, ctx: &RenderCtx<'_>, vertices: &[LineVertex], indices: &[u32]) -> GeometryId {
        let vertices = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("contour line vbo"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("contour line ibo"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(id, GpuGeometry { vertices, indices });
        id
    }

    pub fn remove_geometry(&mut self, id: GeometryId) {
        self.geometries.remove(&id);
    }

    /// Uploads a texture owned outside the command stream (tile atlases).
    pub fn register_texture(&mut self, ctx: &RenderCtx<'_>, texture: TextureId, image: &RgbaImage) {
        self.upload_texture(ctx, texture, image);
    }

    pub fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    #[inline]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Replays `commands` into `target`.
    ///
    /// Fails if a draw is recorded before any program. Draws over unknown
    /// geometry are skipped; unknown textures fall back to white.
    pub fn submit(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, commands: &CommandList) -> Result<()> {
        let frame = plan(commands)?;

        self.ensure_layout(ctx);
        self.ensure_fallback(ctx);
        self.ensure_sampler(ctx, TextureFilter::Linear, TextureWrap::ClampToEdge);

        for (texture, image) in &frame.uploads {
            self.upload_texture(ctx, *texture, image);
        }

        let stride = uniform_stride(ctx.device.limits().min_uniform_buffer_offset_alignment);
        self.ensure_uniform_capacity(ctx, frame.draw_count(), stride);

        // Resolve every draw against GPU resources before encoding.
        let mut uniform_bytes = vec![0u8; frame.draw_count() * stride as usize];
        let mut bind_groups: Vec<wgpu::BindGroup> = Vec::new();
        let mut bind_group_index: HashMap<(Option<TextureBinding>, Option<TextureBinding>), usize> = HashMap::new();
        let mut passes = Vec::with_capacity(frame.passes.len());
        let mut slot = 0usize;

        for pass in &frame.passes {
            let mut draws = Vec::with_capacity(pass.draws.len());
            for planned in &pass.draws {
                if !self.geometries.contains_key(&planned.draw.geometry) {
                    log::warn!(
                        "line draw for layer `{}` on tile {}: unknown geometry {:?}",
                        planned.draw.layer,
                        planned.draw.tile,
                        planned.draw.geometry
                    );
                    continue;
                }
                self.ensure_pipeline(ctx, planned.key)?;
                for binding in [planned.atlas, planned.ramp].into_iter().flatten() {
                    self.ensure_sampler(ctx, binding.filter, binding.wrap);
                }

                let bindings = (planned.atlas, planned.ramp);
                let group = match bind_group_index.get(&bindings) {
                    Some(i) => *i,
                    None => {
                        bind_groups.push(self.create_bind_group(ctx, planned.atlas, planned.ramp)?);
                        bind_group_index.insert(bindings, bind_groups.len() - 1);
                        bind_groups.len() - 1
                    }
                };

                let offset = slot * stride as usize;
                let block = bytemuck::bytes_of(&planned.draw.uniforms);
                uniform_bytes[offset..offset + block.len()].copy_from_slice(block);
                slot += 1;

                draws.push((planned, group, offset as u32));
            }
            passes.push((pass.clear_stencil, draws));
        }

        let uniforms = self.uniform_buffer.as_ref().context("line uniform buffer missing")?;
        if slot > 0 {
            ctx.queue.write_buffer(uniforms, 0, &uniform_bytes[..slot * stride as usize]);
        }

        let [width, height] = ctx.viewport;
        for (clear_stencil, draws) in &passes {
            let stencil_load = match clear_stencil {
                Some(value) => wgpu::LoadOp::Clear(u32::from(*value)),
                None => wgpu::LoadOp::Load,
            };

            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("contour line pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_stencil_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: stencil_load,
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (planned, group, offset) in draws {
                let draw = planned.draw;
                let Some(pipeline) = self.pipelines.get(&planned.key) else { continue };
                let Some(geometry) = self.geometries.get(&draw.geometry) else { continue };

                let [near, far] = draw.depth.range;
                rpass.set_viewport(0.0, 0.0, width.max(1) as f32, height.max(1) as f32, near, far);
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, &bind_groups[*group], &[*offset]);
                rpass.set_stencil_reference(u32::from(draw.stencil.reference));
                rpass.set_vertex_buffer(0, geometry.vertices.slice(..));
                rpass.set_index_buffer(geometry.indices.slice(..), wgpu::IndexFormat::Uint32);

                for segment in &draw.segments {
                    let indices = segment.index_offset..segment.index_offset + segment.index_count;
                    rpass.draw_indexed(indices, segment.vertex_offset as i32, 0..1);
                }
            }
        }

        for texture in &frame.destroys {
            self.textures.remove(texture);
        }
        Ok(())
    }

    fn ensure_layout(&mut self, ctx: &RenderCtx<'_>) {
        if self.color_format != Some(ctx.color_format) {
            // Pipelines bake the color format.
            self.pipelines.clear();
            self.color_format = Some(ctx.color_format);
        }
        if self.pipeline_layout.is_some() {
            return;
        }

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("contour line bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: Some(uniform_min_binding_size()),
                    },
                    count: None,
                },
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("contour line pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        self.bind_group_layout = Some(bgl);
        self.pipeline_layout = Some(pipeline_layout);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, key: PipelineKey) -> Result<()> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let layout = self.pipeline_layout.as_ref().context("line pipeline layout missing")?;
        let format = self.color_format.context("line color format unknown")?;

        let shader = self.shaders.entry(key.defines).or_insert_with(|| {
            ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("contour line shader"),
                source: wgpu::ShaderSource::Wgsl(shader_source(key.defines).into()),
            })
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("contour line pipeline"),
            layout: Some(layout),

            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[LineVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(fragment_entry(key.variant)),
                compilation_options: Default::default(),
                targets: &[Some(color_target(format, key.color))],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: cull_mode(key.cull),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(key.depth_stencil()),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "line pipeline: {} {:?} stencil {:?}/{:?} ({} cached)",
            key.variant.name(),
            key.defines,
            key.stencil.func.compare,
            key.stencil.pass,
            self.pipelines.len() + 1
        );
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>, filter: TextureFilter, wrap: TextureWrap) {
        self.samplers
            .entry((filter, wrap))
            .or_insert_with(|| ctx.device.create_sampler(&sampler_descriptor(filter, wrap)));
    }

    fn ensure_fallback(&mut self, ctx: &RenderCtx<'_>) {
        if self.fallback.is_some() {
            return;
        }
        let white = create_texture(ctx.device, "contour line fallback texture", [1, 1]);
        write_texels(ctx.queue, &white.texture, [1, 1], &[255; 4]);
        self.fallback = Some(white);
    }

    fn ensure_uniform_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize, stride: u64) {
        if required <= self.uniform_capacity && self.uniform_buffer.is_some() {
            return;
        }
        let capacity = required.next_power_of_two().max(16);
        self.uniform_buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("contour line ubo"),
            size: capacity as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.uniform_capacity = capacity;
    }

    /// Creates a texture on first upload or size change, then writes `image` into it.
    fn upload_texture(&mut self, ctx: &RenderCtx<'_>, id: TextureId, image: &RgbaImage) {
        let size = [image.width(), image.height()];
        if size[0] == 0 || size[1] == 0 {
            log::warn!("line texture {:?}: empty image ignored", id);
            return;
        }
        let reuse = self.textures.get(&id).is_some_and(|t| t.size == size);
        if !reuse {
            self.textures.insert(id, create_texture(ctx.device, "contour line texture", size));
        }
        let Some(gpu) = self.textures.get(&id) else { return };
        write_texels(ctx.queue, &gpu.texture, size, image.data());
    }

    fn texture_view(&self, binding: Option<TextureBinding>) -> Result<(&wgpu::TextureView, &wgpu::Sampler)> {
        let fallback = self.fallback.as_ref().context("line fallback texture missing")?;
        let default_sampler = self
            .samplers
            .get(&(TextureFilter::Linear, TextureWrap::ClampToEdge))
            .context("line default sampler missing")?;

        let Some(binding) = binding else {
            return Ok((&fallback.view, default_sampler));
        };
        let sampler = self.samplers.get(&(binding.filter, binding.wrap)).unwrap_or(default_sampler);
        match self.textures.get(&binding.texture) {
            Some(texture) => Ok((&texture.view, sampler)),
            None => {
                log::warn!("line texture {:?} bound but never uploaded", binding.texture);
                Ok((&fallback.view, sampler))
            }
        }
    }

    fn create_bind_group(
        &self,
        ctx: &RenderCtx<'_>,
        atlas: Option<TextureBinding>,
        ramp: Option<TextureBinding>,
    ) -> Result<wgpu::BindGroup> {
        let layout = self.bind_group_layout.as_ref().context("line bind group layout missing")?;
        let uniforms = self.uniform_buffer.as_ref().context("line uniform buffer missing")?;
        let (atlas_view, atlas_sampler) = self.texture_view(atlas)?;
        let (ramp_view, ramp_sampler) = self.texture_view(ramp)?;

        Ok(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("contour line bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: uniforms,
                        offset: 0,
                        size: Some(uniform_min_binding_size()),
                    }),
                },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(atlas_view) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(atlas_sampler) },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(ramp_view) },
                wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::Sampler(ramp_sampler) },
            ],
        }))
    }
}

fn create_texture(device: &wgpu::Device, label: &'static str, [width, height]: [u32; 2]) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view, size: [width, height] }
}

fn write_texels(queue: &wgpu::Queue, texture: &wgpu::Texture, [width, height]: [u32; 2], data: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
    );
}

//! wgpu implementation of [`GraphicsBackend`].
//!
//! Every program shares one bind group layout: source texture, sampler, a
//! uniform block of eight vec4 slots, and a destination snapshot used only
//! by the blend program. Named uniforms map to slots in the order given by
//! [`ShaderSource::uniforms`]. Link failures are detected with a validation
//! error scope around module and pipeline creation.

use bytemuck::{Pod, Zeroable};
use framestack_core::{FrameBuffer, FramestackError, Result};
use std::collections::HashMap;
use std::sync::mpsc;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::backend::{
    FramebufferId, GraphicsBackend, ProgramId, ShaderSource, TextureDesc, TextureFilter,
    TextureId, Uniform,
};
use crate::context::GpuContext;
use crate::coords::{Mesh, MeshVertex};

const PRELUDE: &str = include_str!("shaders/prelude.wgsl");
const BLEND: &str = include_str!("shaders/blend.wgsl");
const EFFECT_MAIN: &str = "
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return effect(in.uv, sample_src(in.uv));
}
";
const PASSTHROUGH: &str = "
fn effect(uv: vec2<f32>, color: vec4<f32>) -> vec4<f32> {
    return color;
}
";

const MAX_PARAMS: usize = 8;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ParamsBlock {
    target_size: [f32; 4],
    values: [[f32; 4]; MAX_PARAMS],
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    filter: TextureFilter,
}

struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniform_names: Vec<String>,
    values: [[f32; 4]; MAX_PARAMS],
    reads_destination: bool,
}

/// Hardware backend built on wgpu.
pub struct WgpuBackend {
    ctx: GpuContext,
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    linear: wgpu::Sampler,
    nearest: wgpu::Sampler,
    textures: HashMap<TextureId, GpuTexture>,
    framebuffers: HashMap<FramebufferId, TextureId>,
    programs: HashMap<ProgramId, GpuProgram>,
    passthrough: ProgramId,
    blend: ProgramId,
    output: FramebufferId,
    bound_fbo: FramebufferId,
    bound_program: Option<ProgramId>,
    next_id: u32,
}

impl WgpuBackend {
    /// Create a backend on `ctx` with a bound output framebuffer.
    pub fn new(ctx: GpuContext, width: u32, height: u32) -> Result<Self> {
        let device = &ctx.device;
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
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("framestack-bind-group-layout"),
            entries: &[
                texture_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(3),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("framestack-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let sampler = |filter| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                ..Default::default()
            })
        };
        let linear = sampler(wgpu::FilterMode::Linear);
        let nearest = sampler(wgpu::FilterMode::Nearest);

        let mut backend = Self {
            ctx,
            layout,
            pipeline_layout,
            linear,
            nearest,
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            programs: HashMap::new(),
            passthrough: ProgramId(0),
            blend: ProgramId(0),
            output: FramebufferId(0),
            bound_fbo: FramebufferId(0),
            bound_program: None,
            next_id: 1,
        };

        backend.passthrough = backend.link_module(
            "passthrough",
            format!("{PRELUDE}{PASSTHROUGH}{EFFECT_MAIN}"),
            Vec::new(),
            false,
        )?;
        backend.blend = backend.link_module(
            "blend",
            format!("{PRELUDE}{BLEND}"),
            vec!["blend_mode".to_string(), "opacity".to_string()],
            true,
        )?;
        if let Some(program) = backend.programs.get_mut(&backend.blend) {
            program.values[1] = [1.0, 0.0, 0.0, 0.0];
        }
        backend.output = backend.create_framebuffer(width, height)?;
        backend.bound_fbo = backend.output;
        info!("wgpu backend ready ({}x{})", width, height);
        Ok(backend)
    }

    pub fn output_framebuffer(&self) -> FramebufferId {
        self.output
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn new_texture(&self, width: u32, height: u32, label: &str) -> GpuTexture {
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        GpuTexture {
            texture,
            view,
            width,
            height,
            filter: TextureFilter::Linear,
        }
    }

    fn link_module(
        &mut self,
        label: &str,
        wgsl: String,
        uniform_names: Vec<String>,
        reads_destination: bool,
    ) -> Result<ProgramId> {
        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: FORMAT,
                    blend: if reads_destination {
                        None
                    } else {
                        Some(wgpu::BlendState::ALPHA_BLENDING)
                    },
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(FramestackError::Shader(format!("'{}': {}", label, err)));
        }

        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            GpuProgram {
                label: label.to_string(),
                pipeline,
                uniform_names,
                values: [[0.0; 4]; MAX_PARAMS],
                reads_destination,
            },
        );
        debug!("Linked program '{}' as {:?}", label, id);
        Ok(id)
    }

    fn target_texture(&self) -> Option<(TextureId, &GpuTexture)> {
        let id = self.framebuffers.get(&self.bound_fbo).copied()?;
        self.textures.get(&id).map(|t| (id, t))
    }

    /// Snapshot the bound framebuffer for programs that read the destination.
    fn snapshot_target(&self, encoder: &mut wgpu::CommandEncoder) -> Option<GpuTexture> {
        let (_, target) = self.target_texture()?;
        let copy = self.new_texture(target.width, target.height, "destination-snapshot");
        encoder.copy_texture_to_texture(
            target.texture.as_image_copy(),
            copy.texture.as_image_copy(),
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        Some(copy)
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(FramestackError::InvalidParameter(format!(
                "texture '{}' has zero size",
                desc.label
            )));
        }
        let mut texture = self.new_texture(desc.width, desc.height, &desc.label);
        texture.filter = desc.filter;
        let id = TextureId(self.allocate_id());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn upload_texture(&mut self, texture: TextureId, frame: &FrameBuffer) -> Result<()> {
        let target = self
            .textures
            .get(&texture)
            .ok_or_else(|| FramestackError::NotFound(format!("texture {:?}", texture)))?;
        if frame.width != target.width || frame.height != target.height {
            return Err(FramestackError::Gpu(format!(
                "Frame size {}x{} doesn't match texture size {}x{}",
                frame.width, frame.height, target.width, target.height
            )));
        }
        self.ctx.queue.write_texture(
            target.texture.as_image_copy(),
            &frame.to_rgba8(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(target.width * 4),
                rows_per_image: Some(target.height),
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn set_texture_filter(&mut self, texture: TextureId, filter: TextureFilter) {
        if let Some(t) = self.textures.get_mut(&texture) {
            t.filter = filter;
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    fn release_texture(&mut self, texture: TextureId) {
        if self.framebuffers.values().any(|t| *t == texture) {
            warn!("Refusing to release texture {:?} owned by a framebuffer", texture);
            return;
        }
        self.textures.remove(&texture);
    }

    fn read_texture(&mut self, texture: TextureId) -> Result<Vec<u8>> {
        let source = self
            .textures
            .get(&texture)
            .ok_or_else(|| FramestackError::NotFound(format!("texture {:?}", texture)))?;
        let unpadded = source.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("framestack-readback"),
            size: padded as u64 * source.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        encoder.copy_texture_to_buffer(
            source.texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(source.height),
                },
            },
            wgpu::Extent3d {
                width: source.width,
                height: source.height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| FramestackError::Gpu("GPU map callback dropped".to_string()))?
            .map_err(|e| FramestackError::Gpu(format!("GPU buffer mapping failed: {}", e)))?;

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity((unpadded * source.height) as usize);
        for row in mapped.chunks_exact(padded as usize) {
            out.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(out)
    }

    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId> {
        let texture = self.create_texture(&TextureDesc::new(width, height, "framebuffer"))?;
        let fbo = FramebufferId(self.allocate_id());
        self.framebuffers.insert(fbo, texture);
        Ok(fbo)
    }

    fn framebuffer_texture(&self, fbo: FramebufferId) -> Option<TextureId> {
        self.framebuffers.get(&fbo).copied()
    }

    fn release_framebuffer(&mut self, fbo: FramebufferId) {
        if fbo == self.output {
            warn!("Refusing to release the output framebuffer");
            return;
        }
        if let Some(texture) = self.framebuffers.remove(&fbo) {
            self.textures.remove(&texture);
        }
        if self.bound_fbo == fbo {
            self.bound_fbo = self.output;
        }
    }

    fn current_framebuffer(&self) -> FramebufferId {
        self.bound_fbo
    }

    fn bind_framebuffer(&mut self, fbo: FramebufferId) {
        self.bound_fbo = fbo;
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let Some((_, target)) = self.target_texture() else {
            warn!("clear with no valid framebuffer bound ({:?})", self.bound_fbo);
            return;
        };
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("framestack-clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: rgba[0] as f64,
                            g: rgba[1] as f64,
                            b: rgba[2] as f64,
                            a: rgba[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.ctx.queue.submit(Some(encoder.finish()));
    }

    fn link_program(&mut self, source: &ShaderSource) -> Result<ProgramId> {
        let body = source.wgsl.as_deref().ok_or_else(|| {
            FramestackError::Shader(format!("'{}' has no WGSL source", source.label))
        })?;
        if source.uniforms.len() > MAX_PARAMS {
            return Err(FramestackError::Shader(format!(
                "'{}' declares {} uniforms, at most {} are supported",
                source.label,
                source.uniforms.len(),
                MAX_PARAMS
            )));
        }
        self.link_module(
            &source.label,
            format!("{PRELUDE}{body}{EFFECT_MAIN}"),
            source.uniforms.clone(),
            false,
        )
    }

    fn blend_program(&self) -> ProgramId {
        self.blend
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.bound_program
    }

    fn bind_program(&mut self, program: Option<ProgramId>) {
        self.bound_program = program;
    }

    fn set_uniform(&mut self, name: &str, value: Uniform) {
        let Some(program) = self.bound_program.and_then(|id| self.programs.get_mut(&id)) else {
            return;
        };
        match program.uniform_names.iter().position(|n| n == name) {
            Some(slot) => program.values[slot] = value.to_vec4(),
            None => debug!("program '{}' has no uniform '{}'", program.label, name),
        }
    }

    fn release_program(&mut self, program: ProgramId) {
        if program == self.blend || program == self.passthrough {
            return;
        }
        self.programs.remove(&program);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn draw_mesh(&mut self, texture: TextureId, mesh: &Mesh) {
        let Some((target_id, target)) = self.target_texture() else {
            warn!("draw with no valid framebuffer bound ({:?})", self.bound_fbo);
            return;
        };
        if target_id == texture {
            warn!("Skipping draw that samples its own target {:?}", self.bound_fbo);
            return;
        }
        let Some(source) = self.textures.get(&texture) else {
            warn!("draw from unknown texture {:?}", texture);
            return;
        };
        let program_id = self.bound_program.unwrap_or(self.passthrough);
        let Some(program) = self.programs.get(&program_id) else {
            warn!("draw with unknown program {:?}", program_id);
            return;
        };

        let device = &self.ctx.device;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let snapshot = if program.reads_destination {
            self.snapshot_target(&mut encoder)
        } else {
            None
        };
        let destination = snapshot.as_ref().map(|s| &s.view).unwrap_or(&source.view);

        let params = ParamsBlock {
            target_size: [target.width as f32, target.height as f32, 0.0, 0.0],
            values: program.values,
        };
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("framestack-params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let vertices: Vec<MeshVertex> = mesh.triangles().flatten().collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("framestack-mesh"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sampler = match source.filter {
            TextureFilter::Linear => &self.linear,
            TextureFilter::Nearest => &self.nearest,
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("framestack-draw"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(destination),
                },
            ],
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(program.label.as_str()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.draw(0..vertices.len() as u32, 0..1);
        }
        self.ctx.queue.submit(Some(encoder.finish()));
    }
}

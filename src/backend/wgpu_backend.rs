//! [`RenderBackend`] implementation on top of wgpu.

use std::mem;

use bytemuck::{Pod, Zeroable};
use glamx::Mat4;

use super::{RenderBackend, ShaderStage, UniformLocation};
use crate::config::SegmentationConfig;
use crate::context::Context;
use crate::error::{Result, SegmentationError};
use crate::readout::BYTES_PER_PIXEL;
use crate::resource::{DynamicUniformBuffer, WgpuTarget};

/// Per-draw uniforms of the override shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct OverrideUniforms {
    /// Model-view-projection matrix of the draw.
    pub transform: [[f32; 4]; 4],
    pub color_r: i32,
    pub color_g: i32,
    pub color_b: i32,
    pub _padding: i32,
}

/// A linked override program.
pub struct WgpuProgram {
    pipeline: wgpu::RenderPipeline,
}

/// What the host needs to issue one draw with the override program.
pub struct OverrideDraw<'a> {
    /// Pipeline to set on the render pass.
    pub pipeline: &'a wgpu::RenderPipeline,
    /// Bind group for group 0.
    pub bind_group: &'a wgpu::BindGroup,
    /// Dynamic offset of this draw's uniforms in `bind_group`.
    pub offset: u32,
}

impl OverrideDraw<'_> {
    /// Sets the pipeline and uniforms of this draw on `pass`.
    ///
    /// The host then binds its position buffer at slot 0, its texture coordinate
    /// buffer at slot 1, and draws.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(self.pipeline);
        pass.set_bind_group(0, self.bind_group, &[self.offset]);
    }
}

/// Drives the segmentation pipeline on a wgpu device.
///
/// The backend owns the main target the host renders its frames into. The host
/// records its draws through [`Self::begin_render_pass`] and, before each draw, asks
/// [`Self::override_draw`] whether the override program must replace its own pipeline.
pub struct WgpuBackend {
    ctxt: Context,
    main: WgpuTarget,
    bound: Option<(wgpu::TextureView, wgpu::TextureView)>,
    encoder: Option<wgpu::CommandEncoder>,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: DynamicUniformBuffer<OverrideUniforms>,
    bind_group: wgpu::BindGroup,
    active: Option<wgpu::RenderPipeline>,
    current: OverrideUniforms,
}

impl WgpuBackend {
    /// Creates a backend whose main target is `width` x `height`.
    ///
    /// # Arguments
    /// * `ctxt` - The GPU context
    /// * `width`, `height` - Initial size of the main target
    /// * `config` - Pipeline settings; `uniform_capacity` sizes the per-draw uniforms
    pub fn new(
        ctxt: Context,
        width: u32,
        height: u32,
        config: &SegmentationConfig,
    ) -> WgpuBackend {
        let main = WgpuTarget::new(&ctxt, width, height, "main_target");

        let uniforms =
            DynamicUniformBuffer::new(&ctxt, "override_uniforms", config.uniform_capacity);
        let bind_group_layout = ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("override_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(uniforms.binding_size()),
                },
                count: None,
            }],
        });
        let bind_group = Self::create_bind_group(&ctxt, &bind_group_layout, &uniforms);

        WgpuBackend {
            ctxt,
            main,
            bound: None,
            encoder: None,
            bind_group_layout,
            uniforms,
            bind_group,
            active: None,
            current: OverrideUniforms::zeroed(),
        }
    }

    fn create_bind_group(
        ctxt: &Context,
        layout: &wgpu::BindGroupLayout,
        uniforms: &DynamicUniformBuffer<OverrideUniforms>,
    ) -> wgpu::BindGroup {
        ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("override_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: uniforms.buffer(),
                    offset: 0,
                    size: Some(uniforms.binding_size()),
                }),
            }],
        })
    }

    /// The GPU context.
    pub fn context(&self) -> &Context {
        &self.ctxt
    }

    /// The main target, e.g. to present or copy it once a frame is done.
    pub fn main_target(&self) -> &WgpuTarget {
        &self.main
    }

    /// Number of override draws the per-draw uniform buffer holds before growing.
    pub fn uniform_capacity(&self) -> usize {
        self.uniforms.capacity()
    }

    /// Resizes the main target. Does nothing if the size is unchanged.
    pub fn resize_main(&mut self, width: u32, height: u32) {
        if self.main.width == width.max(1) && self.main.height == height.max(1) {
            return;
        }
        // Work recorded against the old target must reach the GPU before it is released.
        self.submit();
        let old = mem::replace(
            &mut self.main,
            WgpuTarget::new(&self.ctxt, width, height, "main_target"),
        );
        old.destroy();
    }

    fn bound_views(&self) -> (wgpu::TextureView, wgpu::TextureView) {
        match &self.bound {
            Some((color, depth)) => (color.clone(), depth.clone()),
            None => (self.main.color_view.clone(), self.main.depth_view.clone()),
        }
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let ctxt = &self.ctxt;
        self.encoder
            .get_or_insert_with(|| ctxt.create_command_encoder(Some("segmap3d_frame_encoder")))
    }

    /// Opens a render pass on the bound target, keeping its current content.
    ///
    /// The pass must be dropped before the next hook that touches targets
    /// (`begin_pass`, `end_pass` or a read-back).
    pub fn begin_render_pass(&mut self, label: &str) -> wgpu::RenderPass<'static> {
        let (color_view, depth_view) = self.bound_views();
        self.encoder()
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime()
    }

    /// Whether the override program is active for upcoming draws.
    pub fn is_override_active(&self) -> bool {
        self.active.is_some()
    }

    /// Prepares one override draw with the given transform.
    ///
    /// Returns `None` when the override program is not active, in which case the host
    /// draws with its own pipeline.
    pub fn override_draw(&mut self, transform: Mat4) -> Option<OverrideDraw<'_>> {
        if self.active.is_none() {
            return None;
        }

        self.current.transform = transform.to_cols_array_2d();
        let (offset, reallocated) = self.uniforms.push(&self.ctxt, &self.current);
        if reallocated {
            self.bind_group =
                Self::create_bind_group(&self.ctxt, &self.bind_group_layout, &self.uniforms);
        }

        Some(OverrideDraw {
            pipeline: self.active.as_ref()?,
            bind_group: &self.bind_group,
            offset,
        })
    }

    /// Submits all recorded work.
    pub fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.ctxt.submit(std::iter::once(encoder.finish()));
        }
    }
}

impl RenderBackend for WgpuBackend {
    type Shader = wgpu::ShaderModule;
    type Program = WgpuProgram;
    type Target = WgpuTarget;

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> std::result::Result<wgpu::ShaderModule, String> {
        log::debug!("compiling {:?} shader {}", stage, label);
        self.ctxt.try_create_shader_module(Some(label), source)
    }

    fn link_program(
        &mut self,
        label: &str,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
    ) -> std::result::Result<WgpuProgram, String> {
        let pipeline_layout = self
            .ctxt
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("override_pipeline_layout"),
                bind_group_layouts: &[&self.bind_group_layout],
                push_constant_ranges: &[],
            });

        let vertex_buffers = [
            // Buffer 0: Positions
            wgpu::VertexBufferLayout {
                array_stride: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                }],
            },
            // Buffer 1: Texture coordinates
            wgpu::VertexBufferLayout {
                array_stride: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                }],
            },
        ];

        let pipeline = self
            .ctxt
            .try_create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: Some("vs_main"),
                    buffers: &vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.ctxt.target_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: Context::depth_format(),
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })?;

        Ok(WgpuProgram { pipeline })
    }

    fn uniform_location(&self, _program: &WgpuProgram, name: &str) -> Option<UniformLocation> {
        let offset = match name {
            "color_r" => mem::offset_of!(OverrideUniforms, color_r),
            "color_g" => mem::offset_of!(OverrideUniforms, color_g),
            "color_b" => mem::offset_of!(OverrideUniforms, color_b),
            _ => return None,
        };
        Some(UniformLocation(offset as u32))
    }

    fn release_shader(&mut self, shader: wgpu::ShaderModule) {
        drop(shader);
    }

    fn use_program(&mut self, program: Option<&WgpuProgram>) {
        self.active = program.map(|p| p.pipeline.clone());
    }

    fn set_uniform_i32(&mut self, _program: &WgpuProgram, location: UniformLocation, value: i32) {
        let start = location.0 as usize;
        let bytes = bytemuck::bytes_of_mut(&mut self.current);
        if let Some(slot) = bytes.get_mut(start..start + mem::size_of::<i32>()) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
    }

    fn main_target_size(&self) -> (u32, u32) {
        (self.main.width, self.main.height)
    }

    fn create_target(&mut self, width: u32, height: u32) -> Result<WgpuTarget> {
        self.ctxt
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let target = WgpuTarget::new(&self.ctxt, width, height, "segmentation_target");
        match pollster::block_on(self.ctxt.device.pop_error_scope()) {
            Some(err) => Err(SegmentationError::allocation(width, height, err)),
            None => Ok(target),
        }
    }

    fn destroy_target(&mut self, target: WgpuTarget) {
        // Work recorded against the target must reach the GPU before it is released.
        self.submit();
        target.destroy();
    }

    fn bind_target(&mut self, target: Option<&WgpuTarget>) {
        self.bound = target.map(|t| (t.color_view.clone(), t.depth_view.clone()));
    }

    fn clear_bound_target(&mut self, rgba: [f32; 4]) {
        let (color_view, depth_view) = self.bound_views();
        let _clear_pass = self
            .encoder()
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("segmentation_clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
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
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        // Render pass is dropped here, ending the clear pass
    }

    fn read_pixels(
        &mut self,
        source: Option<&WgpuTarget>,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        // Everything drawn so far must land before the copy.
        self.submit();

        let texture = &source.unwrap_or(&self.main).color_texture;
        let (width, height) = (width as usize, height as usize);

        // wgpu requires rows to be aligned to 256 bytes
        let unpadded_bytes_per_row = width * BYTES_PER_PIXEL;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
        let buffer_size = padded_bytes_per_row * height;

        let staging_buffer = self.ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readout_staging_buffer"),
            size: buffer_size as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .ctxt
            .create_command_encoder(Some("readout_copy_encoder"));
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row as u32),
                    rows_per_image: Some(height as u32),
                },
            },
            wgpu::Extent3d {
                width: width as u32,
                height: height as u32,
                depth_or_array_layers: 1,
            },
        );
        self.ctxt.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        // Wait for the GPU to finish
        let _ = self.ctxt.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(SegmentationError::readback)?
            .map_err(SegmentationError::readback)?;

        let data = buffer_slice.get_mapped_range();
        let is_bgra = matches!(
            self.ctxt.target_format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );

        // Strip row padding, swizzling RGBA -> BGRA if needed.
        for (row, dst) in out.chunks_exact_mut(unpadded_bytes_per_row).take(height).enumerate() {
            let src = &data[row * padded_bytes_per_row..][..unpadded_bytes_per_row];
            if is_bgra {
                dst.copy_from_slice(src);
            } else {
                for (d, s) in dst
                    .chunks_exact_mut(BYTES_PER_PIXEL)
                    .zip(src.chunks_exact(BYTES_PER_PIXEL))
                {
                    d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
                }
            }
        }

        drop(data);
        staging_buffer.unmap();
        Ok(())
    }

    fn end_frame(&mut self) {
        self.submit();
        self.uniforms.clear();
        self.active = None;
    }
}

/*!
# Reference wgpu Backend

Headless implementation of [`RenderBackend`] over wgpu: offscreen visible
and hit targets, one render pipeline per pass built from the opaque shader
pair of its [`PassDescriptor`], instanced point quads (six vertices per
instance, expanded in the vertex shader), and hit-target pixel readback.

Shader compile and link failures are surfaced from the async setup step,
before the first frame can be requested.

The named uniform set maps onto one fixed uniform block (see
[`PassUniforms`] layout in the reference shaders); names outside the
standard set are rejected. Hosts needing bespoke uniforms implement
[`RenderBackend`] themselves.
*/

use crate::error::RenderError;
use crate::render::{PassDescriptor, PassKind, RenderBackend};
use crate::selection::NO_SELECTION;
use crate::uniforms::{
    UniformValue, U_EYE_POS, U_EYE_POS_LOW, U_PROJ_TRANSFORM, U_SELECTED_ID,
};
use anyhow::{anyhow, Result};
use bytemuck::{Pod, Zeroable};
use log::debug;
use seamark_core::decode_pixel;

/// Shared device handle for the rendering pipeline
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Acquire a headless device. Returns `Ok(None)` when no adapter is
    /// available (CI machines without a GPU).
    pub async fn new() -> Result<Option<Self>> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Some(adapter) => adapter,
            None => return Ok(None),
        };
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Seamark GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        Ok(Some(Self {
            device,
            queue,
            adapter_info,
        }))
    }
}

/// Fixed uniform block shared by both passes. Field order and padding match
/// the `PassUniforms` struct the reference shaders declare (`mat3x2<f32>`
/// stored as three consecutive vec2 columns).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PassUniforms {
    eye_high: [f32; 2],
    eye_low: [f32; 2],
    proj: [f32; 6],
    selected_id: f32,
    _padding: f32,
}

fn pack_uniforms(values: &[(&str, UniformValue)]) -> Result<PassUniforms, RenderError> {
    let mut block = PassUniforms::zeroed();
    for (name, value) in values {
        match (*name, *value) {
            (U_EYE_POS, UniformValue::Vec2(v)) => block.eye_high = v,
            (U_EYE_POS_LOW, UniformValue::Vec2(v)) => block.eye_low = v,
            (U_PROJ_TRANSFORM, UniformValue::Mat2x3(m)) => block.proj = m,
            (U_SELECTED_ID, UniformValue::Float(v)) => block.selected_id = v,
            _ => return Err(RenderError::unknown_uniform(*name)),
        }
    }
    Ok(block)
}

struct PassResources {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    instance_buffer: Option<wgpu::Buffer>,
    instance_count: u32,
    floats_per_instance: usize,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    clear_color: wgpu::Color,
}

/// Headless two-target point renderer implementing [`RenderBackend`].
pub struct PointPipeline {
    ctx: GpuContext,
    size: [u32; 2],
    // index 0 = visible, 1 = hit
    passes: [PassResources; 2],
}

fn pass_index(pass: PassKind) -> usize {
    match pass {
        PassKind::Visible => 0,
        PassKind::Hit => 1,
    }
}

fn create_target(
    device: &wgpu::Device,
    size: [u32; 2],
    format: wgpu::TextureFormat,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

async fn build_pass(
    device: &wgpu::Device,
    desc: &PassDescriptor,
    kind: PassKind,
    size: [u32; 2],
) -> Result<PassResources> {
    let (format, blend, clear_color) = match kind {
        PassKind::Visible => (
            wgpu::TextureFormat::Rgba8UnormSrgb,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            wgpu::Color::TRANSPARENT,
        ),
        // the hit target clears to all-ones, which decodes to the
        // no-selection sentinel
        PassKind::Hit => (wgpu::TextureFormat::Rgba8Unorm, None, wgpu::Color::WHITE),
    };

    let floats_per_instance = 2 + desc.attributes.len();
    let mut attributes = vec![wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x2,
    }];
    for i in 0..desc.attributes.len() {
        attributes.push(wgpu::VertexAttribute {
            offset: (8 + 4 * i) as wgpu::BufferAddress,
            shader_location: (i + 1) as u32,
            format: wgpu::VertexFormat::Float32,
        });
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vertex_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Pass Vertex Shader"),
        source: wgpu::ShaderSource::Wgsl(desc.shaders.vertex.clone().into()),
    });
    let fragment_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Pass Fragment Shader"),
        source: wgpu::ShaderSource::Wgsl(desc.shaders.fragment.clone().into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("Pass Uniform Bind Group Layout"),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Pass Pipeline Layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Point Pass Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_shader,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (4 * floats_per_instance) as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &attributes,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_shader,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    });

    if let Some(error) = device.pop_error_scope().await {
        return Err(RenderError::shader_setup(kind.label(), error.to_string().as_str()).into());
    }

    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Pass Uniform Buffer"),
        size: std::mem::size_of::<PassUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
        label: Some("Pass Uniform Bind Group"),
    });

    let (target, target_view) = create_target(device, size, format, "Pass Target");

    Ok(PassResources {
        pipeline,
        uniform_buffer,
        bind_group,
        instance_buffer: None,
        instance_count: 0,
        floats_per_instance,
        target,
        target_view,
        clear_color,
    })
}

impl PointPipeline {
    /// Build both pass pipelines from their descriptors. Fails before the
    /// first frame if either shader pair does not compile.
    pub async fn new(
        ctx: GpuContext,
        visible: &PassDescriptor,
        hit: &PassDescriptor,
        size: [u32; 2],
    ) -> Result<Self> {
        let visible_pass = build_pass(&ctx.device, visible, PassKind::Visible, size).await?;
        let hit_pass = build_pass(&ctx.device, hit, PassKind::Hit, size).await?;
        debug!(
            "point pipeline ready on {} ({:?})",
            ctx.adapter_info.name, ctx.adapter_info.device_type
        );
        Ok(Self {
            ctx,
            size,
            passes: [visible_pass, hit_pass],
        })
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// View of the visible-pass target, for compositing by the host.
    pub fn visible_view(&self) -> &wgpu::TextureView {
        &self.passes[0].target_view
    }

    /// Recreate both offscreen targets for a new viewport size.
    pub fn resize(&mut self, size: [u32; 2]) {
        if size[0] == 0 || size[1] == 0 || size == self.size {
            return;
        }
        self.size = size;
        for (index, pass) in self.passes.iter_mut().enumerate() {
            let format = if index == 0 {
                wgpu::TextureFormat::Rgba8UnormSrgb
            } else {
                wgpu::TextureFormat::Rgba8Unorm
            };
            let (target, view) = create_target(&self.ctx.device, size, format, "Pass Target");
            pass.target = target;
            pass.target_view = view;
        }
    }

    /// Decode the feature identifier under a pixel from the hit target.
    /// `None` means no feature was drawn there.
    pub fn hit_id_at(&self, pixel: [u32; 2]) -> Result<Option<i32>> {
        if pixel[0] >= self.size[0] || pixel[1] >= self.size[1] {
            return Err(anyhow!(
                "pixel ({}, {}) outside {}x{} target",
                pixel[0],
                pixel[1],
                self.size[0],
                self.size[1]
            ));
        }

        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Hit Readback Buffer"),
            size: 16,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Hit Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.passes[1].target,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: pixel[0],
                    y: pixel[1],
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: None,
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()??;

        let rgba = {
            let data = slice.get_mapped_range();
            [data[0], data[1], data[2], data[3]]
        };
        staging.unmap();

        let id = decode_pixel(rgba);
        Ok((id != NO_SELECTION).then_some(id))
    }
}

impl RenderBackend for PointPipeline {
    fn upload_attributes(
        &mut self,
        pass: PassKind,
        names: &[&str],
        buffer: &[f32],
    ) -> Result<()> {
        let index = pass_index(pass);
        let expected = self.passes[index].floats_per_instance;
        if 2 + names.len() != expected {
            return Err(anyhow!(
                "{} pass expects {} attributes, got {}",
                pass.label(),
                expected - 2,
                names.len()
            ));
        }
        if buffer.len() % expected != 0 {
            return Err(anyhow!(
                "buffer length {} is not a multiple of the instance stride {}",
                buffer.len(),
                expected
            ));
        }

        let count = (buffer.len() / expected) as u32;
        let resources = &mut self.passes[index];
        if count == 0 {
            resources.instance_count = 0;
            return Ok(());
        }

        let byte_len = std::mem::size_of_val(buffer) as u64;
        let recreate = resources
            .instance_buffer
            .as_ref()
            .map(|b| b.size() != byte_len)
            .unwrap_or(true);
        if recreate {
            resources.instance_buffer =
                Some(self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Point Instance Buffer"),
                    size: byte_len,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }));
        }
        if let Some(instance_buffer) = &resources.instance_buffer {
            self.ctx
                .queue
                .write_buffer(instance_buffer, 0, bytemuck::cast_slice(buffer));
        }
        resources.instance_count = count;
        Ok(())
    }

    fn set_uniforms(
        &mut self,
        pass: PassKind,
        uniforms: &[(&str, UniformValue)],
    ) -> Result<()> {
        let block = pack_uniforms(uniforms)?;
        let resources = &self.passes[pass_index(pass)];
        self.ctx
            .queue
            .write_buffer(&resources.uniform_buffer, 0, bytemuck::bytes_of(&block));
        Ok(())
    }

    fn draw(&mut self, pass: PassKind, feature_count: usize) -> Result<()> {
        let resources = &self.passes[pass_index(pass)];
        if feature_count as u32 != resources.instance_count {
            debug!(
                "{} pass: drawing {} uploaded instances, caller reported {}",
                pass.label(),
                resources.instance_count,
                feature_count
            );
        }

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Point Pass Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &resources.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(resources.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&resources.pipeline);
            render_pass.set_bind_group(0, &resources.bind_group, &[]);
            if let Some(instance_buffer) = &resources.instance_buffer {
                if resources.instance_count > 0 {
                    render_pass.set_vertex_buffer(0, instance_buffer.slice(..));
                    render_pass.draw(0..6, 0..resources.instance_count);
                }
            }
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_uniforms_standard_names() {
        let block = pack_uniforms(&[
            (U_EYE_POS, UniformValue::Vec2([1.0, 2.0])),
            (U_EYE_POS_LOW, UniformValue::Vec2([0.25, 0.5])),
            (U_PROJ_TRANSFORM, UniformValue::Mat2x3([0.02, 0.0, 0.0, 0.02, 0.0, 0.0])),
            (U_SELECTED_ID, UniformValue::Float(f32::from_bits(77))),
        ])
        .unwrap();
        assert_eq!(block.eye_high, [1.0, 2.0]);
        assert_eq!(block.eye_low, [0.25, 0.5]);
        assert_eq!(block.selected_id.to_bits(), 77);
    }

    #[test]
    fn test_pack_uniforms_rejects_unknown_names() {
        let result = pack_uniforms(&[("u_mystery", UniformValue::Float(1.0))]);
        assert!(matches!(result, Err(RenderError::UnknownUniform { .. })));
    }

    #[test]
    fn test_uniform_block_layout_matches_wgsl() {
        // vec2 + vec2 + mat3x2 + f32 + pad, 8-byte aligned
        assert_eq!(std::mem::size_of::<PassUniforms>(), 48);
    }
}

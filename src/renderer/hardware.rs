// wgpu-backed frame renderer
// Uploads Y/U/V planes as R8 textures and composites them into an RGB
// canvas through a colorspace-conversion shader

use super::{FrameSink, RendererError, RendererOptions};
use crate::frame::{Chroma, FrameDesc};
use crate::planes::PlaneBuffers;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// WGSL shader compositing the three planes into RGB.
///
/// The fragment stage multiplies (y, u, v, 1) by a constant BT.601 matrix;
/// alpha comes out as 1. Each plane has its own interpolated coordinate so
/// the three samplings can in principle diverge, although the default quads
/// are identical.
const YUV_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) y_texture_pos: vec2<f32>,
    @location(2) u_texture_pos: vec2<f32>,
    @location(3) v_texture_pos: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) y_coord: vec2<f32>,
    @location(1) u_coord: vec2<f32>,
    @location(2) v_coord: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.position = vec4<f32>(input.position, 0.0, 1.0);
    output.y_coord = input.y_texture_pos;
    output.u_coord = input.u_texture_pos;
    output.v_coord = input.v_texture_pos;
    return output;
}

@group(0) @binding(0) var y_texture: texture_2d<f32>;
@group(0) @binding(1) var u_texture: texture_2d<f32>;
@group(0) @binding(2) var v_texture: texture_2d<f32>;
@group(0) @binding(3) var yuv_sampler: sampler;

// BT.601 YUV -> RGB transform, column vectors
const YUV2RGB: mat4x4<f32> = mat4x4<f32>(
    vec4<f32>(1.16438, 0.0, 1.59603, -0.87079),
    vec4<f32>(1.16438, -0.39176, -0.81297, 0.52959),
    vec4<f32>(1.16438, 2.01723, 0.0, -1.08139),
    vec4<f32>(0.0, 0.0, 0.0, 1.0),
);

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let y = textureSample(y_texture, yuv_sampler, input.y_coord).r;
    let u = textureSample(u_texture, yuv_sampler, input.u_coord).r;
    let v = textureSample(v_texture, yuv_sampler, input.v_coord).r;
    return vec4<f32>(y, u, v, 1.0) * YUV2RGB;
}
"#;

/// WGSL shader presenting the canvas into a window surface.
///
/// The crop uniform scales the texture coordinates down to the logical
/// region of the padded canvas so the window never shows padding bytes.
const BLIT_SHADER: &str = r#"
struct Crop {
    scale: vec2<f32>,
    _pad: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) tex_coord: vec2<f32>,
}

@group(0) @binding(0) var canvas_texture: texture_2d<f32>;
@group(0) @binding(1) var canvas_sampler: sampler;
@group(0) @binding(2) var<uniform> crop: Crop;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    var tex_coords = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 0.0),
    );

    var output: VertexOutput;
    output.position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    output.tex_coord = tex_coords[vertex_index] * crop.scale;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(canvas_texture, canvas_sampler, input.tex_coord);
}
"#;

/// Clockwise unit quad drawn as a 4-vertex triangle strip.
const QUAD_POSITIONS: [f32; 8] = [1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, -1.0];
/// Texture-space quad matching the vertex order of `QUAD_POSITIONS`.
const QUAD_TEXCOORDS: [f32; 8] = [1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0];

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const Y_TEXCOORD_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const U_TEXCOORD_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];
const V_TEXCOORD_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x2];

fn vec2_layout(attrs: &'static [wgpu::VertexAttribute; 1]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: attrs,
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CropUniform {
    scale: [f32; 2],
    _pad: [f32; 2],
}

/// Window present pass: blits the canvas into the surface.
struct Present {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    crop_ubo: wgpu::Buffer,
}

/// Hardware rendering path.
///
/// The composited image lives in a padded-resolution canvas texture; a
/// window, when attached, gets the logical region of that canvas blitted
/// into it with aspect-fit letterboxing.
pub struct HardwareRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,

    // YUV composite pipeline
    yuv_pipeline: wgpu::RenderPipeline,
    yuv_bind_group_layout: wgpu::BindGroupLayout,
    yuv_bind_group: wgpu::BindGroup,
    plane_textures: [wgpu::Texture; 3],
    sampler: wgpu::Sampler,

    // Static quad geometry
    position_buffer: wgpu::Buffer,
    texcoord_buffers: [wgpu::Buffer; 3],

    // Output surface at padded resolution
    canvas: wgpu::Texture,
    canvas_view: wgpu::TextureView,

    present: Option<Present>,

    planes: PlaneBuffers,
    desc: FrameDesc,
    padded_width: u32,
    padded_height: u32,
}

impl HardwareRenderer {
    /// Acquire a device and compile the pipelines.
    ///
    /// Fails with `GpuNotAvailable` when no adapter can be obtained, which
    /// the facade turns into the software fallback; every later failure is
    /// a fatal initialization error.
    pub async fn new(options: &RendererOptions) -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = match &options.window {
            Some(window) => Some(instance.create_surface(window.clone()).map_err(|e| {
                RendererError::InitError(format!("Failed to create surface: {}", e))
            })?),
            None => None,
        };

        // Prefer a real GPU; retry once accepting a software rasterizer
        // adapter before reporting the GPU as unavailable
        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(_) => instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: surface.as_ref(),
                    force_fallback_adapter: true,
                })
                .await
                .map_err(|e| {
                    RendererError::GpuNotAvailable(format!("Failed to request adapter: {}", e))
                })?,
        };

        log::info!("Using GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| RendererError::InitError(format!("Failed to create device: {}", e)))?;

        let desc = FrameDesc {
            width: options.width,
            height: options.height,
            chroma: options.chroma,
        };
        let (padded_width, padded_height) = desc.padded();

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Frame Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let planes = PlaneBuffers::new(padded_width, padded_height, options.chroma);
        let (canvas, canvas_view) = Self::create_canvas(&device, padded_width, padded_height);

        // YUV composite pipeline, always targeting the canvas format
        let yuv_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("YUV Shader"),
            source: wgpu::ShaderSource::Wgsl(YUV_SHADER.into()),
        });

        let yuv_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("YUV Bind Group Layout"),
                entries: &[
                    plane_texture_entry(0),
                    plane_texture_entry(1),
                    plane_texture_entry(2),
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let yuv_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("YUV Pipeline Layout"),
            bind_group_layouts: &[&yuv_bind_group_layout],
            immediate_size: 0,
        });

        let yuv_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("YUV Pipeline"),
            layout: Some(&yuv_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &yuv_shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    vec2_layout(&POSITION_ATTRS),
                    vec2_layout(&Y_TEXCOORD_ATTRS),
                    vec2_layout(&U_TEXCOORD_ATTRS),
                    vec2_layout(&V_TEXCOORD_ATTRS),
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &yuv_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        // Static quad geometry: one position buffer plus one texcoord buffer
        // per plane, bound as independent attributes
        let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Positions"),
            contents: bytemuck::cast_slice(&QUAD_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let texcoord_buffers = ["Y Texcoords", "U Texcoords", "V Texcoords"].map(|label| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&QUAD_TEXCOORDS),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let plane_textures = Self::create_plane_textures(&device, &planes);
        let yuv_bind_group =
            Self::create_yuv_bind_group(&device, &yuv_bind_group_layout, &plane_textures, &sampler);

        // Present pass, only with a window attached
        let present = match (surface, &options.window) {
            (Some(surface), Some(window)) => {
                let size = window.inner_size();
                let capabilities = surface.get_capabilities(&adapter);
                // The composite already produces display-referred RGB; an
                // sRGB surface would re-encode it
                let format = capabilities
                    .formats
                    .iter()
                    .find(|f| !f.is_srgb())
                    .copied()
                    .unwrap_or(capabilities.formats[0]);

                let present_mode =
                    if capabilities.present_modes.contains(&wgpu::PresentMode::Mailbox) {
                        wgpu::PresentMode::Mailbox
                    } else {
                        wgpu::PresentMode::Fifo // always supported
                    };

                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: size.width.max(1),
                    height: size.height.max(1),
                    present_mode,
                    alpha_mode: wgpu::CompositeAlphaMode::Auto,
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                surface.configure(&device, &config);

                let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("Blit Shader"),
                    source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
                });

                let bind_group_layout =
                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("Blit Bind Group Layout"),
                        entries: &[
                            wgpu::BindGroupLayoutEntry {
                                binding: 0,
                                visibility: wgpu::ShaderStages::FRAGMENT,
                                ty: wgpu::BindingType::Texture {
                                    sample_type: wgpu::TextureSampleType::Float {
                                        filterable: true,
                                    },
                                    view_dimension: wgpu::TextureViewDimension::D2,
                                    multisampled: false,
                                },
                                count: None,
                            },
                            wgpu::BindGroupLayoutEntry {
                                binding: 1,
                                visibility: wgpu::ShaderStages::FRAGMENT,
                                ty: wgpu::BindingType::Sampler(
                                    wgpu::SamplerBindingType::Filtering,
                                ),
                                count: None,
                            },
                            wgpu::BindGroupLayoutEntry {
                                binding: 2,
                                visibility: wgpu::ShaderStages::VERTEX,
                                ty: wgpu::BindingType::Buffer {
                                    ty: wgpu::BufferBindingType::Uniform,
                                    has_dynamic_offset: false,
                                    min_binding_size: None,
                                },
                                count: None,
                            },
                        ],
                    });

                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("Blit Pipeline Layout"),
                        bind_group_layouts: &[&bind_group_layout],
                        immediate_size: 0,
                    });

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Blit Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &blit_shader,
                        entry_point: Some("vs_main"),
                        buffers: &[],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &blit_shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                });

                let crop_ubo = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Crop Uniform"),
                    size: std::mem::size_of::<CropUniform>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                let bind_group = Self::create_blit_bind_group(
                    &device,
                    &bind_group_layout,
                    &canvas_view,
                    &sampler,
                    &crop_ubo,
                );

                Some(Present {
                    surface,
                    config,
                    pipeline,
                    bind_group_layout,
                    bind_group,
                    crop_ubo,
                })
            }
            _ => None,
        };

        log::info!(
            "Hardware renderer initialized: {}x{} padded to {}x{}",
            options.width,
            options.height,
            padded_width,
            padded_height
        );

        Ok(Self {
            device,
            queue,
            yuv_pipeline,
            yuv_bind_group_layout,
            yuv_bind_group,
            plane_textures,
            sampler,
            position_buffer,
            texcoord_buffers,
            canvas,
            canvas_view,
            present,
            planes,
            desc,
            padded_width,
            padded_height,
        })
    }

    /// Padded dimensions of the output canvas.
    pub fn padded_size(&self) -> (u32, u32) {
        (self.padded_width, self.padded_height)
    }

    /// Reconfigure the window surface after a resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(present) = &mut self.present {
            present.config.width = width.max(1);
            present.config.height = height.max(1);
            present.surface.configure(&self.device, &present.config);
            log::debug!("Surface resized to {}x{}", width, height);
        }
    }

    fn create_canvas(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let canvas = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = canvas.create_view(&wgpu::TextureViewDescriptor::default());
        (canvas, view)
    }

    fn create_plane_textures(device: &wgpu::Device, planes: &PlaneBuffers) -> [wgpu::Texture; 3] {
        let (y_width, y_height) = planes.y_size();
        let (uv_width, uv_height) = planes.uv_size();
        [
            ("Y Texture", y_width, y_height),
            ("U Texture", uv_width, uv_height),
            ("V Texture", uv_width, uv_height),
        ]
        .map(|(label, width, height)| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })
    }

    fn create_yuv_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        textures: &[wgpu::Texture; 3],
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let views =
            textures.each_ref().map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()));
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("YUV Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&views[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&views[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&views[2]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_blit_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        canvas_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        crop_ubo: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(canvas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: crop_ubo.as_entire_binding(),
                },
            ],
        })
    }

    /// Recreate every size-dependent resource. Only called when the padded
    /// dimensions or the chroma mode actually changed.
    fn reallocate(&mut self, padded_width: u32, padded_height: u32, chroma: Chroma) {
        log::debug!(
            "Reallocating plane buffers: {}x{} ({:?})",
            padded_width,
            padded_height,
            chroma
        );
        self.planes = PlaneBuffers::new(padded_width, padded_height, chroma);
        self.padded_width = padded_width;
        self.padded_height = padded_height;

        self.plane_textures = Self::create_plane_textures(&self.device, &self.planes);
        self.yuv_bind_group = Self::create_yuv_bind_group(
            &self.device,
            &self.yuv_bind_group_layout,
            &self.plane_textures,
            &self.sampler,
        );

        let (canvas, canvas_view) = Self::create_canvas(&self.device, padded_width, padded_height);
        self.canvas = canvas;
        self.canvas_view = canvas_view;

        if let Some(present) = &mut self.present {
            present.bind_group = Self::create_blit_bind_group(
                &self.device,
                &present.bind_group_layout,
                &self.canvas_view,
                &self.sampler,
                &present.crop_ubo,
            );
        }
    }

    /// Replace the full image of each plane texture with the staged bytes.
    fn upload_planes(&self) {
        let (y_width, y_height) = self.planes.y_size();
        let (uv_width, uv_height) = self.planes.uv_size();
        let uploads: [(&wgpu::Texture, &[u8], u32, u32); 3] = [
            (&self.plane_textures[0], &self.planes.y, y_width, y_height),
            (&self.plane_textures[1], &self.planes.u, uv_width, uv_height),
            (&self.plane_textures[2], &self.planes.v, uv_width, uv_height),
        ];
        for (texture, data, width, height) in uploads {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width),
                    rows_per_image: None,
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    /// Composite into the canvas, then blit to the window if one is attached.
    fn draw(&self) -> Result<(), RendererError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.canvas_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_viewport(
                0.0,
                0.0,
                self.padded_width as f32,
                self.padded_height as f32,
                0.0,
                1.0,
            );
            pass.set_pipeline(&self.yuv_pipeline);
            pass.set_bind_group(0, &self.yuv_bind_group, &[]);
            pass.set_vertex_buffer(0, self.position_buffer.slice(..));
            pass.set_vertex_buffer(1, self.texcoord_buffers[0].slice(..));
            pass.set_vertex_buffer(2, self.texcoord_buffers[1].slice(..));
            pass.set_vertex_buffer(3, self.texcoord_buffers[2].slice(..));
            pass.draw(0..4, 0..1);
        }

        let output = if let Some(present) = &self.present {
            let crop = CropUniform {
                scale: [
                    self.desc.width as f32 / self.padded_width as f32,
                    self.desc.height as f32 / self.padded_height as f32,
                ],
                _pad: [0.0; 2],
            };
            self.queue
                .write_buffer(&present.crop_ubo, 0, bytemuck::bytes_of(&crop));

            let output = present.surface.get_current_texture().map_err(|e| {
                RendererError::RenderError(format!("Failed to get surface texture: {}", e))
            })?;
            let view = output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());

            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Present Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });

                // Fit the frame into the window, letterboxing the remainder
                let surface_w = present.config.width as f32;
                let surface_h = present.config.height as f32;
                let frame_aspect = self.desc.width as f32 / self.desc.height.max(1) as f32;
                let surface_aspect = surface_w / surface_h;

                let (vp_x, vp_y, vp_w, vp_h) = if frame_aspect > surface_aspect {
                    let h = surface_w / frame_aspect;
                    (0.0, (surface_h - h) / 2.0, surface_w, h)
                } else {
                    let w = surface_h * frame_aspect;
                    ((surface_w - w) / 2.0, 0.0, w, surface_h)
                };

                pass.set_viewport(vp_x, vp_y, vp_w, vp_h, 0.0, 1.0);
                pass.set_pipeline(&present.pipeline);
                pass.set_bind_group(0, &present.bind_group, &[]);
                pass.draw(0..6, 0..1);
            }

            Some(output)
        } else {
            None
        };

        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(output) = output {
            output.present();
        }
        Ok(())
    }

    /// Copy the canvas back to the CPU as tightly packed RGBA rows.
    pub fn read_rgba(&self) -> Result<Vec<u8>, RendererError> {
        let width = self.padded_width;
        let height = self.padded_height;
        let bytes_per_row = width * 4;
        let padded_bytes_per_row = bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Canvas Readback Buffer"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.canvas,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RendererError::RenderError(format!("Device poll failed: {}", e)))?;
        match rx.recv() {
            Ok(Ok(())) => {}
            _ => return Err(RendererError::RenderError("Readback mapping failed".to_string())),
        }

        let mapped = slice.get_mapped_range();
        let mut pixels = vec![0u8; bytes_per_row as usize * height as usize];
        for row in 0..height as usize {
            let src = row * padded_bytes_per_row as usize;
            let dst = row * bytes_per_row as usize;
            pixels[dst..dst + bytes_per_row as usize]
                .copy_from_slice(&mapped[src..src + bytes_per_row as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }
}

fn plane_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl FrameSink for HardwareRenderer {
    fn submit(&mut self, width: u32, height: u32, data: &[u8]) -> Result<(), RendererError> {
        if data.is_empty() {
            // A missing frame is a no-op, not an error
            return Ok(());
        }
        let desc = FrameDesc::infer(width, height, data.len())?;
        let (padded_width, padded_height) = desc.padded();
        if (padded_width, padded_height) != (self.padded_width, self.padded_height)
            || desc.chroma != self.desc.chroma
        {
            self.reallocate(padded_width, padded_height, desc.chroma);
        }
        self.desc = desc;

        self.planes.pack(&desc, data);
        self.upload_planes();
        self.draw()
    }
}

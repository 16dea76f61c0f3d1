//! wgpu renderer for comparator scenes.
//!
//! Every quad is drawn with one pipeline: a texture sample multiplied by a
//! per-vertex color. Image quads sample their layer texture with a white
//! tint, solid quads sample a 1x1 white texture with their fill color.

use crate::dom::Rect;
use crate::image_loader::DecodedImage;
use crate::layer::{Fill, Scene};
use anyhow::{Context as _, Result};
use log::{debug, info};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.08,
    b: 0.08,
    a: 1.0,
};
const WHITE: [f32; 4] = [1.0; 4];
const VERTICES_PER_QUAD: usize = 6;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles covering `rect` (logical pixels) in normalized device
/// coordinates of a `viewport` sized surface.
pub fn quad_vertices(
    rect: &Rect,
    color: [f32; 4],
    viewport: PhysicalSize<u32>,
    scale_factor: f64,
) -> [Vertex; VERTICES_PER_QUAD] {
    let width = viewport.width.max(1) as f64;
    let height = viewport.height.max(1) as f64;
    let ndc_x = |x: f64| (x * scale_factor / width * 2.0 - 1.0) as f32;
    let ndc_y = |y: f64| (1.0 - y * scale_factor / height * 2.0) as f32;

    let (left, right) = (ndc_x(rect.x), ndc_x(rect.right()));
    let (top, bottom) = (ndc_y(rect.y), ndc_y(rect.bottom()));
    let vertex = |x, y, u, v| Vertex {
        position: [x, y],
        uv: [u, v],
        color,
    };
    let top_left = vertex(left, top, 0.0, 0.0);
    let top_right = vertex(right, top, 1.0, 0.0);
    let bottom_left = vertex(left, bottom, 0.0, 1.0);
    let bottom_right = vertex(right, bottom, 1.0, 1.0);
    [
        top_left,
        bottom_left,
        top_right,
        top_right,
        bottom_left,
        bottom_right,
    ]
}

pub fn scene_vertices(
    scene: &Scene,
    viewport: PhysicalSize<u32>,
    scale_factor: f64,
) -> Vec<Vertex> {
    scene
        .quads
        .iter()
        .flat_map(|quad| {
            let color = match quad.fill {
                Fill::Image(_) => WHITE,
                Fill::Solid(color) => color,
            };
            quad_vertices(&quad.rect, color, viewport, scale_factor)
        })
        .collect()
}

/// Physical-pixel scissor `(x, y, width, height)` for the clip rect, clamped
/// to the surface. `None` when nothing of the clip is visible.
pub fn scissor_rect(
    clip: &Rect,
    viewport: PhysicalSize<u32>,
    scale_factor: f64,
) -> Option<(u32, u32, u32, u32)> {
    let x0 = (clip.x * scale_factor).floor().max(0.0);
    let y0 = (clip.y * scale_factor).floor().max(0.0);
    let x1 = (clip.right() * scale_factor).ceil().min(viewport.width as f64);
    let y1 = (clip.bottom() * scale_factor).ceil().min(viewport.height as f64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    layers: Vec<wgpu::BindGroup>,
    solid: wgpu::BindGroup,
}

impl Renderer {
    pub async fn new(window: &Window) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // SAFETY: the window is owned by the event loop closure, which also
        // owns the renderer, so it outlives the surface.
        let surface = unsafe { instance.create_surface(window) }
            .context("Failed to create rendering surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible GPU adapter found")?;
        info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("comparator_device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .context("Failed to create GPU device")?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .context("Surface reports no supported formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("layer_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("layer_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/layer.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("layer_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("layer_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let solid = create_texture_bind_group(
            &device,
            &queue,
            &bind_group_layout,
            &sampler,
            &DecodedImage {
                width: 1,
                height: 1,
                pixels: vec![255; 4],
                broken: false,
            },
            "solid_texture",
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline,
            bind_group_layout,
            sampler,
            layers: Vec::new(),
            solid,
        })
    }

    /// Replaces the layer textures; slot `i` is `images[i]`.
    pub fn upload_images(&mut self, images: &[DecodedImage]) {
        let layers = images
            .iter()
            .enumerate()
            .map(|(slot, image)| {
                debug!("Uploading layer {} ({}x{})", slot, image.width, image.height);
                create_texture_bind_group(
                    &self.device,
                    &self.queue,
                    &self.bind_group_layout,
                    &self.sampler,
                    image,
                    "layer_texture",
                )
            })
            .collect();
        self.layers = layers;
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn render(&mut self, scene: &Scene, scale_factor: f64) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let vertices = scene_vertices(scene, self.size, scale_factor);
        let vertex_buffer = (!vertices.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("scene_vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        let scissor = scissor_rect(&scene.clip, self.size, scale_factor);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            if let (Some(buffer), Some((x, y, width, height))) = (&vertex_buffer, scissor) {
                pass.set_pipeline(&self.pipeline);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.set_scissor_rect(x, y, width, height);
                for (index, quad) in scene.quads.iter().enumerate() {
                    let bind_group = match quad.fill {
                        Fill::Image(slot) => self.layers.get(slot).unwrap_or(&self.solid),
                        Fill::Solid(_) => &self.solid,
                    };
                    pass.set_bind_group(0, bind_group, &[]);
                    let first = (index * VERTICES_PER_QUAD) as u32;
                    pass.draw(first..first + VERTICES_PER_QUAD as u32, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    image: &DecodedImage,
    label: &str,
) -> wgpu::BindGroup {
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

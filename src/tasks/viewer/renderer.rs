use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbaImage;
use image::imageops::FilterType;
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::RenderError;
use super::slider::SliderPass;
use super::text::TextOverlay;
use crate::config::Configuration;
use crate::grain::{GRAIN_SHADER, GrainUniforms};
use crate::layout::{ScreenLayout, UvRect, cover_uv};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

impl Vertex {
    fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRS,
        }
    }
}

const QUAD: [Vertex; 4] = [
    //   NDC pos         UV
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    }, // bottom-left
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    }, // bottom-right
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    }, // top-left
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    }, // top-right
];

struct Tex {
    view: wgpu::TextureView,
    w: u32,
    h: u32,
}

/// Grain pipeline plus the image it samples. Without an image there is no
/// bind group and nothing is drawn.
struct GrainPass {
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    vbuf: wgpu::Buffer,
    sampler: wgpu::Sampler,
    uniforms: wgpu::Buffer,
    cover: wgpu::Buffer,
    image: Option<(Tex, wgpu::BindGroup)>,
}

pub(super) struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    background: wgpu::Color,
    grain: GrainPass,
    slider: SliderPass,
    text: Option<TextOverlay>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, cfg: &Configuration) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;

        // grain math runs on encoded values, like the CPU path, so skip sRGB conversion
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| !fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let PhysicalSize { width, height } = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(?format, width = config.width, height = config.height, "surface configured");

        let grain = GrainPass::new(&device, format);
        let slider = SliderPass::new(&device, format, &cfg.slider);
        let text = TextOverlay::new(&device, format, cfg.title(), cfg.subtitle());

        Ok(Self {
            surface,
            device,
            queue,
            config,
            background: cfg.background.to_wgpu(),
            grain,
            slider,
            text,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn has_image(&self) -> bool {
        self.grain.image.is_some()
    }

    pub fn set_image(&mut self, image: &RgbaImage) {
        let max_dim = self.device.limits().max_texture_dimension_2d;
        let fitted = fit_within(image, max_dim);
        let image = fitted.as_ref().unwrap_or(image);
        let (w, h) = image.dimensions();
        let tex = upload_texture(&self.device, &self.queue, image.as_raw(), w, h);
        let bind_group = self.grain.bind_group(&self.device, &tex);
        self.grain.image = Some((tex, bind_group));
        debug!(w, h, "image texture uploaded");
    }

    /// Draw one frame. Only the background is cleared until an image exists.
    pub fn render(
        &mut self,
        layout: &ScreenLayout,
        uniforms: &GrainUniforms,
        fraction: f32,
    ) -> Result<(), RenderError> {
        let frame = self
            .surface
            .get_current_texture()
            .map_err(RenderError::Surface)?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });

        let showing = self.grain.image.is_some();
        if let Some((tex, _)) = &self.grain.image {
            let cover = cover_uv(tex.w, tex.h, layout.canvas.width, layout.canvas.height);
            self.queue
                .write_buffer(&self.grain.uniforms, 0, bytemuck::bytes_of(uniforms));
            self.queue
                .write_buffer(&self.grain.cover, 0, bytemuck::bytes_of(&cover));
            self.slider.prepare(&self.device, layout, fraction);
        }

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("viewer-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some((_, bind_group)) = &self.grain.image {
                let canvas = layout.canvas;
                rpass.set_viewport(canvas.x, canvas.y, canvas.width, canvas.height, 0.0, 1.0);
                rpass.set_pipeline(&self.grain.pipeline);
                rpass.set_bind_group(0, bind_group, &[]);
                rpass.set_vertex_buffer(0, self.grain.vbuf.slice(..));
                rpass.draw(0..4, 0..1);

                let [w, h] = layout.viewport;
                rpass.set_viewport(0.0, 0.0, w, h, 0.0, 1.0);
                self.slider.draw(&mut rpass);
            }
        }

        let mut glyph_result = Ok(());
        if showing && let Some(text) = self.text.as_mut() {
            let anchors = layout.text_anchors(text.title_px(), text.subtitle_px());
            text.queue(&anchors, layout.viewport);
            glyph_result = text.draw(
                &self.device,
                &mut encoder,
                &view,
                self.config.width,
                self.config.height,
            );
            text.finish();
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        if let Some(text) = self.text.as_mut() {
            text.recall();
        }
        glyph_result.map_err(RenderError::Glyph)
    }
}

impl GrainPass {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("grain-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grain-uniforms"),
            size: std::mem::size_of::<GrainUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let cover = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grain-cover"),
            contents: bytemuck::bytes_of(&UvRect::IDENTITY),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grain-quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grain-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(GRAIN_SHADER)),
        });

        let uniform_entry = |binding, visibility| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grain-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry(2, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grain-pipeline-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("grain-pipeline"),
            layout: Some(&pip_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_layout,
            vbuf,
            sampler,
            uniforms,
            cover,
            image: None,
        }
    }

    fn bind_group(&self, device: &wgpu::Device, tex: &Tex) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grain-bind-group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&tex.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.cover.as_entire_binding(),
                },
            ],
        })
    }
}

/// Downscale so neither side exceeds `max_dim`; `None` if it already fits.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn fit_within(image: &RgbaImage, max_dim: u32) -> Option<RgbaImage> {
    let (w, h) = image.dimensions();
    if w <= max_dim && h <= max_dim {
        return None;
    }
    let scale = max_dim as f32 / w.max(h) as f32;
    let nw = ((w as f32 * scale).round() as u32).clamp(1, max_dim);
    let nh = ((h as f32 * scale).round() as u32).clamp(1, max_dim);
    info!(from = ?(w, h), to = ?(nw, nh), "downscaling image to GPU limits");
    Some(image::imageops::resize(image, nw, nh, FilterType::Triangle))
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &[u8],
    w: u32,
    h: u32,
) -> Tex {
    let size = wgpu::Extent3d {
        width: w,
        height: h,
        depth_or_array_layers: 1,
    };
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("image"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        tex.as_image_copy(),
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * w),
            rows_per_image: Some(h),
        },
        size,
    );
    Tex {
        view: tex.create_view(&wgpu::TextureViewDescriptor::default()),
        w,
        h,
    }
}

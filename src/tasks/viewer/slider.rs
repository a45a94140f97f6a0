use std::borrow::Cow;

use lyon::math::{Box2D, point};
use lyon::path::builder::BorderRadii;
use lyon::path::{Path as LyonPath, Winding};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, TessellationError, VertexBuffers,
};
use tracing::warn;
use wgpu::util::DeviceExt;

use crate::config::SliderOptions;
use crate::layout::ScreenLayout;

const SLIDER_SHADER: &str = r#"
struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> VertexOut {
    var out: VertexOut;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs(in: VertexOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SliderVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl SliderVertex {
    fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRS: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SliderVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SliderColors {
    pub minimum_track: [f32; 4],
    pub maximum_track: [f32; 4],
    pub thumb: [f32; 4],
}

impl From<&SliderOptions> for SliderColors {
    fn from(opts: &SliderOptions) -> Self {
        Self {
            minimum_track: opts.minimum_track_color.rgba(),
            maximum_track: opts.maximum_track_color.rgba(),
            thumb: opts.thumb_color.rgba(),
        }
    }
}

/// Track left of the thumb, track right of the thumb, then the thumb on top.
/// Positions are in clip space.
pub fn tessellate(
    layout: &ScreenLayout,
    fraction: f32,
    colors: &SliderColors,
) -> Result<VertexBuffers<SliderVertex, u16>, TessellationError> {
    let mut buffers: VertexBuffers<SliderVertex, u16> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    let viewport = layout.viewport;
    let track = layout.track;
    let radius = track.height * 0.5;
    let [thumb_x, thumb_y] = layout.thumb_center(fraction);

    if thumb_x > track.x {
        let rect = Box2D::new(point(track.x, track.y), point(thumb_x, track.bottom()));
        let path = rounded_rect(&rect, radius);
        fill(&mut tessellator, &mut buffers, &path, colors.minimum_track, viewport)?;
    }
    if thumb_x < track.right() {
        let rect = Box2D::new(point(thumb_x, track.y), point(track.right(), track.bottom()));
        let path = rounded_rect(&rect, radius);
        fill(&mut tessellator, &mut buffers, &path, colors.maximum_track, viewport)?;
    }

    let mut builder = LyonPath::builder();
    builder.add_circle(point(thumb_x, thumb_y), layout.thumb_radius, Winding::Positive);
    let thumb = builder.build();
    fill(&mut tessellator, &mut buffers, &thumb, colors.thumb, viewport)?;

    Ok(buffers)
}

fn rounded_rect(rect: &Box2D, radius: f32) -> LyonPath {
    let mut builder = LyonPath::builder();
    builder.add_rounded_rectangle(rect, &BorderRadii::new(radius.max(0.0)), Winding::Positive);
    builder.build()
}

fn fill(
    tessellator: &mut FillTessellator,
    buffers: &mut VertexBuffers<SliderVertex, u16>,
    path: &LyonPath,
    color: [f32; 4],
    viewport: [f32; 2],
) -> Result<(), TessellationError> {
    tessellator.tessellate_path(
        path,
        &FillOptions::default(),
        &mut BuffersBuilder::new(buffers, |vertex: FillVertex| SliderVertex {
            position: to_clip(vertex.position().to_array(), viewport),
            color,
        }),
    )
}

fn to_clip(position: [f32; 2], viewport: [f32; 2]) -> [f32; 2] {
    let x = (position[0] / viewport[0]) * 2.0 - 1.0;
    let y = 1.0 - (position[1] / viewport[1]) * 2.0;
    [x, y]
}

struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// GPU side of the slider; the mesh is rebuilt for every frame it is drawn.
pub struct SliderPass {
    pipeline: wgpu::RenderPipeline,
    colors: SliderColors,
    mesh: Option<Mesh>,
}

impl SliderPass {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, opts: &SliderOptions) -> Self {
        Self {
            pipeline: create_pipeline(device, format),
            colors: SliderColors::from(opts),
            mesh: None,
        }
    }

    pub fn prepare(&mut self, device: &wgpu::Device, layout: &ScreenLayout, fraction: f32) {
        self.mesh = None;
        let buffers = match tessellate(layout, fraction, &self.colors) {
            Ok(buffers) => buffers,
            Err(err) => {
                warn!(error = ?err, "slider tessellation failed");
                return;
            }
        };
        if buffers.vertices.is_empty() || buffers.indices.is_empty() {
            return;
        }
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("slider-vertices"),
            contents: bytemuck::cast_slice(&buffers.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("slider-indices"),
            contents: bytemuck::cast_slice(&buffers.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.mesh = Some(Mesh {
            vertex_buffer,
            index_buffer,
            index_count: buffers.indices.len() as u32,
        });
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(mesh) = &self.mesh else { return };
        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}

fn create_pipeline(device: &wgpu::Device, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("slider-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SLIDER_SHADER)),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("slider-layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("slider"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs"),
            buffers: &[SliderVertex::layout()],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    })
}

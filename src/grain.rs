//! Grain pixel function.
//!
//! The same algorithm exists twice: [`evaluate`] runs on the CPU (snapshot
//! mode and tests) and [`GRAIN_SHADER`] runs as the wgpu fragment kernel.
//! Both hash the normalized pixel coordinate with the sin/fract transform
//! and scale the sampled RGB by `1 + (noise - 0.5) * coefficient`.
//!
//! The `time` uniform is carried through to the GPU but never read: the
//! grain pattern is a function of the pixel coordinate only.

use image::RgbaImage;

/// Dot-product weights of the coordinate hash.
pub const HASH_WEIGHTS: [f32; 2] = [12.9898, 78.233];
/// Multiplier applied to the sine before taking the fractional part.
pub const HASH_SCALE: f32 = 43758.5453;
/// Pre-scale applied to `uv` before hashing.
pub const GRAIN_UV_SCALE: f32 = 1.0;

/// WGSL rendition of [`evaluate`]. Entry points `vs_main` / `fs_main`.
///
/// Bindings: 0 = image texture, 1 = sampler, 2 = [`GrainUniforms`],
/// 3 = cover-fit mapping (`crate::layout::UvRect`).
pub const GRAIN_SHADER: &str = r#"
struct Uniforms {
    time: f32,
    coefficient: f32,
    resolution: vec2<f32>,
};

struct Cover {
    scale: vec2<f32>,
    offset: vec2<f32>,
};

@group(0) @binding(0) var image_tex: texture_2d<f32>;
@group(0) @binding(1) var image_sampler: sampler;
@group(0) @binding(2) var<uniform> uniforms: Uniforms;
@group(0) @binding(3) var<uniform> cover: Cover;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) xy: vec2<f32>,
};

@vertex
fn vs_main(@location(0) pos: vec2<f32>, @location(1) uv: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.position = vec4<f32>(pos, 0.0, 1.0);
    out.xy = uv * uniforms.resolution;
    return out;
}

// unguarded: fract of a tiny negative product may round up to 1.0 here
fn random(co: vec2<f32>) -> f32 {
    return fract(sin(dot(co, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

fn grain(uv: vec2<f32>) -> f32 {
    return random(uv * 1.0);
}

fn sample_image(xy: vec2<f32>) -> vec4<f32> {
    let uv = xy / uniforms.resolution;
    return textureSample(image_tex, image_sampler, uv * cover.scale + cover.offset);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let uv = in.xy / uniforms.resolution;
    let noise = grain(uv);
    let base = sample_image(in.xy);
    return vec4<f32>(base.rgb * (1.0 + ((noise - 0.5) * uniforms.coefficient)), base.a);
}
"#;

/// Canvas size in pixels. Both components are finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    width: f32,
    height: f32,
}

impl Resolution {
    pub fn new(width: f32, height: f32) -> Option<Self> {
        let valid = width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0;
        valid.then_some(Self { width, height })
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn from_pixels(width: u32, height: u32) -> Option<Self> {
        Self::new(width as f32, height as f32)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

/// Per-draw constants, laid out to match the WGSL `Uniforms` struct (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GrainUniforms {
    time: f32,
    coefficient: f32,
    resolution: [f32; 2],
}

impl GrainUniforms {
    pub fn new(resolution: Resolution, coefficient: f32) -> Self {
        Self {
            time: 0.0,
            coefficient,
            resolution: [resolution.width, resolution.height],
        }
    }

    pub fn with_time(mut self, seconds: f32) -> Self {
        self.time = seconds;
        self
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    pub fn resolution(&self) -> [f32; 2] {
        self.resolution
    }
}

/// Source of base colors, addressed in unnormalized canvas pixels.
pub trait ImageSampler {
    fn sample(&self, xy: [f32; 2]) -> [f32; 4];
}

impl<F> ImageSampler for F
where
    F: Fn([f32; 2]) -> [f32; 4],
{
    fn sample(&self, xy: [f32; 2]) -> [f32; 4] {
        self(xy)
    }
}

/// Nearest-pixel sampler over an RGBA8 buffer. Out-of-range coordinates
/// clamp to the edge.
pub struct RgbaSampler<'a> {
    image: &'a RgbaImage,
}

impl<'a> RgbaSampler<'a> {
    pub fn new(image: &'a RgbaImage) -> Self {
        Self { image }
    }
}

impl ImageSampler for RgbaSampler<'_> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample(&self, xy: [f32; 2]) -> [f32; 4] {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return [0.0; 4];
        }
        let x = (xy[0].floor().max(0.0) as u32).min(w - 1);
        let y = (xy[1].floor().max(0.0) as u32).min(h - 1);
        let px = self.image.get_pixel(x, y).0;
        px.map(|c| f32::from(c) / 255.0)
    }
}

/// GLSL `fract`: `x - floor(x)`, kept strictly below one.
fn fract(x: f32) -> f32 {
    let f = x - x.floor();
    if f < 1.0 { f } else { 0.0 }
}

/// Deterministic pseudo-random value in `[0, 1)` for a 2D coordinate.
pub fn random(co: [f32; 2]) -> f32 {
    let d = co[0] * HASH_WEIGHTS[0] + co[1] * HASH_WEIGHTS[1];
    fract(d.sin() * HASH_SCALE)
}

/// Grain value for a normalized coordinate.
pub fn grain(uv: [f32; 2]) -> f32 {
    random([uv[0] * GRAIN_UV_SCALE, uv[1] * GRAIN_UV_SCALE])
}

/// Multiplier applied to the RGB channels at `xy`. Lies in
/// `[1 - coefficient / 2, 1 + coefficient / 2]`.
pub fn noise_factor(xy: [f32; 2], uniforms: &GrainUniforms) -> f32 {
    let [w, h] = uniforms.resolution;
    let noise = grain([xy[0] / w, xy[1] / h]);
    1.0 + (noise - 0.5) * uniforms.coefficient
}

/// Shade one pixel. RGB is not clamped; alpha passes through untouched.
pub fn evaluate<S>(xy: [f32; 2], uniforms: &GrainUniforms, image: &S) -> [f32; 4]
where
    S: ImageSampler + ?Sized,
{
    let factor = noise_factor(xy, uniforms);
    let base = image.sample(xy);
    [base[0] * factor, base[1] * factor, base[2] * factor, base[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms(coefficient: f32) -> GrainUniforms {
        GrainUniforms::new(Resolution::new(100.0, 100.0).unwrap(), coefficient)
    }

    #[test]
    fn fract_never_negative() {
        assert!((fract(-0.25) - 0.75).abs() < 1e-6);
        assert_eq!(fract(3.0), 0.0);
        assert_eq!(fract(-1e-9), 0.0);
    }

    #[test]
    fn random_stays_in_unit_interval() {
        for y in 0..64 {
            for x in 0..64 {
                let v = random([x as f32 / 64.0, y as f32 / 64.0]);
                assert!((0.0..1.0).contains(&v), "{v} out of range at {x},{y}");
            }
        }
    }

    #[test]
    fn random_is_not_constant() {
        let a = random([0.1, 0.2]);
        let b = random([0.3, 0.7]);
        assert_ne!(a, b);
    }

    #[test]
    fn zero_coefficient_is_identity() {
        let u = uniforms(0.0);
        let color = [0.8, 0.2, 0.4, 0.6];
        let out = evaluate([12.5, 77.5], &u, &|_: [f32; 2]| color);
        assert_eq!(out, color);
    }

    #[test]
    fn reference_pixel_matches_formula() {
        let u = uniforms(0.5);
        let sample = [0.8, 0.2, 0.4, 1.0];
        let out = evaluate([50.0, 50.0], &u, &|_: [f32; 2]| sample);
        let noise = random([0.5, 0.5]);
        let factor = 1.0 + (noise - 0.5) * 0.5;
        for c in 0..3 {
            assert!((out[c] - sample[c] * factor).abs() < 1e-6);
        }
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn sampler_receives_unnormalized_coordinate() {
        let u = uniforms(1.0);
        let seen = std::cell::Cell::new([0.0f32; 2]);
        let _ = evaluate([42.5, 7.5], &u, &|xy: [f32; 2]| {
            seen.set(xy);
            [0.0, 0.0, 0.0, 1.0]
        });
        assert_eq!(seen.get(), [42.5, 7.5]);
    }

    #[test]
    fn rgba_sampler_clamps_to_edges() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 255, 128]));
        let sampler = RgbaSampler::new(&img);
        assert_eq!(sampler.sample([-3.0, 0.5]), [1.0, 0.0, 0.0, 1.0]);
        let right = sampler.sample([9.0, 9.0]);
        assert_eq!(right[2], 1.0);
        assert!((right[3] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<GrainUniforms>(), 16);
        let u = uniforms(0.3).with_time(2.0);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&u));
        assert_eq!(floats, &[2.0, 0.3, 100.0, 100.0]);
    }

    fn validate_shader(source: &str) {
        let module = match naga::front::wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => panic!("grain shader parse failed: {}", e.emit_to_string(source)),
        };
        if let Err(e) = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        {
            panic!("grain shader validation failed: {e:?}");
        }
    }

    #[test]
    fn shader_validates() {
        validate_shader(GRAIN_SHADER);
    }

    #[test]
    fn shader_hash_constants_match_cpu() {
        for (literal, value) in [
            ("12.9898", HASH_WEIGHTS[0]),
            ("78.233", HASH_WEIGHTS[1]),
            ("43758.5453", HASH_SCALE),
        ] {
            assert!(GRAIN_SHADER.contains(literal), "{literal} missing from shader");
            assert_eq!(literal.parse::<f32>().unwrap(), value);
        }
        assert!(GRAIN_SHADER.contains("dot(co, vec2<f32>(12.9898, 78.233))) * 43758.5453"));
        assert!(GRAIN_SHADER.contains("random(uv * 1.0)"));
        assert_eq!(GRAIN_UV_SCALE, 1.0);
    }

    #[test]
    fn shader_applies_the_same_factor() {
        assert!(GRAIN_SHADER.contains("let uv = in.xy / uniforms.resolution;"));
        assert!(
            GRAIN_SHADER
                .contains("base.rgb * (1.0 + ((noise - 0.5) * uniforms.coefficient)), base.a")
        );
    }

    #[test]
    fn resolution_rejects_degenerate_sizes() {
        assert!(Resolution::new(0.0, 10.0).is_none());
        assert!(Resolution::new(10.0, -1.0).is_none());
        assert!(Resolution::new(f32::NAN, 10.0).is_none());
        assert!(Resolution::from_pixels(1, 1).is_some());
    }
}

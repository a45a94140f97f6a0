//! Headless rendition of the canvas: cover-fit the image into a square and
//! shade every pixel on the CPU.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use rayon::prelude::{IndexedParallelIterator, ParallelIterator, ParallelSliceMut};
use tracing::info;

use crate::grain::{self, GrainUniforms, Resolution, RgbaSampler};

/// Resize-to-fill `source` into a `side` x `side` canvas and apply the grain.
pub fn render_snapshot(source: &RgbaImage, side: u32, coefficient: f32) -> Result<RgbaImage> {
    ensure!(side > 0, "snapshot size must be non-zero");
    ensure!(
        source.width() > 0 && source.height() > 0,
        "source image is empty"
    );
    let resolution = Resolution::from_pixels(side, side).context("invalid snapshot size")?;
    let canvas = DynamicImage::ImageRgba8(source.clone())
        .resize_to_fill(side, side, FilterType::Triangle)
        .to_rgba8();
    let uniforms = GrainUniforms::new(resolution, coefficient);
    Ok(apply_grain(&canvas, &uniforms))
}

/// Shade every pixel of `canvas` at its pixel center. Rows run in parallel;
/// the 8-bit conversion is where out-of-range channels get clamped.
#[allow(clippy::cast_precision_loss)]
pub fn apply_grain(canvas: &RgbaImage, uniforms: &GrainUniforms) -> RgbaImage {
    let (width, height) = canvas.dimensions();
    let mut out = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }
    let sampler = RgbaSampler::new(canvas);
    let row_len = width as usize * 4;
    let pixels: &mut [u8] = &mut out;
    pixels
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let xy = [x as f32 + 0.5, y as f32 + 0.5];
                let shaded = grain::evaluate(xy, uniforms, &sampler);
                for (dst, v) in px.iter_mut().zip(shaded) {
                    *dst = to_u8(v);
                }
            }
        });
    out
}

pub fn write_snapshot(
    source: &RgbaImage,
    side: u32,
    coefficient: f32,
    out: &Path,
) -> Result<()> {
    let rendered = render_snapshot(source, side, coefficient)?;
    rendered
        .save(out)
        .with_context(|| format!("failed to write snapshot to {}", out.display()))?;
    info!(path = %out.display(), side, coefficient, "snapshot written");
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

use image::RgbaImage;

use crate::config::ImageSource;

/// A decoded image ready for GPU upload or CPU shading.
#[derive(Debug)]
pub struct PreparedImage {
    pub source: ImageSource,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, no padding.
    pub pixels: Vec<u8>,
}

impl PreparedImage {
    pub fn from_rgba(source: ImageSource, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            source,
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn into_rgba(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels)
    }
}

/// Loader -> viewer.
#[derive(Debug)]
pub enum ImageEvent {
    Loaded(PreparedImage),
    Failed { source: ImageSource, reason: String },
}

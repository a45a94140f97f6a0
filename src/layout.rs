//! Screen geometry in physical pixels, origin top-left.
//!
//! The canvas is a square stacked above the slider, the pair centered in the
//! window. Text floats over the middle of the window, nudged upwards.

use crate::config::SliderOptions;
use crate::grain::Resolution;

const TRACK_THICKNESS_PX: f32 = 4.0;
const THUMB_RADIUS_PX: f32 = 10.0;
const TEXT_OFFSET_Y_PX: f32 = -25.0;
const TEXT_GAP_PX: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPx {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectPx {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> [f32; 2] {
        [self.x + self.width * 0.5, self.y + self.height * 0.5]
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// Affine map from canvas UV to texture UV: `uv * scale + offset`.
/// Laid out to match the WGSL `Cover` uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UvRect {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}

impl UvRect {
    pub const IDENTITY: Self = Self {
        scale: [1.0, 1.0],
        offset: [0.0, 0.0],
    };

    pub fn map(&self, uv: [f32; 2]) -> [f32; 2] {
        [
            uv[0] * self.scale[0] + self.offset[0],
            uv[1] * self.scale[1] + self.offset[1],
        ]
    }
}

/// Cover fit: the image fills the canvas, keeps its aspect ratio and is
/// cropped symmetrically along the overflowing axis.
#[allow(clippy::cast_precision_loss)]
pub fn cover_uv(image_w: u32, image_h: u32, canvas_w: f32, canvas_h: f32) -> UvRect {
    let iw = image_w as f32;
    let ih = image_h as f32;
    if iw <= 0.0 || ih <= 0.0 || canvas_w <= 0.0 || canvas_h <= 0.0 {
        return UvRect::IDENTITY;
    }
    let k = (canvas_w / iw).max(canvas_h / ih);
    let sx = canvas_w / (iw * k);
    let sy = canvas_h / (ih * k);
    UvRect {
        scale: [sx, sy],
        offset: [(1.0 - sx) * 0.5, (1.0 - sy) * 0.5],
    }
}

/// Top-left anchors of the two overlay lines (centered horizontally).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAnchors {
    pub title: [f32; 2],
    pub subtitle: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenLayout {
    pub viewport: [f32; 2],
    pub canvas: RectPx,
    /// Touch area of the slider; the thumb center travels its full width.
    pub slider: RectPx,
    /// Visible bar, vertically centered in `slider`.
    pub track: RectPx,
    pub thumb_radius: f32,
}

impl ScreenLayout {
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(width: u32, height: u32, slider: &SliderOptions) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let below_canvas = slider.margin_top_px + slider.height_px;
        // landscape windows shrink the canvas so the slider stays on screen
        let side = w.min(h - below_canvas).max(1.0).floor();
        let top = ((h - side - below_canvas) * 0.5).max(0.0).floor();
        let canvas = RectPx {
            x: ((w - side) * 0.5).floor(),
            y: top,
            width: side,
            height: side,
        };

        let slider_w = w * slider.width_fraction.clamp(0.0, 1.0);
        let slider_rect = RectPx {
            x: (w - slider_w) * 0.5,
            y: canvas.bottom() + slider.margin_top_px,
            width: slider_w,
            height: slider.height_px,
        };
        let thickness = TRACK_THICKNESS_PX.min(slider.height_px);
        let track = RectPx {
            x: slider_rect.x,
            y: slider_rect.center()[1] - thickness * 0.5,
            width: slider_w,
            height: thickness,
        };

        Self {
            viewport: [w, h],
            canvas,
            slider: slider_rect,
            track,
            thumb_radius: THUMB_RADIUS_PX.min(slider.height_px * 0.5),
        }
    }

    pub fn canvas_resolution(&self) -> Option<Resolution> {
        Resolution::new(self.canvas.width, self.canvas.height)
    }

    pub fn thumb_center(&self, fraction: f32) -> [f32; 2] {
        let f = fraction.clamp(0.0, 1.0);
        [
            self.track.x + f * self.track.width,
            self.slider.center()[1],
        ]
    }

    /// Track fraction under a horizontal cursor position.
    pub fn slider_fraction_at(&self, x: f32) -> f32 {
        if self.track.width <= 0.0 {
            return 0.0;
        }
        ((x - self.track.x) / self.track.width).clamp(0.0, 1.0)
    }

    /// Whether a press at `(x, y)` grabs the slider. The thumb may overhang
    /// the track ends, so the hit area is widened by its radius.
    pub fn hits_slider(&self, x: f32, y: f32) -> bool {
        let r = self.thumb_radius;
        let area = RectPx {
            x: self.slider.x - r,
            y: self.slider.y,
            width: self.slider.width + 2.0 * r,
            height: self.slider.height,
        };
        area.contains(x, y)
    }

    pub fn text_anchors(&self, title_px: f32, subtitle_px: f32) -> TextAnchors {
        let [w, h] = self.viewport;
        let block = title_px + TEXT_GAP_PX + subtitle_px;
        let top = (h - block) * 0.5 + TEXT_OFFSET_Y_PX;
        TextAnchors {
            title: [w * 0.5, top],
            subtitle: [w * 0.5, top + title_px + TEXT_GAP_PX],
        }
    }
}

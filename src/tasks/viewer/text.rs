use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use tracing::{debug, warn};
use wgpu_glyph::ab_glyph::{FontArc, FontVec};
use wgpu_glyph::{
    FontId, GlyphBrush, GlyphBrushBuilder, HorizontalAlign, Layout, Section, Text, VerticalAlign,
};

use crate::config::TextStyle;
use crate::layout::TextAnchors;

struct Line {
    style: TextStyle,
    font_id: FontId,
}

/// Title and subtitle drawn over the window center.
pub struct TextOverlay {
    glyph_brush: GlyphBrush<()>,
    staging_belt: wgpu::util::StagingBelt,
    title: Line,
    subtitle: Line,
}

impl TextOverlay {
    /// Returns `None` when no usable font exists on this system.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        title: TextStyle,
        subtitle: TextStyle,
    ) -> Option<Self> {
        let mut db = Database::new();
        db.load_system_fonts();

        let title_font = resolve_font(&db, title.font.as_deref(), title.bold);
        let subtitle_font = resolve_font(&db, subtitle.font.as_deref(), subtitle.bold);
        let Some(primary) = title_font.clone().or_else(|| subtitle_font.clone()) else {
            warn!(faces = db.len(), "no usable font found; text overlay disabled");
            return None;
        };

        let mut builder = GlyphBrushBuilder::using_font(primary);
        let subtitle_id = match (title_font, subtitle_font) {
            (Some(_), Some(font)) => builder.add_font(font),
            _ => FontId(0),
        };

        Some(Self {
            glyph_brush: builder.build(device, format),
            staging_belt: wgpu::util::StagingBelt::new(1024),
            title: Line {
                style: title,
                font_id: FontId(0),
            },
            subtitle: Line {
                style: subtitle,
                font_id: subtitle_id,
            },
        })
    }

    pub fn title_px(&self) -> f32 {
        self.title.style.size_px
    }

    pub fn subtitle_px(&self) -> f32 {
        self.subtitle.style.size_px
    }

    pub fn queue(&mut self, anchors: &TextAnchors, viewport: [f32; 2]) {
        let layout = Layout::default_single_line()
            .h_align(HorizontalAlign::Center)
            .v_align(VerticalAlign::Top);
        for (line, anchor) in [
            (&self.title, anchors.title),
            (&self.subtitle, anchors.subtitle),
        ] {
            if line.style.text.is_empty() {
                continue;
            }
            self.glyph_brush.queue(Section {
                screen_position: (anchor[0], anchor[1]),
                bounds: (viewport[0], viewport[1]),
                text: vec![
                    Text::new(&line.style.text)
                        .with_scale(line.style.size_px)
                        .with_color(line.style.color.rgba())
                        .with_font_id(line.font_id),
                ],
                layout,
            });
        }
    }

    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) -> Result<(), String> {
        self.glyph_brush.draw_queued(
            device,
            &mut self.staging_belt,
            encoder,
            target,
            width,
            height,
        )
    }

    /// Call before submitting the encoder that `draw` recorded into.
    pub fn finish(&mut self) {
        self.staging_belt.finish();
    }

    /// Call after the frame was submitted.
    pub fn recall(&mut self) {
        self.staging_belt.recall();
    }
}

fn resolve_font(db: &Database, family: Option<&str>, bold: bool) -> Option<FontArc> {
    let mut families = Vec::with_capacity(2);
    if let Some(name) = family {
        families.push(Family::Name(name));
    }
    families.push(Family::SansSerif);
    let query = Query {
        families: &families,
        weight: if bold { Weight::BOLD } else { Weight::NORMAL },
        stretch: Stretch::Normal,
        style: Style::Normal,
    };
    let face_id = db.query(&query).or_else(|| {
        debug!(requested = ?family, "font family not found; using first available face");
        db.faces().next().map(|face| face.id)
    })?;
    db.with_face_data(face_id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index)
            .ok()
            .map(FontArc::new)
    })?
}

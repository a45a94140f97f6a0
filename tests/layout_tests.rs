use rust_grain_frame::config::SliderOptions;
use rust_grain_frame::layout::{RectPx, ScreenLayout, cover_uv};

fn rect_close(a: RectPx, b: (f32, f32, f32, f32), eps: f32) {
    assert!((a.x - b.0).abs() <= eps, "x mismatch: {:?} vs {:?}", a, b);
    assert!((a.y - b.1).abs() <= eps, "y mismatch: {:?} vs {:?}", a, b);
    assert!((a.width - b.2).abs() <= eps, "w mismatch: {:?} vs {:?}", a, b);
    assert!((a.height - b.3).abs() <= eps, "h mismatch: {:?} vs {:?}", a, b);
}

fn portrait() -> ScreenLayout {
    ScreenLayout::compute(400, 600, &SliderOptions::default())
}

#[test]
fn portrait_canvas_spans_the_width() {
    let layout = portrait();
    // stack = 400 canvas + 20 margin + 40 slider, centered in 600
    rect_close(layout.canvas, (0.0, 70.0, 400.0, 400.0), 0.001);
    rect_close(layout.slider, (40.0, 490.0, 320.0, 40.0), 0.001);
    rect_close(layout.track, (40.0, 508.0, 320.0, 4.0), 0.001);
    assert!((layout.thumb_radius - 10.0).abs() < f32::EPSILON);
}

#[test]
fn landscape_canvas_leaves_room_for_the_slider() {
    let layout = ScreenLayout::compute(1000, 500, &SliderOptions::default());
    rect_close(layout.canvas, (280.0, 0.0, 440.0, 440.0), 0.001);
    assert!(layout.slider.bottom() <= 500.0);
}

#[test]
fn degenerate_window_keeps_a_pixel() {
    let layout = ScreenLayout::compute(10, 10, &SliderOptions::default());
    assert!(layout.canvas.width >= 1.0);
    assert!(layout.canvas_resolution().is_some());
}

#[test]
fn canvas_resolution_matches_canvas() {
    let res = portrait().canvas_resolution().unwrap();
    assert_eq!((res.width(), res.height()), (400.0, 400.0));
}

#[test]
fn thumb_tracks_fraction() {
    let layout = portrait();
    assert_eq!(layout.thumb_center(0.0), [40.0, 510.0]);
    assert_eq!(layout.thumb_center(1.0), [360.0, 510.0]);
    assert_eq!(layout.thumb_center(2.0), [360.0, 510.0]);
    assert_eq!(layout.thumb_center(0.5)[0], 200.0);
}

#[test]
fn cursor_maps_to_fraction() {
    let layout = portrait();
    assert!((layout.slider_fraction_at(200.0) - 0.5).abs() < 1e-6);
    assert_eq!(layout.slider_fraction_at(0.0), 0.0);
    assert_eq!(layout.slider_fraction_at(999.0), 1.0);
}

#[test]
fn slider_hit_area_includes_thumb_overhang() {
    let layout = portrait();
    assert!(layout.hits_slider(200.0, 510.0));
    assert!(layout.hits_slider(35.0, 510.0));
    assert!(!layout.hits_slider(25.0, 510.0));
    assert!(!layout.hits_slider(200.0, 485.0));
    assert!(!layout.hits_slider(200.0, 300.0));
}

#[test]
fn text_block_sits_above_center() {
    let anchors = portrait().text_anchors(36.0, 18.0);
    assert_eq!(anchors.title, [200.0, 245.5]);
    assert_eq!(anchors.subtitle, [200.0, 286.5]);
}

#[test]
fn cover_crops_wide_images_horizontally() {
    let uv = cover_uv(200, 100, 100.0, 100.0);
    assert_eq!(uv.scale, [0.5, 1.0]);
    assert_eq!(uv.offset, [0.25, 0.0]);
    assert_eq!(uv.map([0.0, 0.0]), [0.25, 0.0]);
    assert_eq!(uv.map([1.0, 1.0]), [0.75, 1.0]);
}

#[test]
fn cover_crops_tall_images_vertically() {
    let uv = cover_uv(100, 400, 100.0, 100.0);
    assert_eq!(uv.scale, [1.0, 0.25]);
    assert_eq!(uv.offset, [0.0, 0.375]);
}

#[test]
fn cover_matching_aspect_is_identity() {
    let uv = cover_uv(1600, 1600, 400.0, 400.0);
    assert_eq!(uv.scale, [1.0, 1.0]);
    assert_eq!(uv.offset, [0.0, 0.0]);
}

#[test]
fn slider_stays_inside_the_window() {
    for (w, h) in [(600, 600), (1920, 1080), (400, 600), (800, 300), (300, 2000)] {
        let layout = ScreenLayout::compute(w, h, &SliderOptions::default());
        assert!(layout.slider.bottom() <= h as f32, "{w}x{h}: {:?}", layout.slider);
        assert!(layout.canvas.width <= w as f32, "{w}x{h}: {:?}", layout.canvas);
        assert_eq!(layout.canvas.width, layout.canvas.height);
    }
    // square window: the slider stack comes out of the height
    let square = ScreenLayout::compute(600, 600, &SliderOptions::default());
    rect_close(square.canvas, (30.0, 0.0, 540.0, 540.0), 0.001);
}

use std::path::PathBuf;
use std::time::Duration;

use rust_grain_frame::coefficient::Coefficient;
use rust_grain_frame::config::{Color, Configuration, ImageSource};

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let cfg = cfg.validated().unwrap();
    assert!(matches!(cfg.image_source, ImageSource::Url(ref url) if url.starts_with("https://")));
    assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
    assert!((cfg.coefficient.default - 0.3).abs() < f32::EPSILON);
    assert!((cfg.coefficient.step - 0.05).abs() < f32::EPSILON);
    assert_eq!(cfg.background, Color::BLACK);
    assert_eq!(cfg.title().text, "Rust Shaders");
    assert!(cfg.title().bold);
    assert_eq!(cfg.subtitle().text, "Shaders are remarkably underused");
    assert!((cfg.subtitle().size_px - 18.0).abs() < f32::EPSILON);
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r##"
image-source: "./photos/dunes.jpg"
fetch-timeout: 5s
background: "#202020"
coefficient:
  default: 0.5
  step: 0.1
title:
  text: "Grain"
  size-px: 48
subtitle:
  font: "DejaVu Sans"
slider:
  width-fraction: 0.5
  thumb-color: "#ff0000"
window:
  fullscreen: true
"##;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(
        cfg.image_source,
        ImageSource::Path(PathBuf::from("./photos/dunes.jpg"))
    );
    assert_eq!(cfg.fetch_timeout, Duration::from_secs(5));
    assert!((cfg.background.rgba()[0] - 32.0 / 255.0).abs() < 1e-6);
    assert!((cfg.coefficient.default - 0.5).abs() < f32::EPSILON);
    assert!((cfg.coefficient.max - 1.0).abs() < f32::EPSILON);

    let title = cfg.title();
    assert_eq!(title.text, "Grain");
    assert!((title.size_px - 48.0).abs() < f32::EPSILON);
    assert!(title.bold, "unset fields keep the line default");

    assert_eq!(cfg.subtitle().font.as_deref(), Some("DejaVu Sans"));
    assert!((cfg.slider.width_fraction - 0.5).abs() < f32::EPSILON);
    assert_eq!(cfg.slider.thumb_color.rgba(), [1.0, 0.0, 0.0, 1.0]);
    assert!(cfg.window.fullscreen);
    assert_eq!(cfg.window.width, 800);
}

#[test]
fn url_sources_are_detected() {
    let cfg: Configuration =
        serde_yaml::from_str("image-source: http://example.com/a.png").unwrap();
    assert_eq!(
        cfg.image_source,
        ImageSource::Url("http://example.com/a.png".into())
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let err = serde_yaml::from_str::<Configuration>("grain-size: 3").unwrap_err();
    assert!(err.to_string().contains("grain-size"), "{err}");
}

#[test]
fn bad_color_is_rejected() {
    assert!(serde_yaml::from_str::<Configuration>("background: \"#12\"").is_err());
}

#[test]
fn empty_image_source_is_rejected() {
    assert!(serde_yaml::from_str::<Configuration>("image-source: \"\"").is_err());
}

#[test]
fn inverted_coefficient_range_fails_validation() {
    let yaml = r#"
coefficient:
  min: 0.8
  max: 0.2
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn default_outside_range_fails_validation() {
    let yaml = r#"
coefficient:
  default: 1.5
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn zero_step_fails_validation() {
    let yaml = r#"
coefficient:
  step: 0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn zero_timeout_fails_validation() {
    let cfg: Configuration = serde_yaml::from_str("fetch-timeout: 0s").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn slider_width_fraction_must_be_positive() {
    let yaml = r#"
slider:
  width-fraction: 0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn negative_text_size_fails_validation() {
    let yaml = r#"
subtitle:
  size-px: -4
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.yaml");
    std::fs::write(&path, "coefficient:\n  default: 0.75\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path)
        .unwrap()
        .validated()
        .unwrap();
    let coefficient = Coefficient::new(&cfg.coefficient);
    assert!((coefficient.value() - 0.75).abs() < 1e-5);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Configuration::from_yaml_file(dir.path().join("nope.yaml")).is_err());
}

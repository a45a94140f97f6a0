use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::de::{self, Deserializer};
use serde::Deserialize;

const DEFAULT_IMAGE_URL: &str = "https://images.unsplash.com/photo-1669780080335-0d16efe84b6d?q=80&w=2970&auto=format&fit=crop&ixlib=rb-4.0.3&ixid=M3wxMjA3fDB8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8fA%3D%3D";
const DEFAULT_TITLE: &str = "Rust Shaders";
const DEFAULT_SUBTITLE: &str = "Shaders are remarkably underused";

/// Where the displayed image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Path(PathBuf),
}

impl ImageSource {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }
}

impl Default for ImageSource {
    fn default() -> Self {
        Self::Url(DEFAULT_IMAGE_URL.to_string())
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for ImageSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl<'de> Deserialize<'de> for ImageSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(de::Error::custom("image-source must not be empty"));
        }
        Ok(Self::parse(&raw))
    }
}

/// RGBA color parsed from `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);

    pub fn rgba(&self) -> [f32; 4] {
        self.0
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.0;
        wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        }
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_color(s)
            .map(Self)
            .with_context(|| format!("invalid color {s:?}"))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_hex_color(&raw)
            .map(Self)
            .ok_or_else(|| de::Error::custom(format!("invalid color {raw:?}")))
    }
}

fn parse_hex_color(value: &str) -> Option<[f32; 4]> {
    let hex = value.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| f32::from(v) / 255.0);
    let doubled = |i: usize| channel(&hex[i..=i].repeat(2));
    match hex.len() {
        3 => Some([doubled(0)?, doubled(1)?, doubled(2)?, 1.0]),
        4 => Some([doubled(0)?, doubled(1)?, doubled(2)?, doubled(3)?]),
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 1.0]),
        8 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ]),
        _ => None,
    }
}

/// Range and resolution of the noise coefficient slider.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CoefficientOptions {
    #[serde(default = "CoefficientOptions::default_value")]
    pub default: f32,
    #[serde(default = "CoefficientOptions::default_min")]
    pub min: f32,
    #[serde(default = "CoefficientOptions::default_max")]
    pub max: f32,
    #[serde(default = "CoefficientOptions::default_step")]
    pub step: f32,
}

impl CoefficientOptions {
    const fn default_value() -> f32 {
        0.3
    }

    const fn default_min() -> f32 {
        0.0
    }

    const fn default_max() -> f32 {
        1.0
    }

    const fn default_step() -> f32 {
        0.05
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.min.is_finite() && self.max.is_finite() && self.default.is_finite(),
            "coefficient bounds must be finite"
        );
        ensure!(self.min < self.max, "coefficient.min must be below coefficient.max");
        ensure!(
            self.step > 0.0 && self.step <= self.max - self.min,
            "coefficient.step must be positive and no larger than the range"
        );
        ensure!(
            (self.min..=self.max).contains(&self.default),
            "coefficient.default must lie within [min, max]"
        );
        Ok(())
    }
}

impl Default for CoefficientOptions {
    fn default() -> Self {
        Self {
            default: Self::default_value(),
            min: Self::default_min(),
            max: Self::default_max(),
            step: Self::default_step(),
        }
    }
}

/// Overrides for one overlay line. Unset fields fall back to the line's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TextOptions {
    pub text: Option<String>,
    pub font: Option<String>,
    pub size_px: Option<f32>,
    pub color: Option<Color>,
    pub bold: Option<bool>,
}

impl TextOptions {
    fn resolve(&self, fallback: TextStyle) -> TextStyle {
        TextStyle {
            text: self.text.clone().unwrap_or(fallback.text),
            font: self.font.clone().or(fallback.font),
            size_px: self.size_px.unwrap_or(fallback.size_px),
            color: self.color.unwrap_or(fallback.color),
            bold: self.bold.unwrap_or(fallback.bold),
        }
    }
}

/// Fully resolved overlay line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub text: String,
    pub font: Option<String>,
    pub size_px: f32,
    pub color: Color,
    pub bold: bool,
}

impl TextStyle {
    fn default_title() -> Self {
        Self {
            text: DEFAULT_TITLE.to_string(),
            font: None,
            size_px: 36.0,
            color: Color::WHITE,
            bold: true,
        }
    }

    fn default_subtitle() -> Self {
        Self {
            text: DEFAULT_SUBTITLE.to_string(),
            font: None,
            size_px: 18.0,
            color: Color::WHITE,
            bold: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SliderOptions {
    /// Track width relative to the window width.
    #[serde(default = "SliderOptions::default_width_fraction")]
    pub width_fraction: f32,
    /// Gap between the canvas and the slider.
    #[serde(default = "SliderOptions::default_margin_top_px")]
    pub margin_top_px: f32,
    /// Height of the slider's touch area.
    #[serde(default = "SliderOptions::default_height_px")]
    pub height_px: f32,
    #[serde(default = "SliderOptions::default_minimum_track_color")]
    pub minimum_track_color: Color,
    #[serde(default = "SliderOptions::default_maximum_track_color")]
    pub maximum_track_color: Color,
    #[serde(default = "SliderOptions::default_thumb_color")]
    pub thumb_color: Color,
}

impl SliderOptions {
    const fn default_width_fraction() -> f32 {
        0.8
    }

    const fn default_margin_top_px() -> f32 {
        20.0
    }

    const fn default_height_px() -> f32 {
        40.0
    }

    const fn default_minimum_track_color() -> Color {
        Color::WHITE
    }

    const fn default_maximum_track_color() -> Color {
        Color::BLACK
    }

    const fn default_thumb_color() -> Color {
        Color::WHITE
    }
}

impl Default for SliderOptions {
    fn default() -> Self {
        Self {
            width_fraction: Self::default_width_fraction(),
            margin_top_px: Self::default_margin_top_px(),
            height_px: Self::default_height_px(),
            minimum_track_color: Self::default_minimum_track_color(),
            maximum_track_color: Self::default_maximum_track_color(),
            thumb_color: Self::default_thumb_color(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WindowOptions {
    #[serde(default = "WindowOptions::default_title")]
    pub title: String,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default = "WindowOptions::default_size")]
    pub width: u32,
    #[serde(default = "WindowOptions::default_size")]
    pub height: u32,
}

impl WindowOptions {
    fn default_title() -> String {
        "grain frame".to_string()
    }

    const fn default_size() -> u32 {
        800
    }
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            fullscreen: false,
            width: Self::default_size(),
            height: Self::default_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Configuration {
    /// Image rendered through the grain shader (URL or local path).
    pub image_source: ImageSource,
    /// Upper bound on fetching the image.
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
    /// Slider range, step and starting value.
    pub coefficient: CoefficientOptions,
    /// Window clear color.
    pub background: Color,
    pub title: TextOptions,
    pub subtitle: TextOptions,
    pub slider: SliderOptions,
    pub window: WindowOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.coefficient.validate()?;
        ensure!(
            self.fetch_timeout > Duration::ZERO,
            "fetch-timeout must be positive"
        );
        ensure!(
            self.slider.width_fraction > 0.0 && self.slider.width_fraction <= 1.0,
            "slider.width-fraction must be in (0, 1]"
        );
        ensure!(
            self.slider.height_px > 0.0 && self.slider.margin_top_px >= 0.0,
            "slider.height-px must be positive and slider.margin-top-px non-negative"
        );
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window size must be non-zero"
        );
        for (name, style) in [("title", self.title()), ("subtitle", self.subtitle())] {
            ensure!(
                style.size_px.is_finite() && style.size_px > 0.0,
                "{name}.size-px must be positive"
            );
        }
        Ok(self)
    }

    pub fn title(&self) -> TextStyle {
        self.title.resolve(TextStyle::default_title())
    }

    pub fn subtitle(&self) -> TextStyle {
        self.subtitle.resolve(TextStyle::default_subtitle())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            image_source: ImageSource::default(),
            fetch_timeout: Duration::from_secs(30),
            coefficient: CoefficientOptions::default(),
            background: Color::BLACK,
            title: TextOptions::default(),
            subtitle: TextOptions::default(),
            slider: SliderOptions::default(),
            window: WindowOptions::default(),
        }
    }
}

//! Option records accepted by `add_*` requests and the configs they resolve to.
//!
//! Every option record comes in two forms:
//!
//! - A **partial** record (`*Options`) where each field is optional. Callers
//!   pass these, defaults are expressed with them, and they are combined with
//!   [`merge`](crate::merge).
//! - A **resolved** config (`*Config`) with every field filled in, built once
//!   per operation and captured by the task that draws it.
//!
//! Partials serialize to camelCase JSON and omit unset fields:
//!
//! ```json
//! {
//!   "color": { "value": "rgb(76,175,80)", "width": 220, "height": 100 },
//!   "pattern": { "url": "lamp.jpg", "repeat": true, "opacity": 0.5 },
//!   "image": { "url": "scream.jpg", "x": 80, "y": 80, "opacity": 0.7 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{impl_merge, Switch};
use crate::surface::{FontDescriptor, Rect, RepeatMode, TextAlign};

/// Default canvas width in pixels.
pub const DEFAULT_CANVAS_WIDTH: u32 = 400;
/// Default canvas height in pixels.
pub const DEFAULT_CANVAS_HEIGHT: u32 = 300;

const DEFAULT_OPACITY: f32 = 1.0;
const DEFAULT_FONT: &str = "sans-serif";
const DEFAULT_FONT_SIZE: f32 = 12.0;
const DEFAULT_ALIGN: &str = "start";
const DEFAULT_TEXT_COLOR: &str = "rgba(0, 0, 0, 1)";

// ============================================================================
// Canvas
// ============================================================================

/// Size of a canvas created by
/// [`Infographic::create_canvas`](crate::Infographic::create_canvas).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasOptions {
    /// Width in pixels. Zero or unset uses the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels. Zero or unset uses the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl_merge!(CanvasOptions { width, height });

impl CanvasOptions {
    /// Creates canvas options with an explicit size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    /// The built-in 400×300 canvas.
    pub fn builtin() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }

    /// Returns a copy with zero dimensions unset, so they fall through when
    /// merged over another layer.
    pub fn without_zeros(&self) -> Self {
        Self {
            width: self.width.filter(|v| *v > 0),
            height: self.height.filter(|v| *v > 0),
        }
    }

    /// Resolves the size; zero counts as unset.
    pub fn resolve(&self) -> (u32, u32) {
        let pick = |value: Option<u32>, fallback| value.filter(|v| *v > 0).unwrap_or(fallback);
        (
            pick(self.width, DEFAULT_CANVAS_WIDTH),
            pick(self.height, DEFAULT_CANVAS_HEIGHT),
        )
    }
}

// ============================================================================
// Background
// ============================================================================

/// A solid background colour fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct ColorOptions {
    /// CSS colour, or `false` for no fill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Switch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

impl_merge!(ColorOptions { value, opacity, x, y, width, height });

impl ColorOptions {
    /// Built-in defaults: no colour, fully opaque, empty rectangle.
    pub fn builtin() -> Self {
        Self {
            value: Some(Switch::OFF),
            opacity: Some(DEFAULT_OPACITY),
            x: Some(0.0),
            y: Some(0.0),
            width: Some(0.0),
            height: Some(0.0),
        }
    }

    /// Resolves to a fill config, or `None` if no colour was requested.
    pub fn resolve(&self) -> Option<ColorFillConfig> {
        let value = self.value.as_ref()?.as_text()?.into_owned();
        Some(ColorFillConfig {
            value,
            opacity: self.opacity.unwrap_or(DEFAULT_OPACITY),
            rect: rect_of(self.x, self.y, self.width, self.height),
        })
    }
}

/// A background image, optionally clipped from its source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct BackgroundImageOptions {
    /// Image locator, or `false` for no image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Switch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_y: Option<f32>,
    /// Source width; zero uses the image's intrinsic width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_width: Option<f32>,
    /// Source height; zero uses the image's intrinsic height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Destination width; zero uses the image's intrinsic width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// Destination height; zero uses the image's intrinsic height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

impl_merge!(BackgroundImageOptions {
    url,
    opacity,
    clip_x,
    clip_y,
    clip_width,
    clip_height,
    x,
    y,
    width,
    height,
});

impl BackgroundImageOptions {
    /// Built-in defaults: no image, fully opaque, intrinsic sizes.
    pub fn builtin() -> Self {
        Self {
            url: Some(Switch::OFF),
            opacity: Some(DEFAULT_OPACITY),
            clip_x: Some(0.0),
            clip_y: Some(0.0),
            clip_width: Some(0.0),
            clip_height: Some(0.0),
            x: Some(0.0),
            y: Some(0.0),
            width: Some(0.0),
            height: Some(0.0),
        }
    }

    /// Resolves to a draw config, or `None` if no image was requested.
    pub fn resolve(&self) -> Option<ImageDrawConfig> {
        let url = self.url.as_ref()?.as_text()?.into_owned();
        Some(ImageDrawConfig {
            url,
            opacity: self.opacity.unwrap_or(DEFAULT_OPACITY),
            clip: rect_of(self.clip_x, self.clip_y, self.clip_width, self.clip_height),
            placement: rect_of(self.x, self.y, self.width, self.height),
        })
    }
}

/// A tiled image fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct PatternOptions {
    /// Image locator, or `false` for no pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Switch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// `false`, `"x"`, `"y"`, `"repeat"` or `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Switch>,
}

impl_merge!(PatternOptions { url, opacity, x, y, width, height, repeat });

impl PatternOptions {
    /// Built-in defaults: no pattern, fully opaque, painted once.
    pub fn builtin() -> Self {
        Self {
            url: Some(Switch::OFF),
            opacity: Some(DEFAULT_OPACITY),
            x: Some(0.0),
            y: Some(0.0),
            width: Some(0.0),
            height: Some(0.0),
            repeat: Some(Switch::OFF),
        }
    }

    /// Resolves to a fill config, or `None` if no pattern was requested.
    pub fn resolve(&self) -> Option<PatternFillConfig> {
        let url = self.url.as_ref()?.as_text()?.into_owned();
        Some(PatternFillConfig {
            url,
            opacity: self.opacity.unwrap_or(DEFAULT_OPACITY),
            rect: rect_of(self.x, self.y, self.width, self.height),
            repeat: self
                .repeat
                .as_ref()
                .map(RepeatMode::from_switch)
                .unwrap_or_default(),
        })
    }
}

/// A background request: up to one colour fill, one pattern and one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct BackgroundOptions {
    pub color: ColorOptions,
    pub image: BackgroundImageOptions,
    pub pattern: PatternOptions,
}

impl_merge!(BackgroundOptions { color, image, pattern });

impl BackgroundOptions {
    /// Built-in defaults for every sub-feature.
    pub fn builtin() -> Self {
        Self {
            color: ColorOptions::builtin(),
            image: BackgroundImageOptions::builtin(),
            pattern: PatternOptions::builtin(),
        }
    }

    /// Defaults derived from the surface: colour and pattern fills cover
    /// the whole surface unless told otherwise.
    pub fn structural(width: u32, height: u32) -> Self {
        let (width, height) = (Some(width as f32), Some(height as f32));
        Self {
            color: ColorOptions {
                width,
                height,
                ..ColorOptions::default()
            },
            pattern: PatternOptions {
                width,
                height,
                ..PatternOptions::default()
            },
            ..Self::default()
        }
    }
}

// ============================================================================
// Foreground Image
// ============================================================================

/// A foreground image drawn whole at a position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptions {
    /// Image locator. Required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Switch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Destination width; unset or zero uses the intrinsic width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// Destination height; unset or zero uses the intrinsic height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

impl_merge!(ImageOptions { url, x, y, width, height });

impl ImageOptions {
    /// Creates options for an image at the given position.
    pub fn new(url: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            url: Some(Switch::text(url)),
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Built-in defaults: positioned at the origin.
    pub fn builtin() -> Self {
        Self {
            x: Some(0.0),
            y: Some(0.0),
            ..Self::default()
        }
    }

    /// Resolves to a draw config, or `None` if the URL is missing.
    pub fn resolve(&self) -> Option<ImageDrawConfig> {
        let url = self.url.as_ref()?.as_text()?.into_owned();
        Some(ImageDrawConfig {
            url,
            opacity: DEFAULT_OPACITY,
            clip: Rect::default(),
            placement: rect_of(self.x, self.y, self.width, self.height),
        })
    }
}

// ============================================================================
// Text
// ============================================================================

/// A line of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct TextOptions {
    /// The text to draw. Required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Switch>,
    /// Font family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// `bold`, `italic`, `bold italic`, or empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Size in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    /// `start`, `end`, `left`, `center` or `right`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// CSS colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

impl_merge!(TextOptions {
    text,
    font,
    style,
    size,
    align,
    x,
    y,
    color,
    opacity,
});

impl TextOptions {
    /// Creates options for a line of text at the given position.
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: Some(Switch::text(text)),
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Built-in defaults: 12pt sans-serif, start aligned, opaque black.
    pub fn builtin() -> Self {
        Self {
            text: Some(Switch::OFF),
            font: Some(DEFAULT_FONT.to_string()),
            style: Some(String::new()),
            size: Some(DEFAULT_FONT_SIZE),
            align: Some(DEFAULT_ALIGN.to_string()),
            x: Some(0.0),
            y: Some(0.0),
            color: Some(DEFAULT_TEXT_COLOR.to_string()),
            opacity: Some(DEFAULT_OPACITY),
        }
    }

    /// Resolves to a text config, or `None` if the text is missing.
    pub fn resolve(&self) -> Option<TextConfig> {
        let text = self.text.as_ref()?.as_text()?.into_owned();
        Some(TextConfig {
            text,
            font: FontDescriptor::new(
                self.style.clone().unwrap_or_default(),
                self.size.unwrap_or(DEFAULT_FONT_SIZE),
                self.font.clone().unwrap_or_else(|| DEFAULT_FONT.to_string()),
            ),
            align: TextAlign::from_keyword(self.align.as_deref().unwrap_or(DEFAULT_ALIGN)),
            x: self.x.unwrap_or(0.0),
            y: self.y.unwrap_or(0.0),
            color: self
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
            opacity: self.opacity.unwrap_or(DEFAULT_OPACITY),
        })
    }
}

// ============================================================================
// Resolved Configs
// ============================================================================

/// Resolved parameters of a colour fill.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFillConfig {
    pub value: String,
    pub opacity: f32,
    pub rect: Rect,
}

/// Resolved parameters of a pattern fill.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternFillConfig {
    pub url: String,
    pub opacity: f32,
    pub rect: Rect,
    pub repeat: RepeatMode,
}

/// Resolved parameters of an image draw.
///
/// Zero clip or placement dimensions stand for the loaded image's
/// intrinsic size. Foreground draws ignore `clip` and `opacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDrawConfig {
    pub url: String,
    pub opacity: f32,
    pub clip: Rect,
    pub placement: Rect,
}

/// Resolved parameters of a text draw.
#[derive(Debug, Clone, PartialEq)]
pub struct TextConfig {
    pub text: String,
    pub font: FontDescriptor,
    pub align: TextAlign,
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub opacity: f32,
}

fn rect_of(x: Option<f32>, y: Option<f32>, width: Option<f32>, height: Option<f32>) -> Rect {
    Rect::new(
        x.unwrap_or(0.0),
        y.unwrap_or(0.0),
        width.unwrap_or(0.0),
        height.unwrap_or(0.0),
    )
}

// ============================================================================
// Tests
// ============================================================================

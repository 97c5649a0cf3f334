//! Serializable default settings.
//!
//! A [`Defaults`] document holds the lowest configuration layer used when an
//! `add_*` request is resolved. It can be written to and read from JSON, so
//! a deployment can ship its house style (fonts, colours, canvas size) as a
//! file instead of code.
//!
//! # Example
//!
//! ```
//! use infograph_renderer::{Defaults, TextOptions};
//!
//! let defaults = Defaults::new().with_text(TextOptions {
//!     font: Some("Courier".into()),
//!     size: Some(20.0),
//!     ..Default::default()
//! });
//!
//! let json = defaults.to_json().unwrap();
//! let restored = Defaults::from_json(&json).unwrap();
//! assert_eq!(restored.text.font.as_deref(), Some("Courier"));
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{impl_merge, merge};
use crate::error::InfographResult;
use crate::options::{BackgroundOptions, CanvasOptions, ImageOptions, TextOptions};

// ============================================================================
// Defaults
// ============================================================================

/// Default option values for every kind of request.
///
/// Unset fields fall through to the built-in values, so a document only
/// needs to mention what it changes.
///
/// # JSON Format
///
/// ```json
/// {
///   "canvas": { "width": 800, "height": 600 },
///   "background": { "color": { "opacity": 0.8 } },
///   "text": { "font": "Courier", "color": "#333" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct Defaults {
    /// Canvas size used by `create_canvas`.
    pub canvas: CanvasOptions,

    /// Background colour, pattern and image defaults.
    pub background: BackgroundOptions,

    /// Foreground image defaults.
    pub image: ImageOptions,

    /// Text defaults.
    pub text: TextOptions,
}

impl_merge!(Defaults { canvas, background, image, text });

impl Defaults {
    /// Creates an empty document (everything falls through to built-ins).
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in defaults with every field set.
    pub fn builtin() -> Self {
        Self {
            canvas: CanvasOptions::builtin(),
            background: BackgroundOptions::builtin(),
            image: ImageOptions::builtin(),
            text: TextOptions::builtin(),
        }
    }

    /// Returns the built-in defaults overlaid with this document.
    pub fn over_builtin(&self) -> Self {
        merge(&[&Self::builtin(), self])
    }

    /// Sets canvas defaults.
    pub fn with_canvas(mut self, canvas: CanvasOptions) -> Self {
        self.canvas = canvas;
        self
    }

    /// Sets background defaults.
    pub fn with_background(mut self, background: BackgroundOptions) -> Self {
        self.background = background;
        self
    }

    /// Sets foreground image defaults.
    pub fn with_image(mut self, image: ImageOptions) -> Self {
        self.image = image;
        self
    }

    /// Sets text defaults.
    pub fn with_text(mut self, text: TextOptions) -> Self {
        self.text = text;
        self
    }

    /// Serializes the document to a JSON string.
    pub fn to_json(&self) -> InfographResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the document to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> InfographResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes a document from a JSON string.
    pub fn from_json(json: &str) -> InfographResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Scene documents: a whole infographic described as JSON.
//!
//! ```json
//! {
//!   "canvas": { "width": 640, "height": 480 },
//!   "defaults": { "text": { "font": "Courier" } },
//!   "operations": [
//!     { "type": "background", "color": { "value": "#336699" } },
//!     { "type": "image", "url": "scream.jpg", "x": 80, "y": 80 },
//!     { "type": "text", "text": "Hello", "x": 20, "y": 40 }
//!   ]
//! }
//! ```

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::InfographResult;
use crate::infographic::Infographic;
use crate::loader::SharedLoader;
use crate::options::{BackgroundOptions, CanvasOptions, ImageOptions, TextOptions};
use crate::profile::Defaults;
use crate::raster::RasterSurface;

/// One drawing request in a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    Background(BackgroundOptions),
    Image(ImageOptions),
    Text(TextOptions),
}

/// A canvas, its defaults, and the requests drawn onto it in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct Scene {
    pub canvas: CanvasOptions,
    pub defaults: Defaults,
    pub operations: Vec<Operation>,
}

impl Scene {
    /// Parses a scene from a JSON string.
    pub fn from_json(json: &str) -> InfographResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a scene file.
    pub fn from_path(path: impl AsRef<Path>) -> InfographResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes the scene to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> InfographResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Queues every operation on `infographic`, in order.
    ///
    /// Stops at the first request that fails validation; requests before it
    /// stay queued.
    pub fn apply(&self, infographic: &mut Infographic) -> InfographResult<()> {
        for operation in &self.operations {
            match operation {
                Operation::Background(options) => infographic.add_background(options)?,
                Operation::Image(options) => infographic.add_image(options)?,
                Operation::Text(options) => infographic.add_text(options)?,
            };
        }
        tracing::debug!(operations = self.operations.len(), "scene applied");
        Ok(())
    }

    /// Creates an infographic with this scene's defaults and canvas, and
    /// queues the operations on it.
    pub fn build(
        &self,
        loader: SharedLoader,
    ) -> InfographResult<(Infographic, Rc<RefCell<RasterSurface>>)> {
        let mut infographic = Infographic::with_defaults(loader, self.defaults.clone());
        let canvas = infographic.create_canvas(&self.canvas);
        self.apply(&mut infographic)?;
        Ok((infographic, canvas))
    }
}

//! infograph-renderer: queued drawing of layered infographics
//!
//! Backgrounds (colour, pattern, image), foreground images and text are
//! added to an [`Infographic`] and drawn strictly in the order they were
//! added. Requests that need an image hold the queue while it loads, so a
//! slow image never lets later layers paint underneath it.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use infograph_renderer::{
//!     BackgroundOptions, CanvasOptions, DeferredLoader, ImageOptions, Infographic,
//!     PatternOptions, QueueState, Switch, TextOptions,
//! };
//! use image::RgbaImage;
//!
//! let loader = Rc::new(DeferredLoader::new());
//! loader.insert("tile.png", RgbaImage::new(8, 8));
//! loader.insert("logo.png", RgbaImage::new(32, 32));
//!
//! let mut infographic = Infographic::new(loader.clone());
//! let canvas = infographic.create_canvas(&CanvasOptions::new(320, 200));
//!
//! infographic
//!     .add_background(&BackgroundOptions {
//!         pattern: PatternOptions {
//!             url: Some(Switch::text("tile.png")),
//!             repeat: Some(Switch::Flag(true)),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     })?
//!     .add_image(&ImageOptions::new("logo.png", 10.0, 10.0))?
//!     .add_text(&TextOptions::new("Quarterly numbers", 60.0, 30.0))?;
//!
//! // The pattern waits on its image, and everything else waits on the pattern.
//! assert_eq!(infographic.render(), QueueState::Paused);
//!
//! loader.run_until_idle();
//! assert_eq!(infographic.queue().state(), QueueState::Idle);
//!
//! let pixels = canvas.borrow().image().clone();
//! assert_eq!(pixels.dimensions(), (320, 200));
//! # Ok::<(), infograph_renderer::InfographError>(())
//! ```
//!
//! # Defaults
//!
//! House style can be shipped as JSON with [`Defaults`]:
//!
//! ```
//! use std::rc::Rc;
//! use infograph_renderer::{DeferredLoader, Defaults, Infographic};
//!
//! let defaults = Defaults::from_json(r#"{ "text": { "font": "Courier", "size": 18 } }"#)?;
//! let infographic = Infographic::with_defaults(Rc::new(DeferredLoader::new()), defaults);
//!
//! assert_eq!(infographic.defaults().text.size, Some(18.0));
//! # Ok::<(), infograph_renderer::InfographError>(())
//! ```

mod color;
mod config;
mod error;
mod infographic;
mod loader;
mod ops;
mod options;
mod profile;
mod queue;
mod raster;
mod scene;
mod surface;

pub use color::{fill_rgba, normalize_color, parse_css_color};
pub use config::{merge, Merge, Switch};
pub use error::{InfographError, InfographResult};
pub use infographic::Infographic;
pub use loader::{
    load_channel, DeferredLoader, ImageResource, LoadCompleter, LoadHandle, Loader, SharedLoader,
};
pub use ops::{color_fill, image_draw, image_geometry, pattern_fill, text_draw, ImageLayer};
pub use options::{
    BackgroundImageOptions, BackgroundOptions, CanvasOptions, ColorFillConfig, ColorOptions,
    ImageDrawConfig, ImageOptions, PatternFillConfig, PatternOptions, TextConfig, TextOptions,
    DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH,
};
pub use profile::Defaults;
pub use queue::{QueueState, ResumeToken, Task, TaskContext, TaskId, TaskQueue};
pub use raster::RasterSurface;
pub use scene::{Operation, Scene};
pub use surface::{
    with_saved_state, FillStyle, FontDescriptor, Pattern, Rect, RecordingSurface, RepeatMode,
    SharedSurface, Surface, SurfaceCall, TextAlign,
};

//! The public drawing facade.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::merge;
use crate::error::{InfographError, InfographResult};
use crate::loader::SharedLoader;
use crate::ops::{self, ImageLayer};
use crate::options::{BackgroundOptions, CanvasOptions, ImageOptions, TextOptions};
use crate::profile::Defaults;
use crate::queue::{QueueState, TaskQueue};
use crate::raster::RasterSurface;
use crate::surface::SharedSurface;

// ============================================================================
// Infographic
// ============================================================================

/// Builds an infographic by queueing drawing requests against a surface.
///
/// Requests are validated and resolved when they are added, then drawn in
/// the order they were added once [`render`](Self::render) drives the queue.
/// Requests that depend on an image hold the queue until the image loads;
/// everything added after them waits.
///
/// Each request is resolved from three layers, lowest first: the
/// [`Defaults`] (over the built-ins), values derived from the surface size,
/// and the caller's options.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use infograph_renderer::{
///     BackgroundOptions, CanvasOptions, ColorOptions, DeferredLoader, Infographic, QueueState,
///     Switch, TextOptions,
/// };
///
/// let loader = Rc::new(DeferredLoader::new());
/// let mut infographic = Infographic::new(loader.clone());
/// let canvas = infographic.create_canvas(&CanvasOptions::new(200, 100));
///
/// infographic
///     .add_background(&BackgroundOptions {
///         color: ColorOptions {
///             value: Some(Switch::text("#336699")),
///             ..Default::default()
///         },
///         ..Default::default()
///     })
///     .unwrap()
///     .add_text(&TextOptions::new("Hello", 10.0, 50.0))
///     .unwrap();
///
/// assert_eq!(infographic.render(), QueueState::Idle);
/// assert_eq!(canvas.borrow().image().get_pixel(0, 0).0, [0x33, 0x66, 0x99, 255]);
/// ```
pub struct Infographic {
    surface: Option<SharedSurface>,
    loader: SharedLoader,
    queue: TaskQueue,
    defaults: Defaults,
}

impl Infographic {
    /// Creates an infographic with the built-in defaults.
    pub fn new(loader: SharedLoader) -> Self {
        Self::with_defaults(loader, Defaults::new())
    }

    /// Creates an infographic whose defaults are `defaults` over the built-ins.
    pub fn with_defaults(loader: SharedLoader, defaults: Defaults) -> Self {
        Self {
            surface: None,
            loader,
            queue: TaskQueue::new(),
            defaults: defaults.over_builtin(),
        }
    }

    /// Creates a raster surface and draws onto it from now on.
    ///
    /// Zero or unset dimensions use the configured canvas defaults.
    pub fn create_canvas(&mut self, options: &CanvasOptions) -> Rc<RefCell<RasterSurface>> {
        let requested = options.without_zeros();
        let (width, height) = merge(&[&self.defaults.canvas, &requested]).resolve();
        let canvas = Rc::new(RefCell::new(RasterSurface::new(width, height)));
        tracing::debug!(width, height, "created canvas");
        self.surface = Some(canvas.clone());
        canvas
    }

    /// Draws onto `surface` from now on.
    ///
    /// Requests that are already queued keep drawing onto the surface they
    /// were added against.
    pub fn set_surface(&mut self, surface: SharedSurface) -> &mut Self {
        self.surface = Some(surface);
        self
    }

    /// Queues a background: colour fill, then pattern, then image.
    ///
    /// Only the parts with a value (colour) or URL (pattern, image) are
    /// queued. Colour and pattern fills cover the whole surface unless a
    /// size is given.
    pub fn add_background(&mut self, options: &BackgroundOptions) -> InfographResult<&mut Self> {
        let surface = self.ready_surface()?;
        let (width, height) = {
            let s = surface.borrow();
            (s.width(), s.height())
        };
        let structural = BackgroundOptions::structural(width, height);
        let resolved = merge(&[&self.defaults.background, &structural, options]);

        if let Some(config) = resolved.color.resolve() {
            self.queue.enqueue(ops::color_fill(config, surface.clone()));
        }
        if let Some(config) = resolved.pattern.resolve() {
            self.queue
                .enqueue(ops::pattern_fill(config, surface.clone(), self.loader.clone()));
        }
        if let Some(config) = resolved.image.resolve() {
            self.queue.enqueue(ops::image_draw(
                config,
                ImageLayer::Background,
                surface,
                self.loader.clone(),
            ));
        }
        Ok(self)
    }

    /// Queues a foreground image.
    ///
    /// # Errors
    ///
    /// [`InfographError::SurfaceNotReady`] without a surface, and
    /// [`InfographError::MissingRequiredField`] if `url` is empty.
    pub fn add_image(&mut self, options: &ImageOptions) -> InfographResult<&mut Self> {
        let surface = self.ready_surface()?;
        let config = merge(&[&self.defaults.image, options])
            .resolve()
            .ok_or(InfographError::missing("add_image", "url"))?;
        self.queue.enqueue(ops::image_draw(
            config,
            ImageLayer::Foreground,
            surface,
            self.loader.clone(),
        ));
        Ok(self)
    }

    /// Queues a line of text.
    ///
    /// # Errors
    ///
    /// [`InfographError::SurfaceNotReady`] without a surface, and
    /// [`InfographError::MissingRequiredField`] if `text` is empty.
    pub fn add_text(&mut self, options: &TextOptions) -> InfographResult<&mut Self> {
        let surface = self.ready_surface()?;
        let config = merge(&[&self.defaults.text, options])
            .resolve()
            .ok_or(InfographError::missing("add_text", "text"))?;
        self.queue.enqueue(ops::text_draw(config, surface));
        Ok(self)
    }

    /// Draws queued requests until the queue is empty or waits on an image.
    #[tracing::instrument(skip(self), fields(pending = self.queue.len()))]
    pub fn render(&self) -> QueueState {
        self.queue.drive()
    }

    /// The request queue.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// The effective defaults (built-ins overlaid with the configured ones).
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Width of the current surface, if there is one.
    pub fn width(&self) -> Option<u32> {
        self.surface.as_ref().map(|s| s.borrow().width())
    }

    /// Height of the current surface, if there is one.
    pub fn height(&self) -> Option<u32> {
        self.surface.as_ref().map(|s| s.borrow().height())
    }

    fn ready_surface(&self) -> InfographResult<SharedSurface> {
        self.surface.clone().ok_or(InfographError::SurfaceNotReady)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Switch;
    use crate::loader::DeferredLoader;
    use crate::options::{BackgroundImageOptions, ColorOptions, PatternOptions};
    use crate::surface::{Rect, RecordingSurface, RepeatMode, SurfaceCall};
    use image::RgbaImage;

    fn setup() -> (Infographic, Rc<RefCell<RecordingSurface>>, Rc<DeferredLoader>) {
        let loader = Rc::new(DeferredLoader::new());
        loader.insert("lamp.jpg", RgbaImage::new(16, 16));
        let recorder = Rc::new(RefCell::new(RecordingSurface::new(400, 300)));
        let mut infographic = Infographic::new(loader.clone());
        infographic.set_surface(recorder.clone());
        (infographic, recorder, loader)
    }

    #[test]
    fn requests_need_a_surface() {
        let mut infographic = Infographic::new(Rc::new(DeferredLoader::new()));

        let err = infographic.add_text(&TextOptions::new("hi", 0.0, 0.0)).err();
        assert!(matches!(err, Some(InfographError::SurfaceNotReady)));

        // Surface is checked before required fields.
        let err = infographic.add_image(&ImageOptions::default()).err();
        assert!(matches!(err, Some(InfographError::SurfaceNotReady)));
        assert!(infographic.queue().is_empty());
    }

    #[test]
    fn required_fields_are_checked_before_queueing() {
        let (mut infographic, _, _) = setup();

        let err = infographic.add_text(&TextOptions::new("", 0.0, 0.0)).err();
        assert!(matches!(
            err,
            Some(InfographError::MissingRequiredField {
                operation: "add_text",
                field: "text"
            })
        ));

        let err = infographic.add_image(&ImageOptions::default()).err();
        assert!(matches!(
            err,
            Some(InfographError::MissingRequiredField {
                operation: "add_image",
                field: "url"
            })
        ));
        assert!(infographic.queue().is_empty());
    }

    #[test]
    fn background_parts_queue_in_fixed_order() {
        let (mut infographic, _, _) = setup();
        infographic
            .add_background(&BackgroundOptions {
                image: BackgroundImageOptions {
                    url: Some(Switch::text("lamp.jpg")),
                    ..Default::default()
                },
                pattern: PatternOptions {
                    url: Some(Switch::text("lamp.jpg")),
                    ..Default::default()
                },
                color: ColorOptions {
                    value: Some(Switch::text("red")),
                    ..Default::default()
                },
            })
            .unwrap();

        assert_eq!(
            infographic.queue().pending_labels(),
            ["color-fill", "pattern-fill", "background-image"]
        );
    }

    #[test]
    fn empty_background_queues_nothing() {
        let (mut infographic, _, _) = setup();
        infographic.add_background(&BackgroundOptions::default()).unwrap();
        assert!(infographic.queue().is_empty());
    }

    #[test]
    fn background_colour_covers_the_surface() {
        let (mut infographic, recorder, _) = setup();
        infographic
            .add_background(&BackgroundOptions {
                color: ColorOptions {
                    value: Some(Switch::text("#fff")),
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();

        assert_eq!(infographic.render(), QueueState::Idle);
        assert!(
            recorder
                .borrow()
                .calls()
                .contains(&SurfaceCall::FillRect(Rect::from_size(400.0, 300.0)))
        );
    }

    #[test]
    fn pattern_override_keeps_other_defaults() {
        let (mut infographic, recorder, loader) = setup();
        infographic
            .add_background(&BackgroundOptions {
                pattern: PatternOptions {
                    url: Some(Switch::text("lamp.jpg")),
                    opacity: Some(0.3),
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();

        assert_eq!(infographic.render(), QueueState::Paused);
        loader.run_until_idle();

        let calls = recorder.borrow_mut().take_calls();
        assert_eq!(
            calls,
            [
                SurfaceCall::Save,
                SurfaceCall::CreatePattern(RepeatMode::NoRepeat),
                SurfaceCall::SetGlobalAlpha(0.3),
                SurfaceCall::SetFill("pattern(no-repeat)".into()),
                SurfaceCall::FillRect(Rect::from_size(400.0, 300.0)),
                SurfaceCall::Restore,
            ]
        );
    }

    #[test]
    fn configured_defaults_apply() {
        let loader = Rc::new(DeferredLoader::new());
        let defaults = Defaults::new()
            .with_canvas(CanvasOptions::new(64, 32))
            .with_text(TextOptions {
                font: Some("Courier".into()),
                ..Default::default()
            });
        let mut infographic = Infographic::with_defaults(loader, defaults);

        let canvas = infographic.create_canvas(&CanvasOptions::default());
        assert_eq!(canvas.borrow().image().dimensions(), (64, 32));
        assert_eq!(infographic.width(), Some(64));
        assert_eq!(infographic.defaults().text.font.as_deref(), Some("Courier"));
        assert_eq!(infographic.defaults().text.size, Some(12.0));
    }

    #[test]
    fn zero_canvas_size_falls_back() {
        let mut infographic = Infographic::new(Rc::new(DeferredLoader::new()));
        infographic.create_canvas(&CanvasOptions::new(0, 120));
        assert_eq!(infographic.width(), Some(400));
        assert_eq!(infographic.height(), Some(120));
    }

    #[test]
    fn zero_canvas_size_uses_configured_defaults() {
        let defaults = Defaults::new().with_canvas(CanvasOptions::new(64, 32));
        let mut infographic = Infographic::with_defaults(Rc::new(DeferredLoader::new()), defaults);

        infographic.create_canvas(&CanvasOptions::new(0, 0));
        assert_eq!((infographic.width(), infographic.height()), (Some(64), Some(32)));

        infographic.create_canvas(&CanvasOptions::new(100, 0));
        assert_eq!((infographic.width(), infographic.height()), (Some(100), Some(32)));
    }

    #[test]
    fn text_defaults_fill_in() {
        let (mut infographic, recorder, _) = setup();
        infographic.add_text(&TextOptions::new("Hi", 5.0, 6.0)).unwrap();
        infographic.render();

        let calls = recorder.borrow_mut().take_calls();
        assert!(calls.contains(&SurfaceCall::SetFont("12pt sans-serif".into())));
        assert!(calls.contains(&SurfaceCall::FillText {
            text: "Hi".into(),
            x: 5.0,
            y: 6.0
        }));
    }
}

//! Image loading capability.
//!
//! A [`Loader`] starts loading an image and hands back a [`LoadHandle`].
//! The handle accepts exactly one readiness callback, and that callback
//! fires at most once. Loaders fulfil handles through the matching
//! [`LoadCompleter`] created by [`load_channel`].

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::mem;
use std::path::PathBuf;
use std::rc::Rc;

use image::RgbaImage;

use crate::error::InfographResult;

// ============================================================================
// ImageResource
// ============================================================================

/// A decoded image, cheap to clone.
#[derive(Clone, PartialEq)]
pub struct ImageResource {
    pixels: Rc<RgbaImage>,
}

impl ImageResource {
    /// Wraps decoded RGBA pixels.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Rc::new(pixels),
        }
    }

    /// Decodes an encoded image (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> InfographResult<Self> {
        Ok(Self::new(image::load_from_memory(bytes)?.to_rgba8()))
    }

    /// Intrinsic width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Intrinsic height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The decoded pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageResource")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl From<RgbaImage> for ImageResource {
    fn from(pixels: RgbaImage) -> Self {
        Self::new(pixels)
    }
}

// ============================================================================
// One-shot Load Channel
// ============================================================================

type ReadyCallback = Box<dyn FnOnce(ImageResource)>;

enum Slot {
    /// Neither side has acted yet.
    Empty,
    /// The callback is registered and waiting for the resource.
    Waiting(ReadyCallback),
    /// The resource arrived before a callback was registered.
    Ready(ImageResource),
    /// The callback has fired.
    Fired,
}

/// The consumer half of a load: register what to do once the image is ready.
pub struct LoadHandle {
    slot: Rc<RefCell<Slot>>,
}

/// The producer half of a load, held by the loader until the image is ready.
///
/// Dropping a completer without calling [`complete`](Self::complete) means
/// the handle's callback never fires.
pub struct LoadCompleter {
    slot: Rc<RefCell<Slot>>,
}

/// Creates a connected completer/handle pair.
pub fn load_channel() -> (LoadCompleter, LoadHandle) {
    let slot = Rc::new(RefCell::new(Slot::Empty));
    (
        LoadCompleter { slot: slot.clone() },
        LoadHandle { slot },
    )
}

impl LoadHandle {
    /// Registers the readiness callback.
    ///
    /// If the image is already available the callback runs immediately.
    pub fn on_ready(self, callback: impl FnOnce(ImageResource) + 'static) {
        let previous = mem::replace(&mut *self.slot.borrow_mut(), Slot::Fired);
        match previous {
            Slot::Ready(resource) => callback(resource),
            Slot::Empty => *self.slot.borrow_mut() = Slot::Waiting(Box::new(callback)),
            other => *self.slot.borrow_mut() = other,
        }
    }
}

impl LoadCompleter {
    /// Delivers the loaded image, running the callback if one is registered.
    pub fn complete(self, resource: ImageResource) {
        let previous = mem::replace(&mut *self.slot.borrow_mut(), Slot::Fired);
        match previous {
            Slot::Waiting(callback) => callback(resource),
            Slot::Empty => *self.slot.borrow_mut() = Slot::Ready(resource),
            other => *self.slot.borrow_mut() = other,
        }
    }
}

// ============================================================================
// Loader Trait
// ============================================================================

/// Begins loading images identified by a locator (URL or path).
pub trait Loader {
    /// Starts loading `locator`. The returned handle becomes ready at some
    /// later point, or never if the image cannot be produced.
    fn load(&self, locator: &str) -> LoadHandle;
}

/// A loader shared between the facade and queued tasks.
pub type SharedLoader = Rc<dyn Loader>;

// ============================================================================
// DeferredLoader
// ============================================================================

/// A loader whose completions are delivered only when the host ticks it.
///
/// `load` never completes synchronously; the request is parked until
/// [`tick`](Self::tick) or [`run_until_idle`](Self::run_until_idle) runs,
/// which plays the role of an event loop turn. Images come from the
/// in-memory registry first, then from disk (relative to the optional root).
/// Locators that resolve to nothing are logged and never complete.
#[derive(Default)]
pub struct DeferredLoader {
    registry: RefCell<HashMap<String, ImageResource>>,
    root: Option<PathBuf>,
    pending: RefCell<VecDeque<(String, LoadCompleter)>>,
}

impl DeferredLoader {
    /// Creates a loader with an empty registry that reads relative paths
    /// from the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader that resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Registers an in-memory image under `locator`.
    pub fn insert(&self, locator: impl Into<String>, image: impl Into<ImageResource>) {
        self.registry.borrow_mut().insert(locator.into(), image.into());
    }

    /// Number of loads waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Completes every load that was pending when the tick started.
    ///
    /// Loads started by callbacks during the tick wait for the next one.
    /// Returns the number of loads that completed.
    pub fn tick(&self) -> usize {
        let batch = mem::take(&mut *self.pending.borrow_mut());
        let mut completed = 0;
        for (locator, completer) in batch {
            match self.resolve(&locator) {
                Some(resource) => {
                    tracing::debug!(%locator, "image ready");
                    completer.complete(resource);
                    completed += 1;
                }
                None => {
                    tracing::warn!(
                        %locator,
                        "image could not be loaded; it will never become ready"
                    );
                }
            }
        }
        completed
    }

    /// Ticks until no loads are pending. Returns the total completed.
    pub fn run_until_idle(&self) -> usize {
        let mut completed = 0;
        while self.pending() > 0 {
            completed += self.tick();
        }
        completed
    }

    fn resolve(&self, locator: &str) -> Option<ImageResource> {
        if let Some(resource) = self.registry.borrow().get(locator) {
            return Some(resource.clone());
        }

        let path = match &self.root {
            Some(root) => root.join(locator),
            None => PathBuf::from(locator),
        };
        match image::open(&path) {
            Ok(decoded) => {
                let resource = ImageResource::new(decoded.to_rgba8());
                self.registry
                    .borrow_mut()
                    .insert(locator.to_string(), resource.clone());
                Some(resource)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to decode image");
                None
            }
        }
    }
}

impl Loader for DeferredLoader {
    fn load(&self, locator: &str) -> LoadHandle {
        let (completer, handle) = load_channel();
        tracing::debug!(%locator, "image load requested");
        self.pending
            .borrow_mut()
            .push_back((locator.to_string(), completer));
        handle
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn tiny() -> RgbaImage {
        RgbaImage::new(4, 3)
    }

    #[test]
    fn callback_fires_on_completion() {
        let (completer, handle) = load_channel();
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        handle.on_ready(move |img| sink.set(Some((img.width(), img.height()))));

        assert_eq!(seen.get(), None);
        completer.complete(tiny().into());
        assert_eq!(seen.get(), Some((4, 3)));
    }

    #[test]
    fn completion_before_registration_fires_immediately() {
        let (completer, handle) = load_channel();
        completer.complete(tiny().into());

        let fired = Rc::new(Cell::new(false));
        let sink = fired.clone();
        handle.on_ready(move |_| sink.set(true));
        assert!(fired.get());
    }

    #[test]
    fn dropped_completer_never_fires() {
        let (completer, handle) = load_channel();
        let fired = Rc::new(Cell::new(false));
        let sink = fired.clone();
        handle.on_ready(move |_| sink.set(true));
        drop(completer);
        assert!(!fired.get());
    }

    #[test]
    fn deferred_loader_waits_for_tick() {
        let loader = DeferredLoader::new();
        loader.insert("a.png", tiny());

        let fired = Rc::new(Cell::new(0));
        let sink = fired.clone();
        loader.load("a.png").on_ready(move |_| sink.set(sink.get() + 1));

        assert_eq!(fired.get(), 0);
        assert_eq!(loader.pending(), 1);
        assert_eq!(loader.tick(), 1);
        assert_eq!(fired.get(), 1);
        assert_eq!(loader.pending(), 0);
        assert_eq!(loader.tick(), 0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn unknown_locator_never_completes() {
        let loader = DeferredLoader::with_root("/nonexistent-infograph-root");
        let fired = Rc::new(Cell::new(false));
        let sink = fired.clone();
        loader.load("missing.png").on_ready(move |_| sink.set(true));

        assert_eq!(loader.run_until_idle(), 0);
        assert!(!fired.get());
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn image_resource_decodes_png() {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(tiny())
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let resource = ImageResource::from_bytes(&bytes).unwrap();
        assert_eq!((resource.width(), resource.height()), (4, 3));
    }
}

//! Operation builders.
//!
//! Each builder closes over a resolved config and the capabilities it needs
//! and returns a [`Task`] ready to be enqueued. Builders do no validation;
//! that happens in [`Infographic`](crate::Infographic) before anything is
//! queued.
//!
//! Image-backed tasks suspend the queue, start the load, and return. Their
//! completion callback draws, releases the surface, and only then resumes
//! the queue so the next task finds the surface free.

use crate::color::normalize_color;
use crate::loader::{ImageResource, SharedLoader};
use crate::options::{ColorFillConfig, ImageDrawConfig, PatternFillConfig, TextConfig};
use crate::queue::Task;
use crate::surface::{with_saved_state, FillStyle, Rect, SharedSurface};

/// Which variant of image draw to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayer {
    /// Clipped from the source and drawn with the configured opacity.
    Background,
    /// Drawn whole, without clipping or opacity.
    Foreground,
}

/// Fills a rectangle with a solid colour.
pub fn color_fill(config: ColorFillConfig, surface: SharedSurface) -> Task {
    Task::new("color-fill", move |_| {
        let mut surface = surface.borrow_mut();
        with_saved_state(&mut *surface, |s| {
            s.set_fill(normalize_color(&config.value, config.opacity));
            s.fill_rect(config.rect);
        });
    })
}

/// Fills a rectangle with a tiled image once the image has loaded.
pub fn pattern_fill(
    config: PatternFillConfig,
    surface: SharedSurface,
    loader: SharedLoader,
) -> Task {
    Task::new("pattern-fill", move |ctx| {
        let token = ctx.suspend();
        let handle = loader.load(&config.url);
        handle.on_ready(move |image| {
            {
                let mut surface = surface.borrow_mut();
                with_saved_state(&mut *surface, |s| {
                    let pattern = s.create_pattern(&image, config.repeat);
                    s.set_global_alpha(config.opacity);
                    s.set_fill(FillStyle::Pattern(pattern));
                    s.fill_rect(config.rect);
                });
            }
            token.resume();
        });
    })
}

/// Draws an image once it has loaded.
pub fn image_draw(
    config: ImageDrawConfig,
    layer: ImageLayer,
    surface: SharedSurface,
    loader: SharedLoader,
) -> Task {
    let label = match layer {
        ImageLayer::Background => "background-image",
        ImageLayer::Foreground => "image",
    };
    Task::new(label, move |ctx| {
        let token = ctx.suspend();
        let handle = loader.load(&config.url);
        handle.on_ready(move |image| {
            {
                let (src, dst) = image_geometry(&config, layer, &image);
                let mut surface = surface.borrow_mut();
                with_saved_state(&mut *surface, |s| {
                    if layer == ImageLayer::Background {
                        s.set_global_alpha(config.opacity);
                    }
                    s.draw_image(&image, src, dst);
                });
            }
            token.resume();
        });
    })
}

/// Draws a line of text.
pub fn text_draw(config: TextConfig, surface: SharedSurface) -> Task {
    Task::new("text", move |_| {
        let mut surface = surface.borrow_mut();
        with_saved_state(&mut *surface, |s| {
            s.set_font(&config.font);
            s.set_fill(normalize_color(&config.color, config.opacity));
            s.set_text_align(config.align);
            s.set_global_alpha(config.opacity);
            s.fill_text(&config.text, config.x, config.y);
        });
    })
}

/// Computes the source and destination rectangles for an image draw.
///
/// Unset (zero) sizes take the loaded image's intrinsic dimension.
pub fn image_geometry(
    config: &ImageDrawConfig,
    layer: ImageLayer,
    image: &ImageResource,
) -> (Rect, Rect) {
    let dst = Rect::new(
        config.placement.x,
        config.placement.y,
        or_intrinsic(config.placement.width, image.width()),
        or_intrinsic(config.placement.height, image.height()),
    );
    let src = match layer {
        ImageLayer::Background => Rect::new(
            config.clip.x,
            config.clip.y,
            or_intrinsic(config.clip.width, image.width()),
            or_intrinsic(config.clip.height, image.height()),
        ),
        ImageLayer::Foreground => Rect::from_size(image.width() as f32, image.height() as f32),
    };
    (src, dst)
}

fn or_intrinsic(dimension: f32, intrinsic: u32) -> f32 {
    if dimension == 0.0 || dimension.is_nan() {
        intrinsic as f32
    } else {
        dimension
    }
}

// ============================================================================
// Tests
// ============================================================================

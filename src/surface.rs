//! The drawing surface capability.
//!
//! Tasks never touch pixels themselves; they call the primitives of a
//! [`Surface`]. Two implementations ship with the crate:
//!
//! - [`RasterSurface`](crate::RasterSurface) renders into an RGBA buffer.
//! - [`RecordingSurface`] records every call, which is what the tests use to
//!   observe ordering.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::Switch;
use crate::loader::ImageResource;

// ============================================================================
// Geometry
// ============================================================================

/// An axis-aligned rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle from position and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle at the origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge (x + width).
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (y + height).
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

// ============================================================================
// Styles
// ============================================================================

/// Tiling mode of a pattern fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// The image is painted once.
    #[default]
    NoRepeat,
    /// Tiled horizontally only.
    RepeatX,
    /// Tiled vertically only.
    RepeatY,
    /// Tiled in both directions.
    Repeat,
}

impl RepeatMode {
    /// Maps a `repeat` option to a tiling mode.
    ///
    /// `"x"` and `"y"` tile along one axis, `"repeat"` and `true` tile along
    /// both. Any other value, including unrecognised strings, paints once.
    pub fn from_switch(setting: &Switch) -> Self {
        match setting {
            Switch::Flag(true) => Self::Repeat,
            Switch::Text(mode) => match mode.as_str() {
                "x" => Self::RepeatX,
                "y" => Self::RepeatY,
                "repeat" => Self::Repeat,
                _ => Self::NoRepeat,
            },
            Switch::Flag(false) | Switch::Number(_) => Self::NoRepeat,
        }
    }

    /// The CSS keyword for this mode.
    pub fn as_css(&self) -> &'static str {
        match self {
            Self::NoRepeat => "no-repeat",
            Self::RepeatX => "repeat-x",
            Self::RepeatY => "repeat-y",
            Self::Repeat => "repeat",
        }
    }

    /// Whether the pattern tiles horizontally.
    pub fn tiles_x(&self) -> bool {
        matches!(self, Self::RepeatX | Self::Repeat)
    }

    /// Whether the pattern tiles vertically.
    pub fn tiles_y(&self) -> bool {
        matches!(self, Self::RepeatY | Self::Repeat)
    }
}

/// Horizontal text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Aligned to the start of the line (left for LTR text).
    #[default]
    Start,
    /// Aligned to the end of the line.
    End,
    /// Left aligned.
    Left,
    /// Centered on the anchor.
    Center,
    /// Right aligned.
    Right,
}

impl TextAlign {
    /// Parses an alignment keyword, falling back to [`TextAlign::Start`].
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "end" => Self::End,
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            _ => Self::Start,
        }
    }

    /// The canvas keyword for this alignment.
    pub fn as_keyword(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// A font selection: optional style words, a point size and a family.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    /// Style words such as `bold`, `italic` or `bold italic`; may be empty.
    pub style: String,
    /// Size in points.
    pub size: f32,
    /// Font family name.
    pub family: String,
}

impl FontDescriptor {
    /// Creates a font descriptor.
    pub fn new(style: impl Into<String>, size: f32, family: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            size,
            family: family.into(),
        }
    }

    /// Returns true if the style words ask for a bold face.
    pub fn is_bold(&self) -> bool {
        self.style.split_whitespace().any(|w| w == "bold")
    }

    /// Returns true if the style words ask for an italic face.
    pub fn is_italic(&self) -> bool {
        self.style.split_whitespace().any(|w| w == "italic")
    }
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.style.is_empty() {
            write!(f, "{} ", self.style)?;
        }
        write!(f, "{}pt {}", self.size, self.family)
    }
}

/// A tiled image paint created by [`Surface::create_pattern`].
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The source image.
    pub image: ImageResource,
    /// How the image tiles.
    pub repeat: RepeatMode,
}

/// The paint used by fill operations.
#[derive(Debug, Clone)]
pub enum FillStyle {
    /// A colour with 8-bit channels and a fractional alpha.
    Rgba {
        /// Red channel.
        r: u8,
        /// Green channel.
        g: u8,
        /// Blue channel.
        b: u8,
        /// Alpha in `[0, 1]`.
        alpha: f32,
    },
    /// A colour string passed through as-is (e.g. `lightgray` or an
    /// already formatted `rgba(...)`).
    Keyword(String),
    /// An image pattern.
    Pattern(Pattern),
}

impl fmt::Display for FillStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgba { r, g, b, alpha } => write!(f, "rgba({r}, {g}, {b}, {alpha})"),
            Self::Keyword(keyword) => f.write_str(keyword),
            Self::Pattern(pattern) => write!(f, "pattern({})", pattern.repeat.as_css()),
        }
    }
}

// ============================================================================
// Surface Trait
// ============================================================================

/// Drawing primitives consumed by queued tasks.
///
/// The surface owns its persistent state (fill, font, alignment, alpha).
/// Every task brackets its drawing with [`save`](Self::save) and
/// [`restore`](Self::restore) so nothing leaks into the next task.
pub trait Surface {
    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Pushes the current drawing state.
    fn save(&mut self);

    /// Pops the most recently saved drawing state.
    fn restore(&mut self);

    /// Sets the paint used by [`fill_rect`](Self::fill_rect) and
    /// [`fill_text`](Self::fill_text).
    fn set_fill(&mut self, style: FillStyle);

    /// Sets the alpha applied to every subsequent draw.
    fn set_global_alpha(&mut self, alpha: f32);

    /// Sets the font used by [`fill_text`](Self::fill_text).
    fn set_font(&mut self, font: &FontDescriptor);

    /// Sets the text alignment.
    fn set_text_align(&mut self, align: TextAlign);

    /// Fills a rectangle with the current paint.
    fn fill_rect(&mut self, rect: Rect);

    /// Creates a pattern paint from a loaded image.
    fn create_pattern(&mut self, image: &ImageResource, repeat: RepeatMode) -> Pattern {
        Pattern {
            image: image.clone(),
            repeat,
        }
    }

    /// Draws the `src` region of `image` scaled into `dst`.
    fn draw_image(&mut self, image: &ImageResource, src: Rect, dst: Rect);

    /// Draws text anchored at `(x, y)` on the alphabetic baseline.
    fn fill_text(&mut self, text: &str, x: f32, y: f32);
}

/// A surface shared between the facade and queued tasks.
pub type SharedSurface = Rc<RefCell<dyn Surface>>;

/// Runs `draw` between a `save` and a `restore`.
pub fn with_saved_state<R>(
    surface: &mut dyn Surface,
    draw: impl FnOnce(&mut dyn Surface) -> R,
) -> R {
    surface.save();
    let result = draw(surface);
    surface.restore();
    result
}

// ============================================================================
// RecordingSurface
// ============================================================================

/// One primitive call observed by a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Save,
    Restore,
    /// The paint, formatted as a CSS string.
    SetFill(String),
    SetGlobalAlpha(f32),
    /// The font, formatted as a CSS font shorthand.
    SetFont(String),
    SetTextAlign(TextAlign),
    FillRect(Rect),
    CreatePattern(RepeatMode),
    DrawImage {
        src: Rect,
        dst: Rect,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
    },
}

/// A surface that records calls instead of drawing.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    /// Creates a recorder reporting the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: Vec::new(),
        }
    }

    /// All calls so far, oldest first.
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Removes and returns the recorded calls.
    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    /// The drawing calls only, skipping state changes.
    pub fn draw_calls(&self) -> impl Iterator<Item = &SurfaceCall> {
        self.calls.iter().filter(|call| {
            matches!(
                call,
                SurfaceCall::FillRect(_)
                    | SurfaceCall::DrawImage { .. }
                    | SurfaceCall::FillText { .. }
            )
        })
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn save(&mut self) {
        self.calls.push(SurfaceCall::Save);
    }

    fn restore(&mut self) {
        self.calls.push(SurfaceCall::Restore);
    }

    fn set_fill(&mut self, style: FillStyle) {
        self.calls.push(SurfaceCall::SetFill(style.to_string()));
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.calls.push(SurfaceCall::SetGlobalAlpha(alpha));
    }

    fn set_font(&mut self, font: &FontDescriptor) {
        self.calls.push(SurfaceCall::SetFont(font.to_string()));
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.calls.push(SurfaceCall::SetTextAlign(align));
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.calls.push(SurfaceCall::FillRect(rect));
    }

    fn create_pattern(&mut self, image: &ImageResource, repeat: RepeatMode) -> Pattern {
        self.calls.push(SurfaceCall::CreatePattern(repeat));
        Pattern {
            image: image.clone(),
            repeat,
        }
    }

    fn draw_image(&mut self, _image: &ImageResource, src: Rect, dst: Rect) {
        self.calls.push(SurfaceCall::DrawImage { src, dst });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        self.calls.push(SurfaceCall::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

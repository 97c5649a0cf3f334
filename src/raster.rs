//! CPU raster surface backed by an RGBA image buffer.
//!
//! [`RasterSurface`] implements every [`Surface`] primitive in software:
//! solid and pattern fills, scaled image blits, and text. Text goes through
//! resvg by rendering a one-element SVG document, which gives proper font
//! shaping without a separate text stack.

use std::path::Path;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};

use crate::color::fill_rgba;
use crate::error::InfographResult;
use crate::loader::ImageResource;
use crate::surface::{FillStyle, FontDescriptor, Rect, Surface, TextAlign};

/// Points to CSS pixels.
const PT_TO_PX: f32 = 96.0 / 72.0;

// ============================================================================
// Drawing State
// ============================================================================

/// The part of the surface that `save`/`restore` covers.
#[derive(Debug, Clone)]
struct DrawState {
    fill: FillStyle,
    global_alpha: f32,
    font: FontDescriptor,
    align: TextAlign,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: FillStyle::Rgba {
                r: 0,
                g: 0,
                b: 0,
                alpha: 1.0,
            },
            global_alpha: 1.0,
            font: FontDescriptor::new("", 10.0, "sans-serif"),
            align: TextAlign::Start,
        }
    }
}

// ============================================================================
// RasterSurface
// ============================================================================

/// A software surface drawing into an [`RgbaImage`].
pub struct RasterSurface {
    pixels: RgbaImage,
    state: DrawState,
    stack: Vec<DrawState>,
    fonts: Option<Arc<fontdb::Database>>,
}

impl RasterSurface {
    /// Creates a transparent surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            state: DrawState::default(),
            stack: Vec::new(),
            fonts: None,
        }
    }

    /// The rendered pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consumes the surface, returning the rendered pixels.
    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Writes the rendered pixels to a file; the format follows the extension.
    pub fn save_png(&self, path: impl AsRef<Path>) -> InfographResult<()> {
        self.pixels.save(path)?;
        Ok(())
    }

    /// Number of states currently saved.
    pub fn saved_depth(&self) -> usize {
        self.stack.len()
    }

    fn effective_alpha(&self, alpha: f32) -> f32 {
        (alpha * self.state.global_alpha).clamp(0.0, 1.0)
    }

    fn fill_solid(&mut self, rect: Rect, rgb: [u8; 3], alpha: f32) {
        let (width, height) = self.pixels.dimensions();
        let Some((x0, y0, x1, y1)) = pixel_bounds(rect, width, height) else {
            return;
        };
        let alpha = self.effective_alpha(alpha);
        let src = Rgba([rgb[0], rgb[1], rgb[2], 255]);
        for y in y0..y1 {
            for x in x0..x1 {
                let dst = self.pixels.get_pixel_mut(x, y);
                *dst = blend_over(src, *dst, alpha);
            }
        }
    }

    fn fill_pattern(&mut self, rect: Rect, image: &ImageResource, tiles_x: bool, tiles_y: bool) {
        let (width, height) = self.pixels.dimensions();
        let Some((x0, y0, x1, y1)) = pixel_bounds(rect, width, height) else {
            return;
        };
        let tile = image.pixels();
        let (tw, th) = (tile.width(), tile.height());
        if tw == 0 || th == 0 {
            return;
        }
        let alpha = self.effective_alpha(1.0);
        // Patterns are anchored at the surface origin.
        for y in y0..y1 {
            let sy = if tiles_y { y % th } else if y < th { y } else { continue };
            for x in x0..x1 {
                let sx = if tiles_x { x % tw } else if x < tw { x } else { continue };
                let src = *tile.get_pixel(sx, sy);
                let dst = self.pixels.get_pixel_mut(x, y);
                *dst = blend_over(src, *dst, alpha);
            }
        }
    }

    fn fonts(&mut self) -> Arc<fontdb::Database> {
        self.fonts
            .get_or_insert_with(|| {
                let mut db = fontdb::Database::new();
                db.load_system_fonts();
                tracing::debug!(faces = db.len(), "loaded system fonts");
                Arc::new(db)
            })
            .clone()
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn set_fill(&mut self, style: FillStyle) {
        self.state.fill = style;
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        // Out-of-range values are ignored, like a canvas context does.
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    fn set_font(&mut self, font: &FontDescriptor) {
        self.state.font = font.clone();
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.state.align = align;
    }

    fn fill_rect(&mut self, rect: Rect) {
        match self.state.fill.clone() {
            FillStyle::Pattern(pattern) => {
                let (tx, ty) = (pattern.repeat.tiles_x(), pattern.repeat.tiles_y());
                self.fill_pattern(rect, &pattern.image, tx, ty);
            }
            solid => match fill_rgba(&solid) {
                Some((r, g, b, a)) => self.fill_solid(rect, [r, g, b], a),
                None => tracing::debug!(fill = %solid, "unknown colour; fill skipped"),
            },
        }
    }

    fn draw_image(&mut self, image: &ImageResource, src: Rect, dst: Rect) {
        let source = image.pixels();
        let src = normalized(src);
        if !(src.width > 0.0 && src.height > 0.0) || dst.width < 0.5 || dst.height < 0.5 {
            return;
        }
        let (kx, ky) = (dst.width / src.width, dst.height / src.height);

        // The part of `src` that lies inside the image, and where it lands.
        let (sx0, sy0) = (src.x.max(0.0), src.y.max(0.0));
        let sx1 = src.right().min(source.width() as f32);
        let sy1 = src.bottom().min(source.height() as f32);
        if sx0 >= sx1 || sy0 >= sy1 {
            return;
        }
        let landed = Rect::new(
            dst.x + (sx0 - src.x) * kx,
            dst.y + (sy0 - src.y) * ky,
            (sx1 - sx0) * kx,
            (sy1 - sy0) * ky,
        );

        // Only the on-surface part of the destination is resampled.
        let (width, height) = self.pixels.dimensions();
        let Some((dx0, dy0, dx1, dy1)) = pixel_bounds(landed, width, height) else {
            return;
        };
        let to_source = |d: u32, origin: f32, k: f32, start: f32| start + (d as f32 - origin) / k;
        let u0 = to_source(dx0, landed.x, kx, sx0);
        let u1 = to_source(dx1, landed.x, kx, sx0);
        let v0 = to_source(dy0, landed.y, ky, sy0);
        let v1 = to_source(dy1, landed.y, ky, sy0);
        let (sw, sh) = (source.width(), source.height());
        let cx0 = (u0.floor().max(0.0) as u32).min(sw - 1);
        let cy0 = (v0.floor().max(0.0) as u32).min(sh - 1);
        let cx1 = (u1.ceil() as u32).clamp(cx0 + 1, sw);
        let cy1 = (v1.ceil() as u32).clamp(cy0 + 1, sh);

        let cropped = imageops::crop_imm(source, cx0, cy0, cx1 - cx0, cy1 - cy0).to_image();
        let (w, h) = (dx1 - dx0, dy1 - dy0);
        let scaled = if cropped.dimensions() == (w, h) {
            cropped
        } else {
            imageops::resize(&cropped, w, h, FilterType::Triangle)
        };

        let alpha = self.effective_alpha(1.0);
        composite_over(&mut self.pixels, &scaled, dx0 as i64, dy0 as i64, alpha);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let Some((r, g, b, a)) = fill_rgba(&self.state.fill) else {
            tracing::debug!(fill = %self.state.fill, "unknown colour; text skipped");
            return;
        };
        let svg = text_svg(
            text,
            x,
            y,
            &self.state.font,
            self.state.align,
            [r, g, b],
            self.pixels.width(),
            self.pixels.height(),
        );

        let mut options = Options::default();
        options.fontdb = self.fonts();
        let tree = match Tree::from_str(&svg, &options) {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!(error = %err, "failed to lay out text");
                return;
            }
        };
        let Some(mut pixmap) = Pixmap::new(self.pixels.width(), self.pixels.height()) else {
            return;
        };
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

        let layer = pixmap_to_rgba_image(&pixmap);
        let alpha = self.effective_alpha(a);
        composite_over(&mut self.pixels, &layer, 0, 0, alpha);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a rectangle to integer pixel bounds clipped to `width × height`.
///
/// Negative sizes extend left/up from the origin. Returns `None` if nothing
/// of the rectangle is inside.
fn pixel_bounds(rect: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let Rect { x, y, width: w, height: h } = normalized(rect);
    if !(w > 0.0 && h > 0.0) {
        return None;
    }

    let x0 = x.round().clamp(0.0, width as f32) as u32;
    let y0 = y.round().clamp(0.0, height as f32) as u32;
    let x1 = (x + w).round().clamp(0.0, width as f32) as u32;
    let y1 = (y + h).round().clamp(0.0, height as f32) as u32;
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Flips negative sizes so the rectangle extends right and down.
fn normalized(rect: Rect) -> Rect {
    let (x, width) = if rect.width < 0.0 {
        (rect.x + rect.width, -rect.width)
    } else {
        (rect.x, rect.width)
    };
    let (y, height) = if rect.height < 0.0 {
        (rect.y + rect.height, -rect.height)
    } else {
        (rect.y, rect.height)
    };
    Rect { x, y, width, height }
}

/// Composites `src` onto `dest` at `(x, y)` with an extra opacity factor.
fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let (dest_width, dest_height) = (dest.width() as i64, dest.height() as i64);

    for (sx, sy, pixel) in src.enumerate_pixels() {
        let dx = x + sx as i64;
        let dy = y + sy as i64;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }
        let dst = dest.get_pixel_mut(dx as u32, dy as u32);
        *dst = blend_over(*pixel, *dst, opacity);
    }
}

/// Source-over blend of `src` (scaled by `opacity`) onto `dst`.
fn blend_over(src: Rgba<u8>, dst: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0 * opacity;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| -> u8 {
        let out = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        out.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

/// Builds an SVG document containing a single `<text>` element.
#[allow(clippy::too_many_arguments)]
fn text_svg(
    text: &str,
    x: f32,
    y: f32,
    font: &FontDescriptor,
    align: TextAlign,
    rgb: [u8; 3],
    width: u32,
    height: u32,
) -> String {
    let anchor = match align {
        TextAlign::Start | TextAlign::Left => "start",
        TextAlign::Center => "middle",
        TextAlign::End | TextAlign::Right => "end",
    };
    let weight = if font.is_bold() { "bold" } else { "normal" };
    let style = if font.is_italic() { "italic" } else { "normal" };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="{x}" y="{y}" font-family="{family}" font-size="{size}" font-weight="{weight}" font-style="{style}" text-anchor="{anchor}" fill="#{r:02x}{g:02x}{b:02x}">{body}</text></svg>"##,
        family = escape_xml(&font.family),
        size = font.size * PT_TO_PX,
        r = rgb[0],
        g = rgb[1],
        b = rgb[2],
        body = escape_xml(text),
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Pattern, RepeatMode};

    fn checker() -> ImageResource {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        ImageResource::new(img)
    }

    #[test]
    fn solid_fill_covers_rect_only() {
        let mut surface = RasterSurface::new(10, 10);
        surface.set_fill(FillStyle::Rgba { r: 255, g: 0, b: 0, alpha: 1.0 });
        surface.fill_rect(Rect::new(2.0, 2.0, 4.0, 4.0));

        assert_eq!(surface.image().get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(surface.image().get_pixel(6, 6).0, [0, 0, 0, 0]);
    }

    #[test]
    fn keyword_and_translucent_fills() {
        let mut surface = RasterSurface::new(4, 4);
        surface.set_fill(FillStyle::Keyword("white".into()));
        surface.fill_rect(Rect::from_size(4.0, 4.0));
        surface.set_fill(FillStyle::Rgba { r: 0, g: 0, b: 0, alpha: 0.5 });
        surface.fill_rect(Rect::from_size(4.0, 4.0));

        let pixel = surface.image().get_pixel(1, 1);
        assert_eq!(pixel[3], 255);
        assert!(pixel[0] > 100 && pixel[0] < 155, "half black over white is grey");
    }

    #[test]
    fn unknown_keyword_draws_nothing() {
        let mut surface = RasterSurface::new(4, 4);
        surface.set_fill(FillStyle::Keyword("not-a-colour".into()));
        surface.fill_rect(Rect::from_size(4.0, 4.0));
        assert_eq!(surface.image().get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn save_restore_scopes_state() {
        let mut surface = RasterSurface::new(4, 4);
        surface.save();
        surface.set_global_alpha(0.0);
        surface.set_fill(FillStyle::Keyword("red".into()));
        assert_eq!(surface.saved_depth(), 1);
        surface.restore();
        assert_eq!(surface.saved_depth(), 0);

        surface.fill_rect(Rect::from_size(1.0, 1.0));
        assert_eq!(
            surface.image().get_pixel(0, 0).0,
            [0, 0, 0, 255],
            "default fill is opaque black"
        );
    }

    #[test]
    fn pattern_repeat_x_tiles_horizontally_only() {
        let mut surface = RasterSurface::new(6, 6);
        let pattern = Pattern {
            image: checker(),
            repeat: RepeatMode::RepeatX,
        };
        surface.set_fill(FillStyle::Pattern(pattern));
        surface.fill_rect(Rect::from_size(6.0, 6.0));

        assert_eq!(surface.image().get_pixel(4, 0).0, [255, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(5, 1).0, [255, 255, 255, 255]);
        assert_eq!(surface.image().get_pixel(0, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn pattern_without_repeat_paints_once() {
        let mut surface = RasterSurface::new(6, 6);
        let pattern = Pattern {
            image: checker(),
            repeat: RepeatMode::NoRepeat,
        };
        surface.set_fill(FillStyle::Pattern(pattern));
        surface.fill_rect(Rect::from_size(6.0, 6.0));

        assert_eq!(surface.image().get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert_eq!(surface.image().get_pixel(2, 0).0, [0, 0, 0, 0]);
        assert_eq!(surface.image().get_pixel(0, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn draw_image_clips_and_scales() {
        let mut surface = RasterSurface::new(8, 8);
        // Take the green top-right pixel and blow it up to 4x4.
        let (src, dst) = (Rect::new(1.0, 0.0, 1.0, 1.0), Rect::new(2.0, 2.0, 4.0, 4.0));
        surface.draw_image(&checker(), src, dst);

        assert_eq!(surface.image().get_pixel(3, 3).0, [0, 255, 0, 255]);
        assert_eq!(surface.image().get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn draw_image_honours_global_alpha() {
        let mut surface = RasterSurface::new(2, 2);
        surface.set_global_alpha(0.5);
        surface.draw_image(&checker(), Rect::from_size(2.0, 2.0), Rect::from_size(2.0, 2.0));

        let pixel = surface.image().get_pixel(0, 0);
        assert_eq!(pixel[0], 255);
        assert!((pixel[3] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn huge_destination_only_resamples_the_visible_part() {
        let mut surface = RasterSurface::new(8, 8);
        let dst = Rect::new(0.0, 0.0, 50_000.0, 50_000.0);
        surface.draw_image(&checker(), Rect::from_size(2.0, 2.0), dst);

        // Only the red top-left source pixel reaches the surface.
        assert_eq!(surface.image().get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(7, 7).0, [255, 0, 0, 255]);
    }

    #[test]
    fn offscreen_destination_draws_nothing() {
        let mut surface = RasterSurface::new(8, 8);
        let dst = Rect::new(100.0, 100.0, 50_000.0, 50_000.0);
        surface.draw_image(&checker(), Rect::from_size(2.0, 2.0), dst);

        assert!(surface.image().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn destination_partly_above_the_origin() {
        let mut surface = RasterSurface::new(8, 8);
        let dst = Rect::new(-4.0, -4.0, 8.0, 8.0);
        surface.draw_image(&checker(), Rect::from_size(2.0, 2.0), dst);

        // The white bottom-right source pixel covers the visible quarter.
        assert_eq!(surface.image().get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(surface.image().get_pixel(3, 3).0, [255, 255, 255, 255]);
        assert_eq!(surface.image().get_pixel(4, 4).0, [0, 0, 0, 0]);
    }

    #[test]
    fn clip_past_the_source_shrinks_the_destination() {
        let mut surface = RasterSurface::new(8, 8);
        // Half of the requested source is outside the 2x2 image.
        let (src, dst) = (Rect::new(0.0, 0.0, 4.0, 2.0), Rect::new(0.0, 0.0, 8.0, 4.0));
        surface.draw_image(&checker(), src, dst);

        assert_eq!(surface.image().get_pixel(1, 1)[3], 255);
        assert_eq!(surface.image().get_pixel(3, 3)[3], 255);
        assert_eq!(surface.image().get_pixel(5, 1)[3], 0, "not stretched to the full width");
        assert_eq!(surface.image().get_pixel(1, 5)[3], 0);
    }

    #[test]
    fn pixel_bounds_clip_and_normalise() {
        assert_eq!(pixel_bounds(Rect::new(-5.0, -5.0, 10.0, 10.0), 4, 4), Some((0, 0, 4, 4)));
        assert_eq!(pixel_bounds(Rect::new(3.0, 3.0, -2.0, -2.0), 4, 4), Some((1, 1, 3, 3)));
        assert_eq!(pixel_bounds(Rect::new(10.0, 0.0, 5.0, 5.0), 4, 4), None);
        assert_eq!(pixel_bounds(Rect::default(), 4, 4), None);
    }

    #[test]
    fn text_svg_escapes_and_anchors() {
        let font = FontDescriptor::new("bold", 12.0, "Courier");
        let svg = text_svg("a < b & c", 10.0, 20.0, &font, TextAlign::Center, [255, 0, 0], 100, 50);

        assert!(svg.contains("a &lt; b &amp; c"));
        assert!(svg.contains(r#"text-anchor="middle""#));
        assert!(svg.contains(r#"font-weight="bold""#));
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains(r#"font-size="16""#));
    }
}

//! Colour-string normalisation.
//!
//! Options carry colours as CSS strings. Before a fill, the colour and the
//! option's opacity are combined into a [`FillStyle`]:
//!
//! | Input | Result |
//! |---|---|
//! | `rgba(...)` | passed through, opacity ignored |
//! | `rgb(r, g, b)` | `rgba(r, g, b, opacity)` |
//! | `#rgb`, `#rrggbb` | `rgba(r, g, b, opacity)` (malformed hex becomes white) |
//! | anything else | passed through as a keyword |

use std::str::FromStr;

use palette::Srgb;

use crate::surface::FillStyle;

/// Combines a colour string and an opacity into a fill style.
pub fn normalize_color(value: &str, opacity: f32) -> FillStyle {
    let value = value.trim();

    if value.starts_with("rgba") {
        return FillStyle::Keyword(value.to_string());
    }

    if value.starts_with("rgb") {
        return match parse_channels(value) {
            Some([r, g, b]) => FillStyle::Rgba {
                r,
                g,
                b,
                alpha: opacity,
            },
            None => FillStyle::Keyword(value.to_string()),
        };
    }

    if value.starts_with('#') {
        let (r, g, b) = Srgb::<u8>::from_str(value)
            .map(|c| (c.red, c.green, c.blue))
            .unwrap_or((255, 255, 255));
        return FillStyle::Rgba {
            r,
            g,
            b,
            alpha: opacity,
        };
    }

    FillStyle::Keyword(value.to_string())
}

/// Resolves a CSS colour string to RGB channels and alpha.
///
/// Understands `rgb()`, `rgba()`, hex and named colours. Returns `None` for
/// anything else.
pub fn parse_css_color(value: &str) -> Option<(u8, u8, u8, f32)> {
    let value = value.trim();

    if value.eq_ignore_ascii_case("transparent") {
        return Some((0, 0, 0, 0.0));
    }

    if value.starts_with("rgb") {
        let inner = between_parens(value)?;
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
        return match parts.as_slice() {
            [r, g, b] => Some((channel(r)?, channel(g)?, channel(b)?, 1.0)),
            [r, g, b, a] => Some((
                channel(r)?,
                channel(g)?,
                channel(b)?,
                a.parse::<f32>().ok()?.clamp(0.0, 1.0),
            )),
            _ => None,
        };
    }

    if value.starts_with('#') {
        let c = Srgb::<u8>::from_str(value).ok()?;
        return Some((c.red, c.green, c.blue, 1.0));
    }

    let named = palette::named::from_str(&value.to_ascii_lowercase())?;
    Some((named.red, named.green, named.blue, 1.0))
}

/// Resolves a solid fill style to RGB channels and alpha.
///
/// Returns `None` for patterns and unknown keywords.
pub fn fill_rgba(style: &FillStyle) -> Option<(u8, u8, u8, f32)> {
    match style {
        FillStyle::Rgba { r, g, b, alpha } => Some((*r, *g, *b, alpha.clamp(0.0, 1.0))),
        FillStyle::Keyword(keyword) => parse_css_color(keyword),
        FillStyle::Pattern(_) => None,
    }
}

fn parse_channels(value: &str) -> Option<[u8; 3]> {
    let inner = between_parens(value)?;
    let mut channels = [0u8; 3];
    let mut parts = inner.split(',');
    for channel in channels.iter_mut() {
        let part = parts.next()?.trim();
        *channel = part.parse::<f32>().ok()?.clamp(0.0, 255.0).round() as u8;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(channels)
}

fn between_parens(value: &str) -> Option<&str> {
    let start = value.find('(')?;
    let end = value.rfind(')')?;
    (start < end).then(|| &value[start + 1..end])
}

// ============================================================================
// Tests
// ============================================================================

//! Layered configuration merging.
//!
//! Option records are trees of optional scalars. A record is merged into
//! another field by field: nested records recurse, scalars overwrite only
//! when the incoming value is set. "Set" means `Some(_)`, so `Some(0.0)`,
//! `Some(false)` and `Some(String::new())` all override a default while
//! `None` never does.
//!
//! ```
//! use infograph_renderer::{merge, BackgroundOptions, PatternOptions};
//!
//! let defaults = BackgroundOptions::builtin();
//! let caller = BackgroundOptions {
//!     pattern: PatternOptions { opacity: Some(0.3), ..Default::default() },
//!     ..Default::default()
//! };
//!
//! let merged = merge(&[&defaults, &caller]);
//! assert_eq!(merged.pattern.opacity, Some(0.3));
//! assert_eq!(merged.pattern.repeat, defaults.pattern.repeat);
//! ```

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

// ============================================================================
// Merge Trait
// ============================================================================

/// Types that can absorb a partial override of themselves.
pub trait Merge {
    /// Merges `other` into `self`. Set values in `other` win; unset values
    /// leave `self` untouched.
    fn merge_from(&mut self, other: &Self);
}

impl<T: Clone> Merge for Option<T> {
    fn merge_from(&mut self, other: &Self) {
        if let Some(value) = other {
            *self = Some(value.clone());
        }
    }
}

/// Merges any number of partials left to right into a fresh value.
///
/// The result owns deep copies of everything it took from the inputs, so
/// later changes to a partial never show up in an earlier result.
pub fn merge<T: Merge + Default>(partials: &[&T]) -> T {
    let mut merged = T::default();
    for partial in partials {
        merged.merge_from(partial);
    }
    merged
}

/// Implements [`Merge`] for a record by merging each listed field.
macro_rules! impl_merge {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::config::Merge for $ty {
            fn merge_from(&mut self, other: &Self) {
                $( $crate::config::Merge::merge_from(&mut self.$field, &other.$field); )*
            }
        }
    };
}

pub(crate) use impl_merge;

// ============================================================================
// Switch
// ============================================================================

/// A scalar that is either a boolean flag, a number, or a string value.
///
/// Used for options that accept "`false` or a value", such as a background
/// colour, an image URL, or a pattern repeat mode. In JSON it is written as
/// a plain boolean, number or string:
///
/// ```json
/// { "value": false }
/// { "value": "rgb(76,175,80)" }
/// { "repeat": true }
/// { "repeat": "x" }
/// { "text": 42 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum Switch {
    /// A boolean flag.
    Flag(bool),
    /// A numeric value, used as its decimal text.
    Number(f64),
    /// A string value.
    Text(String),
}

impl Switch {
    /// The disabled state.
    pub const OFF: Self = Self::Flag(false);

    /// Creates a text switch.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the value as text if it is set: a non-empty string, or a
    /// number other than zero.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(value) if !value.is_empty() => Some(Cow::Borrowed(value)),
            Self::Number(n) if *n != 0.0 && !n.is_nan() => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }
}

impl Default for Switch {
    fn default() -> Self {
        Self::OFF
    }
}

impl From<bool> for Switch {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<&str> for Switch {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Switch {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Inner {
        url: Option<Switch>,
        opacity: Option<f32>,
    }

    impl_merge!(Inner { url, opacity });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Outer {
        label: Option<String>,
        visible: Option<bool>,
        inner: Inner,
    }

    impl_merge!(Outer { label, visible, inner });

    fn base() -> Outer {
        Outer {
            label: Some("base".into()),
            visible: Some(true),
            inner: Inner {
                url: Some(Switch::OFF),
                opacity: Some(1.0),
            },
        }
    }

    #[test]
    fn unset_values_never_override() {
        let merged = merge(&[&base(), &Outer::default()]);
        assert_eq!(merged, base());
    }

    #[test]
    fn falsy_values_override() {
        let caller = Outer {
            label: Some(String::new()),
            visible: Some(false),
            inner: Inner {
                url: None,
                opacity: Some(0.0),
            },
        };
        let merged = merge(&[&base(), &caller]);

        assert_eq!(merged.label.as_deref(), Some(""));
        assert_eq!(merged.visible, Some(false));
        assert_eq!(merged.inner.opacity, Some(0.0));
        assert_eq!(merged.inner.url, Some(Switch::OFF));
    }

    #[test]
    fn nested_partial_keeps_siblings() {
        let caller = Outer {
            inner: Inner {
                opacity: Some(0.3),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = merge(&[&base(), &caller]);

        assert_eq!(merged.inner.opacity, Some(0.3));
        assert_eq!(merged.inner.url, Some(Switch::OFF));
        assert_eq!(merged.label.as_deref(), Some("base"));
    }

    #[test]
    fn later_partials_take_precedence() {
        let a = Outer {
            label: Some("a".into()),
            ..Default::default()
        };
        let b = Outer {
            label: Some("b".into()),
            ..Default::default()
        };
        let merged = merge(&[&base(), &a, &b]);
        assert_eq!(merged.label.as_deref(), Some("b"));
    }

    #[test]
    fn merge_is_idempotent() {
        let b = Outer {
            visible: Some(false),
            inner: Inner {
                url: Some(Switch::text("pattern.png")),
                opacity: None,
            },
            ..Default::default()
        };
        let once = merge(&[&base(), &b]);
        let twice = merge(&[&once, &b]);
        assert_eq!(once, twice);
    }

    #[test]
    fn result_does_not_alias_inputs() {
        let mut caller = Outer {
            label: Some("first".into()),
            ..Default::default()
        };
        let merged = merge(&[&base(), &caller]);

        caller.label = Some("second".into());
        assert_eq!(merged.label.as_deref(), Some("first"));
    }

    #[test]
    fn merge_of_nothing_is_default() {
        let merged: Outer = merge(&[]);
        assert_eq!(merged, Outer::default());
    }

    #[test]
    fn switch_parses_from_json() {
        let flag: Switch = serde_json::from_str("false").unwrap();
        let text: Switch = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(flag, Switch::Flag(false));
        assert_eq!(text, Switch::text("x"));
    }

    #[test]
    fn numbers_are_text_unless_zero() {
        let number: Switch = serde_json::from_str("42").unwrap();
        assert_eq!(number, Switch::Number(42.0));
        assert_eq!(number.as_text().as_deref(), Some("42"));
        assert_eq!(Switch::Number(2.5).as_text().as_deref(), Some("2.5"));
        assert_eq!(Switch::Number(0.0).as_text(), None);
    }

    #[test]
    fn switch_text_requires_content() {
        assert_eq!(Switch::text("a.png").as_text().as_deref(), Some("a.png"));
        assert_eq!(Switch::text("").as_text(), None);
        assert_eq!(Switch::Flag(true).as_text(), None);
        assert_eq!(Switch::OFF.as_text(), None);
    }
}

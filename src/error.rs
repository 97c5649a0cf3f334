//! Error types returned by the public API.

/// Convenience result type used across the crate.
pub type InfographResult<T> = Result<T, InfographError>;

/// Errors raised synchronously by `add_*` requests and document I/O.
///
/// Image loading has no error kind: a locator that never resolves leaves
/// the queue paused rather than failing.
#[derive(thiserror::Error, Debug)]
pub enum InfographError {
    /// A mandatory option was absent, `false`, or empty.
    #[error("{operation} requires a non-empty `{field}`")]
    MissingRequiredField {
        /// The request that was rejected (e.g. `add_text`).
        operation: &'static str,
        /// The option that was missing.
        field: &'static str,
    },

    /// A drawing request was made before a surface was attached.
    #[error("no drawing surface: call `create_canvas` or `set_surface` first")]
    SurfaceNotReady,

    /// A JSON document could not be parsed or written.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Encoding or decoding an image failed.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InfographError {
    /// Build a [`InfographError::MissingRequiredField`] value.
    pub fn missing(operation: &'static str, field: &'static str) -> Self {
        Self::MissingRequiredField { operation, field }
    }
}

impl From<serde_json::Error> for InfographError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_operation_and_field() {
        let err = InfographError::missing("add_text", "text");
        assert_eq!(err.to_string(), "add_text requires a non-empty `text`");
    }

    #[test]
    fn serde_errors_convert() {
        let err: InfographError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, InfographError::Serde(_)));
    }
}

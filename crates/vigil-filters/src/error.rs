//! Error types for the filter utilities.

use thiserror::Error;

/// Errors that can occur while decoding filters or loading configuration.
///
/// The filter operations themselves are total; only strict decoding of
/// externally supplied JSON can fail.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The JSON document does not describe a filter.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

/// Result type alias for filter operations.
pub type Result<T> = std::result::Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = FilterError::InvalidFilter("expected an object".to_string());
        assert_eq!(err.to_string(), "invalid filter: expected an object");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: FilterError = json_err.into();
        assert!(err.to_string().starts_with("serialization error:"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FilterError>();
    }
}

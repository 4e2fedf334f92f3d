//! Error types for the vigil-promql crate.

use thiserror::Error;

/// Errors that can occur while turning query text into a visual query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The text is not valid query syntax.
    #[error("parse error at offset {offset}: {reason}")]
    Parse {
        /// Byte offset of the failure in the trimmed input.
        offset: usize,
        /// What the parser expected.
        reason: String,
    },

    /// A complete expression was parsed but text remains after it.
    #[error("unexpected trailing input at offset {offset}: '{remaining}'")]
    TrailingInput {
        /// Byte offset of the remaining text.
        offset: usize,
        /// The unparsed text.
        remaining: String,
    },

    /// The expression is valid but cannot be represented as a visual query.
    #[error("unsupported expression: {reason}")]
    Unsupported {
        /// Why the expression has no visual form.
        reason: String,
    },

    /// A function call names no operation in the registry.
    #[error("unknown function: {name}")]
    UnknownFunction {
        /// The function name.
        name: String,
    },

    /// Parentheses or calls are nested deeper than the parser allows.
    #[error("expression nesting exceeds {limit} levels")]
    NestingTooDeep {
        /// The configured nesting limit.
        limit: usize,
    },

    /// Binary queries are nested deeper than the configured depth.
    #[error("binary query depth exceeds {limit}")]
    DepthExceeded {
        /// The configured depth limit.
        limit: usize,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_parse() {
        let err = QueryError::Parse {
            offset: 4,
            reason: "expected ')'".to_string(),
        };
        assert_eq!(err.to_string(), "parse error at offset 4: expected ')'");
    }

    #[test]
    fn error_display_trailing_input() {
        let err = QueryError::TrailingInput {
            offset: 3,
            remaining: "offset 5m".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected trailing input at offset 3: 'offset 5m'"
        );
    }

    #[test]
    fn error_display_unsupported() {
        let err = QueryError::unsupported("subquery");
        assert_eq!(err.to_string(), "unsupported expression: subquery");
    }

    #[test]
    fn error_display_unknown_function() {
        let err = QueryError::UnknownFunction {
            name: "predict_linear".to_string(),
        };
        assert_eq!(err.to_string(), "unknown function: predict_linear");
    }

    #[test]
    fn error_display_limits() {
        assert_eq!(
            QueryError::NestingTooDeep { limit: 128 }.to_string(),
            "expression nesting exceeds 128 levels"
        );
        assert_eq!(
            QueryError::DepthExceeded { limit: 16 }.to_string(),
            "binary query depth exceeds 16"
        );
    }

    #[test]
    fn error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: QueryError = serde_err.into();
        assert!(err.to_string().starts_with("serialization error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryError>();
    }
}

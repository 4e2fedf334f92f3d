//! Renderer and parser configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Limits and placeholder text shared by rendering, parsing and normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum nesting of binary queries. Deeper queries are dropped when
    /// normalizing and rendered as [`QueryConfig::depth_limit_placeholder`].
    pub max_depth: usize,
    /// Maximum nesting of parentheses and calls accepted by the parser.
    pub max_parse_nesting: usize,
    /// Marker used in the placeholder for operations missing from the registry,
    /// rendered as `<marker:id>(inner)`.
    pub unknown_operation_marker: String,
    /// Text rendered in place of a nested query past `max_depth`.
    pub depth_limit_placeholder: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_parse_nesting: 128,
            unknown_operation_marker: "unknown".to_string(),
            depth_limit_placeholder: "<depth limit>".to_string(),
        }
    }
}

impl QueryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Set the maximum binary query depth.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum parser nesting.
    #[must_use]
    pub const fn with_max_parse_nesting(mut self, nesting: usize) -> Self {
        self.max_parse_nesting = nesting;
        self
    }

    /// Set the unknown-operation marker.
    #[must_use]
    pub fn with_unknown_operation_marker(mut self, marker: impl Into<String>) -> Self {
        self.unknown_operation_marker = marker.into();
        self
    }

    /// Set the depth-limit placeholder.
    #[must_use]
    pub fn with_depth_limit_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.depth_limit_placeholder = placeholder.into();
        self
    }
}

//! Request-body builder configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for the Elasticsearch request builders.
///
/// The defaults produce the request shapes the console's search backend
/// expects; they only need changing for clusters with custom conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestBodyConfig {
    /// Bucket count when a request does not name one.
    pub default_size: u32,
    /// Name of the aggregation in `aggs`.
    pub aggregation_name: String,
    /// Format of the epoch timestamps in range clauses.
    pub date_format: String,
    /// Value of `analyze_wildcard` on query-string clauses.
    pub analyze_wildcard: bool,
    /// Drop filters whose field is missing from the data view.
    pub ignore_filters_not_in_index: bool,
}

impl Default for RequestBodyConfig {
    fn default() -> Self {
        Self {
            default_size: 500,
            aggregation_name: "A".to_string(),
            date_format: "epoch_millis".to_string(),
            analyze_wildcard: true,
            ignore_filters_not_in_index: false,
        }
    }
}

impl RequestBodyConfig {
    /// Loads a configuration from JSON; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Set the default bucket count.
    #[must_use]
    pub const fn with_default_size(mut self, size: u32) -> Self {
        self.default_size = size;
        self
    }

    /// Set the aggregation name.
    #[must_use]
    pub fn with_aggregation_name(mut self, name: impl Into<String>) -> Self {
        self.aggregation_name = name.into();
        self
    }

    /// Set the date format of range clauses.
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Drop filters whose field is missing from the data view.
    #[must_use]
    pub const fn with_ignore_filters_not_in_index(mut self, ignore: bool) -> Self {
        self.ignore_filters_not_in_index = ignore;
        self
    }
}

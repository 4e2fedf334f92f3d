//! A registry and configuration bundled for editor use.

use serde_json::Value;

use crate::config::QueryConfig;
use crate::error::Result;
use crate::normalize::{fill_default_params, normalize_default_value};
use crate::operations::OperationRegistry;
use crate::parser;
use crate::render;
use crate::types::VisualQuery;

/// Renders, parses and normalizes queries against one operation registry.
#[derive(Debug, Clone)]
pub struct QueryModeller {
    registry: OperationRegistry,
    config: QueryConfig,
}

impl Default for QueryModeller {
    fn default() -> Self {
        Self::new(OperationRegistry::standard(), QueryConfig::default())
    }
}

impl QueryModeller {
    /// Create a modeller.
    #[must_use]
    pub const fn new(registry: OperationRegistry, config: QueryConfig) -> Self {
        Self { registry, config }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// The operation registry.
    #[must_use]
    pub const fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// See [`render::render`].
    #[must_use]
    pub fn render(&self, query: &VisualQuery) -> String {
        render::render(query, &self.registry, &self.config)
    }

    /// See [`parser::parse`].
    #[must_use]
    pub fn parse(&self, text: &str) -> VisualQuery {
        parser::parse(text, &self.registry, &self.config)
    }

    /// See [`parser::try_parse`].
    ///
    /// # Errors
    ///
    /// Returns an error if the text has no visual form.
    pub fn try_parse(&self, text: &str) -> Result<VisualQuery> {
        parser::try_parse(text, &self.registry, &self.config)
    }

    /// See [`normalize_default_value`]. Known operations are also completed
    /// with their declared defaults ([`fill_default_params`]).
    #[must_use]
    pub fn normalize(&self, value: &Value) -> VisualQuery {
        fill_default_params(&normalize_default_value(value, &self.config), &self.registry)
    }

    /// Normalizes an editor value and renders it, as the query preview does.
    #[must_use]
    pub fn preview(&self, value: &Value) -> String {
        self.render(&self.normalize(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preview_of_partial_value() {
        let modeller = QueryModeller::default();
        let text = modeller.preview(&json!({
            "metric": "node_load1",
            "operations": [{"id": "avg_by", "params": ["instance"]}]
        }));
        assert_eq!(text, "avg by(instance) (node_load1)");
    }

    #[test]
    fn comparison_without_bool_round_trips_after_normalizing() {
        let modeller = QueryModeller::default();
        let query = modeller.normalize(&json!({
            "metric": "x",
            "operations": [{"id": "greater_than", "params": [50]}]
        }));

        let text = modeller.render(&query);
        assert_eq!(text, "x > 50");
        assert_eq!(modeller.parse(&text), query);
    }

    #[test]
    fn parse_uses_configured_limits() {
        let modeller = QueryModeller::default().with_config(QueryConfig::default().with_max_depth(1));
        assert_eq!(modeller.config().max_depth, 1);
        assert!(modeller.parse("a + b").is_raw());
        assert!(modeller.try_parse("a + 1").is_ok());
    }

    #[test]
    fn custom_registry() {
        let modeller = QueryModeller::new(OperationRegistry::new(), QueryConfig::default());
        assert!(modeller.registry().is_empty());
        assert!(modeller.parse("rate(x[5m])").is_raw());
    }
}

//! # vigil-promql
//!
//! Visual query model for the Vigil metrics explorer.
//!
//! This crate provides:
//!
//! - [`VisualQuery`] — An editable metric query: metric, label matchers,
//!   an operation pipeline and nested binary queries
//! - [`OperationRegistry`] — The table of operations the editor offers
//! - [`render`] — Deterministic PromQL rendering
//! - [`parse`], [`try_parse`] — PromQL text back into a visual query, with a
//!   raw-mode fallback for syntax the editor cannot represent
//! - [`normalize_default_value`] — Completion of partially built editor values
//!
//! ## Example
//!
//! ```rust
//! use vigil_promql::{LabelFilter, Operation, QueryModeller, VisualQuery};
//!
//! let modeller = QueryModeller::default();
//!
//! let query = VisualQuery::new("http_requests_total")
//!     .with_label(LabelFilter::equal("job", "api"))
//!     .with_operation(Operation::new("rate").with_param("5m"))
//!     .with_operation(Operation::new("sum_by").with_param("code"));
//!
//! let text = modeller.render(&query);
//! assert_eq!(text, r#"sum by(code) (rate(http_requests_total{job="api"}[5m]))"#);
//!
//! // Rendered text parses back to the same query
//! assert_eq!(modeller.parse(&text), query);
//!
//! // Syntax outside the editor's reach is kept verbatim
//! assert!(modeller.parse("rate(up[5m] offset 1h)").is_raw());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod modeller;
pub mod normalize;
pub mod operations;
pub mod parser;
pub mod render;
pub mod types;

// Re-export main types
pub use config::QueryConfig;
pub use error::{QueryError, Result};
pub use modeller::QueryModeller;
pub use normalize::{fill_default_params, normalize_default_value};
pub use operations::{
    Grouping, OperationCategory, OperationDef, OperationRegistry, ParamDef, ParamKind, RenderKind,
};
pub use parser::{parse, try_parse};
pub use render::{is_valid_metric_name, render, render_labels};
pub use types::{
    BinaryOperator, BinaryQuery, LabelFilter, LabelOperator, Operation, OperationParam,
    VectorMatching, VectorMatchingKind, VisualQuery,
};

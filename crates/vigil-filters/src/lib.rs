//! # vigil-filters
//!
//! Filter model and Elasticsearch request builders for the Vigil console.
//!
//! This crate provides:
//!
//! - [`Filter`] — A predicate with display metadata and persistence scope
//! - [`build_empty_filter`], [`build_custom_filter`], [`build_query_filter`] — Filter constructors
//! - [`compare_filters`] — Field-by-field filter equality under [`FilterCompareOptions`]
//! - [`dedup_filters`], [`uniq_filters`] — List deduplication
//! - [`only_disabled_filters_changed`] — Detects edits that cannot change query results
//! - [`normalize_request_body`] — Terms aggregation bodies for value lookups
//! - [`build_query_from_filters`] — The `bool` query applying a filter bar
//!
//! ## Example
//!
//! ```rust
//! use vigil_filters::{
//!     build_phrase_filter, compare_filters, only_disabled_filters_changed,
//!     FilterCompareOptions,
//! };
//!
//! let status = build_phrase_filter("status", 500, "logs-*");
//! let negated = status.toggle_negated();
//!
//! // Negation is ignored when comparing payloads only
//! assert!(compare_filters(&status, &negated, &FilterCompareOptions::payload_only()));
//! assert!(!compare_filters(&status, &negated, &FilterCompareOptions::compare_all()));
//!
//! // Adding a disabled filter does not change what the query returns
//! let old = vec![status.clone()];
//! let new = vec![status, negated.disable()];
//! assert!(only_disabled_filters_changed(&new, &old, None));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builders;
pub mod codec;
pub mod compare;
pub mod config;
pub mod dsl;
pub mod error;
pub mod request;
pub mod types;

// Re-export main types
pub use builders::{
    build_custom_filter, build_empty_filter, build_phrase_filter, build_phrases_filter,
    build_query_filter, build_range_filter, FilterMetaPatch,
};
pub use codec::{filter_from_value, filter_to_value, is_es_query_string, is_query_string_filter};
pub use compare::{
    compare_filter_lists, compare_filters, dedup_filters, filter_matches_index,
    only_disabled_filters_changed, uniq_filters, FilterCompareOptions, COMPARE_ALL_OPTIONS,
};
pub use config::RequestBodyConfig;
pub use dsl::build_query_from_filters;
pub use error::{FilterError, Result};
pub use request::{
    bucket_keys, build_msearch_payload, normalize_request_body, AggregationKind, MsearchHeader,
    TermsRequest,
};
pub use types::{
    DataView, DataViewField, Filter, FilterKind, FilterMeta, FilterQuery, FilterState, FilterStore,
    OneOrMany, QueryStringQuery, RangeParams,
};

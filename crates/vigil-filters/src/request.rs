//! Elasticsearch request bodies for term lookups.
//!
//! The console asks the search backend for the distinct values of a field
//! (for variable pickers and ad-hoc filter suggestions) with a small
//! declarative [`TermsRequest`]. [`normalize_request_body`] turns it into the
//! aggregation body sent to `_search` / `_msearch`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RequestBodyConfig;
use crate::error::Result;

/// Bucket aggregation used to collect values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    /// `terms`: most frequent values.
    #[default]
    Terms,
    /// `significant_terms`: unusually frequent values.
    SignificantTerms,
}

impl AggregationKind {
    /// Returns the aggregation name used in the request body.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Terms => "terms",
            Self::SignificantTerms => "significant_terms",
        }
    }
}

/// Declarative description of a value lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsRequest {
    /// Free-text Lucene query restricting the documents.
    #[serde(default)]
    pub query: Option<String>,
    /// Aggregation to run.
    #[serde(default)]
    pub find: AggregationKind,
    /// Field to collect values from.
    pub field: String,
    /// Bucket count; the configured default when absent.
    #[serde(default)]
    pub size: Option<u32>,
    /// Time field for the range restriction.
    #[serde(default)]
    pub timefield: Option<String>,
    /// Range start, epoch milliseconds.
    #[serde(default)]
    pub start: Option<i64>,
    /// Range end, epoch milliseconds.
    #[serde(default)]
    pub end: Option<i64>,
}

impl TermsRequest {
    /// Creates a `terms` lookup on a field.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::default()
        }
    }

    /// Sets the free-text query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sets the aggregation kind.
    #[must_use]
    pub const fn with_find(mut self, find: AggregationKind) -> Self {
        self.find = find;
        self
    }

    /// Sets the bucket count.
    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Restricts the lookup to `[start, end]` on a time field.
    #[must_use]
    pub fn with_time_range(mut self, timefield: impl Into<String>, start: i64, end: i64) -> Self {
        self.timefield = Some(timefield.into());
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// Builds the aggregation request body for a lookup.
///
/// The body carries `query.bool.filter` only when the lookup has a non-empty
/// query or a complete time range; otherwise the aggregation runs unfiltered.
#[must_use]
pub fn normalize_request_body(request: &TermsRequest, config: &RequestBodyConfig) -> Value {
    let mut filters = Vec::new();

    if let Some(query) = request.query.as_deref().filter(|query| !query.is_empty()) {
        filters.push(serde_json::json!({
            "query_string": {
                "analyze_wildcard": config.analyze_wildcard,
                "query": query,
            }
        }));
    }

    if let (Some(timefield), Some(start), Some(end)) =
        (request.timefield.as_deref(), request.start, request.end)
    {
        let mut range = Map::new();
        range.insert(
            timefield.to_string(),
            serde_json::json!({
                "gte": start,
                "lte": end,
                "format": config.date_format,
            }),
        );
        filters.push(serde_json::json!({ "range": range }));
    }

    let mut aggregation = Map::new();
    aggregation.insert(
        request.find.as_str().to_string(),
        serde_json::json!({
            "field": request.field,
            "size": request.size.unwrap_or(config.default_size),
            "order": { "_key": "asc" },
        }),
    );
    let mut aggs = Map::new();
    aggs.insert(config.aggregation_name.clone(), Value::Object(aggregation));

    let mut body = Map::new();
    body.insert("aggs".to_string(), Value::Object(aggs));
    if !filters.is_empty() {
        body.insert(
            "query".to_string(),
            serde_json::json!({ "bool": { "filter": filters } }),
        );
    }
    Value::Object(body)
}

/// Header line of an `_msearch` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsearchHeader {
    /// Target index pattern.
    pub index: String,
    /// Search type.
    pub search_type: String,
    /// Skip missing indices instead of failing.
    pub ignore_unavailable: bool,
}

impl MsearchHeader {
    /// Creates a `query_then_fetch` header for an index pattern.
    #[must_use]
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            search_type: "query_then_fetch".to_string(),
            ignore_unavailable: true,
        }
    }
}

/// Builds the NDJSON header/body line pair of an `_msearch` request.
///
/// # Errors
///
/// Returns an error if the header cannot be serialized.
pub fn build_msearch_payload(header: &MsearchHeader, body: &Value) -> Result<String> {
    let header = serde_json::to_string(header)?;
    let body = serde_json::to_string(body)?;
    Ok(format!("{header}\n{body}\n"))
}

/// Extracts the bucket keys of the lookup aggregation from a search response.
///
/// Accepts a plain search response or an `_msearch` response (first entry of
/// `responses`). Malformed responses yield no keys.
#[must_use]
pub fn bucket_keys(response: &Value, config: &RequestBodyConfig) -> Vec<Value> {
    let response = response
        .get("responses")
        .and_then(|responses| responses.get(0))
        .unwrap_or(response);

    response
        .get("aggregations")
        .and_then(|aggregations| aggregations.get(&config.aggregation_name))
        .and_then(|aggregation| aggregation.get("buckets"))
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| bucket.get("key").cloned())
                .collect()
        })
        .unwrap_or_default()
}

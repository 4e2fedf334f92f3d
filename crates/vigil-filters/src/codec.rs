//! Mapping between [`Filter`] and the console's JSON filter shape.
//!
//! ```json
//! {
//!   "meta": { "index": "logs-*", "type": "phrase", "key": "status", "value": "404",
//!             "negate": false, "disabled": false, "alias": null },
//!   "query": { "match_phrase": { "status": 404 } },
//!   "$state": { "store": "appState" }
//! }
//! ```
//!
//! Decoding is total. `meta.type` decides the payload variant when present,
//! so a custom filter whose DSL happens to contain `query_string` stays
//! custom. Without a declared type the kind is inferred from the payload
//! shape, and anything unrecognized is kept verbatim as a custom payload.

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{
    Filter, FilterKind, FilterMeta, FilterQuery, FilterState, FilterStore, QueryStringQuery,
    RangeParams,
};

/// Returns true if `value` has the shape `{query_string: {query: ...}}`.
#[must_use]
pub fn is_es_query_string(value: &Value) -> bool {
    value
        .get("query_string")
        .and_then(|body| body.get("query"))
        .is_some()
}

/// Returns true if `value` is a JSON filter carrying a query-string predicate.
///
/// A filter whose `meta.type` names another kind is never a query-string
/// filter, even if its payload contains a `query_string` clause.
#[must_use]
pub fn is_query_string_filter(value: &Value) -> bool {
    let declared = value
        .get("meta")
        .and_then(|meta| meta.get("type"))
        .and_then(Value::as_str);

    match declared {
        Some(kind) => {
            kind == FilterKind::QueryString.as_str()
                && value.get("query").is_some_and(|query| query.get("query_string").is_some())
        }
        None => value.get("query").is_some_and(is_es_query_string),
    }
}

/// Encodes a filter into its JSON shape.
#[must_use]
pub fn filter_to_value(filter: &Filter) -> Value {
    let mut meta = Map::new();
    if let Some(index) = &filter.meta.index {
        meta.insert("index".to_string(), Value::String(index.clone()));
    }
    if let Some(kind) = filter.kind() {
        meta.insert("type".to_string(), Value::String(kind.as_str().to_string()));
    }
    if let Some(key) = &filter.meta.key {
        meta.insert("key".to_string(), Value::String(key.clone()));
    }
    if let Some(value) = &filter.meta.value {
        meta.insert("value".to_string(), Value::String(value.clone()));
    }
    if let Some(params) = &filter.meta.params {
        meta.insert("params".to_string(), params.clone());
    }
    meta.insert("negate".to_string(), Value::Bool(filter.meta.negate));
    meta.insert("disabled".to_string(), Value::Bool(filter.meta.disabled));
    meta.insert(
        "alias".to_string(),
        filter.meta.alias.clone().map_or(Value::Null, Value::String),
    );

    let mut out = Map::new();
    out.insert("meta".to_string(), Value::Object(meta));
    if let Some(dsl) = filter.query.to_dsl() {
        out.insert("query".to_string(), dsl);
    }
    if let Some(state) = filter.state {
        out.insert(
            "$state".to_string(),
            serde_json::json!({ "store": store_name(state.store) }),
        );
    }
    Value::Object(out)
}

const fn store_name(store: FilterStore) -> &'static str {
    match store {
        FilterStore::AppState => "appState",
        FilterStore::GlobalState => "globalState",
    }
}

/// Decodes a filter from its JSON shape, falling back to permissive defaults.
#[must_use]
pub fn filter_from_value(value: &Value) -> Filter {
    let meta_value = value.get("meta");
    let meta = decode_meta(meta_value);
    let declared = meta_value
        .and_then(|meta| meta.get("type"))
        .and_then(Value::as_str)
        .and_then(FilterKind::from_wire);

    let payload = payload_of(value);
    let query = decode_query(declared, payload.as_ref());

    let state = value
        .get("$state")
        .and_then(|state| state.get("store"))
        .and_then(|store| serde_json::from_value::<FilterStore>(store.clone()).ok())
        .map(FilterState::new);

    Filter { meta, query, state }
}

fn decode_meta(meta: Option<&Value>) -> FilterMeta {
    let Some(meta) = meta else {
        return FilterMeta::default();
    };
    let string = |name: &str| meta.get(name).and_then(Value::as_str).map(str::to_string);
    let flag = |name: &str| meta.get(name).and_then(Value::as_bool).unwrap_or(false);

    FilterMeta {
        index: string("index"),
        key: string("key"),
        value: string("value"),
        params: meta.get("params").filter(|params| !params.is_null()).cloned(),
        negate: flag("negate"),
        disabled: flag("disabled"),
        alias: string("alias"),
    }
}

/// Finds the predicate payload: the `query` object, or the filter's own
/// top-level keys for filters stored without a `query` wrapper.
fn payload_of(value: &Value) -> Option<Map<String, Value>> {
    if let Some(query) = value.get("query").and_then(Value::as_object) {
        return Some(query.clone());
    }

    let object = value.as_object()?;
    let rest: Map<String, Value> = object
        .iter()
        .filter(|(name, _)| !matches!(name.as_str(), "meta" | "$state" | "query"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    (!rest.is_empty()).then_some(rest)
}

fn decode_query(declared: Option<FilterKind>, payload: Option<&Map<String, Value>>) -> FilterQuery {
    let Some(payload) = payload else {
        return match declared {
            Some(FilterKind::Custom) => FilterQuery::Custom(Map::new()),
            _ => FilterQuery::Empty,
        };
    };

    let decoded = match declared {
        Some(FilterKind::Custom) => Some(FilterQuery::Custom(payload.clone())),
        Some(FilterKind::QueryString) => decode_query_string(payload),
        Some(FilterKind::Phrase) => decode_phrase(payload),
        Some(FilterKind::Phrases) => decode_phrases(payload),
        Some(FilterKind::Range) => decode_range(payload),
        None => decode_query_string(payload)
            .or_else(|| decode_phrase(payload))
            .or_else(|| decode_range(payload))
            .or_else(|| decode_phrases(payload)),
    };

    decoded.unwrap_or_else(|| {
        if let Some(kind) = declared {
            debug!(%kind, "filter payload does not match its declared type, keeping it as custom");
        }
        FilterQuery::Custom(payload.clone())
    })
}

/// Returns the single `(field, value)` entry of an object.
fn single_entry(value: &Value) -> Option<(&String, &Value)> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.iter().next()
}

fn decode_query_string(payload: &Map<String, Value>) -> Option<FilterQuery> {
    let body = payload.get("query_string")?;
    serde_json::from_value::<QueryStringQuery>(body.clone())
        .ok()
        .map(FilterQuery::QueryString)
}

fn phrase_of(clause: &Value) -> Option<(String, Value)> {
    let (field, value) = single_entry(clause.get("match_phrase")?)?;
    // `{field: {query: value}}` is the long form of `{field: value}`.
    let value = value.get("query").unwrap_or(value).clone();
    Some((field.clone(), value))
}

fn decode_phrase(payload: &Map<String, Value>) -> Option<FilterQuery> {
    if payload.len() != 1 {
        return None;
    }
    let clause = Value::Object(payload.clone());
    let (field, value) = phrase_of(&clause)?;
    Some(FilterQuery::Phrase { field, value })
}

fn decode_phrases(payload: &Map<String, Value>) -> Option<FilterQuery> {
    let should = payload.get("bool")?.get("should")?.as_array()?;
    let mut field = None;
    let mut values = Vec::with_capacity(should.len());
    for clause in should {
        let (clause_field, value) = phrase_of(clause)?;
        match &field {
            None => field = Some(clause_field),
            Some(existing) if *existing == clause_field => {}
            Some(_) => return None,
        }
        values.push(value);
    }
    field.map(|field| FilterQuery::Phrases { field, values })
}

fn decode_range(payload: &Map<String, Value>) -> Option<FilterQuery> {
    let (field, params) = single_entry(payload.get("range")?)?;
    let params = serde_json::from_value::<RangeParams>(params.clone()).ok()?;
    Some(FilterQuery::Range {
        field: field.clone(),
        params,
    })
}

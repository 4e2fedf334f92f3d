//! Core types for console filters.
//!
//! This module provides:
//! - [`Filter`] — A predicate with metadata, payload and persistence scope
//! - [`FilterKind`] — The predicate kinds a filter can carry
//! - [`FilterQuery`] — Tagged predicate payload, one variant per kind
//! - [`FilterMeta`] — Display and scoping metadata
//! - [`FilterStore`] — Persistence scope (`appState` / `globalState`)
//! - [`DataView`] — External description of the fields filters apply to
//! - [`OneOrMany`] — A single value or a list of values

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The predicate kinds a filter can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// A single `match_phrase` on one field.
    Phrase,
    /// Any of several `match_phrase` clauses on one field.
    Phrases,
    /// A `range` predicate on one field.
    Range,
    /// An arbitrary query DSL object.
    Custom,
    /// A Lucene `query_string` predicate.
    QueryString,
}

impl FilterKind {
    /// Returns the wire name of this kind, as stored in `meta.type`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Phrase => "phrase",
            Self::Phrases => "phrases",
            Self::Range => "range",
            Self::Custom => "custom",
            Self::QueryString => "query_string",
        }
    }

    /// Parses a wire name back into a kind.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "phrase" => Some(Self::Phrase),
            "phrases" => Some(Self::Phrases),
            "range" => Some(Self::Range),
            "custom" => Some(Self::Custom),
            "query_string" => Some(Self::QueryString),
            _ => None,
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a filter is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterStore {
    /// Scoped to the current app (panel or page).
    #[serde(rename = "appState")]
    AppState,
    /// Pinned across apps.
    #[serde(rename = "globalState")]
    GlobalState,
}

/// Persistence state attached to a filter (`$state` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    /// The persistence scope.
    pub store: FilterStore,
}

impl FilterState {
    /// Creates a state for the given store.
    #[must_use]
    pub const fn new(store: FilterStore) -> Self {
        Self { store }
    }
}

/// Display and scoping metadata of a filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterMeta {
    /// Data view the filter was created against.
    pub index: Option<String>,
    /// Field name the predicate targets.
    pub key: Option<String>,
    /// Display form of the predicate value.
    pub value: Option<String>,
    /// Predicate-specific parameters as shown in the editor.
    pub params: Option<Value>,
    /// Whether the predicate is inverted.
    pub negate: bool,
    /// Whether the filter is switched off.
    pub disabled: bool,
    /// Display override for the filter pill.
    pub alias: Option<String>,
}

/// Bounds of a range predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeParams {
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    /// Exclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    /// Exclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    /// Date format of the bounds, for date fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl RangeParams {
    /// Creates an inclusive range `[gte, lte]`.
    #[must_use]
    pub fn between(gte: impl Into<Value>, lte: impl Into<Value>) -> Self {
        Self {
            gte: Some(gte.into()),
            lte: Some(lte.into()),
            ..Self::default()
        }
    }

    /// Sets the date format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Returns true if no bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.gt.is_none() && self.lte.is_none() && self.lt.is_none()
    }

    /// Returns the display form, e.g. `100 to 200`.
    #[must_use]
    pub fn display(&self) -> String {
        let from = self.gte.as_ref().or(self.gt.as_ref()).map_or_else(|| "*".to_string(), display_value);
        let to = self.lte.as_ref().or(self.lt.as_ref()).map_or_else(|| "*".to_string(), display_value);
        format!("{from} to {to}")
    }
}

/// Body of a `query_string` predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStringQuery {
    /// The Lucene query text.
    pub query: String,
    /// Remaining `query_string` options (`analyze_wildcard`, `default_field`, ...).
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl QueryStringQuery {
    /// Creates a query-string body with no extra options.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            options: Map::new(),
        }
    }

    /// Adds an option to the body.
    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// Predicate payload of a filter. The variant is the filter's kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FilterQuery {
    /// No predicate yet (a freshly created filter).
    #[default]
    Empty,
    /// `{match_phrase: {field: value}}`
    Phrase {
        /// Target field.
        field: String,
        /// Value to match.
        value: Value,
    },
    /// `{bool: {should: [match_phrase...], minimum_should_match: 1}}`
    Phrases {
        /// Target field.
        field: String,
        /// Values, any of which may match.
        values: Vec<Value>,
    },
    /// `{range: {field: params}}`
    Range {
        /// Target field.
        field: String,
        /// Range bounds.
        params: RangeParams,
    },
    /// `{query_string: {...}}`
    QueryString(QueryStringQuery),
    /// Any other query DSL object, kept verbatim.
    Custom(Map<String, Value>),
}

impl FilterQuery {
    /// Returns the kind of this payload, `None` for an empty filter.
    #[must_use]
    pub const fn kind(&self) -> Option<FilterKind> {
        match self {
            Self::Empty => None,
            Self::Phrase { .. } => Some(FilterKind::Phrase),
            Self::Phrases { .. } => Some(FilterKind::Phrases),
            Self::Range { .. } => Some(FilterKind::Range),
            Self::QueryString(_) => Some(FilterKind::QueryString),
            Self::Custom(_) => Some(FilterKind::Custom),
        }
    }

    /// Returns the field this payload targets, if it targets exactly one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Phrase { field, .. } | Self::Phrases { field, .. } | Self::Range { field, .. } => {
                Some(field.as_str())
            }
            Self::Empty | Self::QueryString(_) | Self::Custom(_) => None,
        }
    }

    /// Renders the payload as Elasticsearch query DSL.
    ///
    /// Returns `None` for an empty filter.
    #[must_use]
    pub fn to_dsl(&self) -> Option<Value> {
        let dsl = match self {
            Self::Empty => return None,
            Self::Phrase { field, value } => match_phrase(field, value.clone()),
            Self::Phrases { field, values } => {
                let should: Vec<Value> = values
                    .iter()
                    .map(|value| match_phrase(field, value.clone()))
                    .collect();
                serde_json::json!({
                    "bool": {
                        "should": should,
                        "minimum_should_match": 1,
                    }
                })
            }
            Self::Range { field, params } => {
                let mut range = Map::new();
                range.insert(field.clone(), serde_json::to_value(params).unwrap_or_default());
                serde_json::json!({ "range": range })
            }
            Self::QueryString(body) => {
                serde_json::json!({ "query_string": serde_json::to_value(body).unwrap_or_default() })
            }
            Self::Custom(dsl) => Value::Object(dsl.clone()),
        };
        Some(dsl)
    }
}

fn match_phrase(field: &str, value: Value) -> Value {
    let mut phrase = Map::new();
    phrase.insert(field.to_string(), value);
    serde_json::json!({ "match_phrase": phrase })
}

/// Formats a JSON value for display: strings without quotes, everything else as JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A predicate applied to a data view.
///
/// Serializes to the console's JSON shape (`meta`, `query`, `$state`) through
/// [`crate::codec`]; decoding that shape never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct Filter {
    /// Display and scoping metadata.
    pub meta: FilterMeta,
    /// The predicate payload.
    pub query: FilterQuery,
    /// Persistence scope; `None` lets the caller decide.
    pub state: Option<FilterState>,
}

impl Filter {
    /// Creates a filter from metadata and payload, with no persistence state.
    #[must_use]
    pub const fn new(meta: FilterMeta, query: FilterQuery) -> Self {
        Self {
            meta,
            query,
            state: None,
        }
    }

    /// Returns the kind of this filter, `None` for an empty filter.
    #[must_use]
    pub const fn kind(&self) -> Option<FilterKind> {
        self.query.kind()
    }

    /// Returns true if this is a query-string filter.
    #[must_use]
    pub const fn is_query_string(&self) -> bool {
        matches!(self.query, FilterQuery::QueryString(_))
    }

    /// Returns true if the filter is switched off.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.meta.disabled
    }

    /// Returns true if the filter is pinned to the global state.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.state.is_some_and(|state| state.store == FilterStore::GlobalState)
    }

    /// Returns a copy with the negate flag flipped.
    #[must_use]
    pub fn toggle_negated(&self) -> Self {
        let mut filter = self.clone();
        filter.meta.negate = !filter.meta.negate;
        filter
    }

    /// Returns a copy with the disabled flag flipped.
    #[must_use]
    pub fn toggle_disabled(&self) -> Self {
        let mut filter = self.clone();
        filter.meta.disabled = !filter.meta.disabled;
        filter
    }

    /// Returns an enabled copy.
    #[must_use]
    pub fn enable(&self) -> Self {
        let mut filter = self.clone();
        filter.meta.disabled = false;
        filter
    }

    /// Returns a disabled copy.
    #[must_use]
    pub fn disable(&self) -> Self {
        let mut filter = self.clone();
        filter.meta.disabled = true;
        filter
    }

    /// Returns a copy pinned to the global state.
    #[must_use]
    pub fn pin(&self) -> Self {
        self.with_store(FilterStore::GlobalState)
    }

    /// Returns a copy scoped to the app state.
    #[must_use]
    pub fn unpin(&self) -> Self {
        self.with_store(FilterStore::AppState)
    }

    /// Returns a copy persisted in the given store.
    #[must_use]
    pub fn with_store(&self, store: FilterStore) -> Self {
        let mut filter = self.clone();
        filter.state = Some(FilterState::new(store));
        filter
    }

    /// Returns a copy with the given display alias.
    #[must_use]
    pub fn with_alias(&self, alias: Option<String>) -> Self {
        let mut filter = self.clone();
        filter.meta.alias = alias;
        filter
    }

    /// Decodes a filter from a JSON string.
    ///
    /// Unlike the lenient [`crate::codec::filter_from_value`], this rejects
    /// text that is not a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or not an object.
    pub fn from_json_str(text: &str) -> crate::error::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(crate::error::FilterError::InvalidFilter(
                "expected a JSON object".to_string(),
            ));
        }
        Ok(crate::codec::filter_from_value(&value))
    }

    /// Encodes this filter as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(&crate::codec::filter_to_value(self))?)
    }
}

impl From<Value> for Filter {
    fn from(value: Value) -> Self {
        crate::codec::filter_from_value(&value)
    }
}

impl From<Filter> for Value {
    fn from(filter: Filter) -> Self {
        crate::codec::filter_to_value(&filter)
    }
}

/// A field of a data view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataViewField {
    /// Field name.
    pub name: String,
    /// Field type (`keyword`, `date`, `long`, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl DataViewField {
    /// Creates a field with no type information.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
        }
    }
}

/// External description of the fields available to filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataView {
    /// Scoping identifier, compared with `meta.index`.
    pub id: String,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Available fields.
    #[serde(default)]
    pub fields: Vec<DataViewField>,
}

impl DataView {
    /// Creates a data view with no fields.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, field: DataViewField) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns true if a field with the given name exists.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }
}

/// A single value or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A list of values.
    Many(Vec<T>),
    /// A single value.
    One(T),
}

impl<T> OneOrMany<T> {
    /// Flattens into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(item: T) -> Self {
        Self::One(item)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

impl<T: Clone> From<&[T]> for OneOrMany<T> {
    fn from(items: &[T]) -> Self {
        Self::Many(items.to_vec())
    }
}

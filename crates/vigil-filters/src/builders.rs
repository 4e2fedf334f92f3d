//! Constructors for well-formed filters, one per predicate kind.
//!
//! Every builder always succeeds. Builders that produce a concrete predicate
//! fill `meta.key`, `meta.value` and `meta.params` so the filter bar can show
//! the filter without decoding its payload.

use serde_json::{Map, Value};

use crate::types::{
    display_value, Filter, FilterMeta, FilterQuery, FilterState, FilterStore, QueryStringQuery,
    RangeParams,
};

/// Partial metadata merged over the defaults of [`build_query_filter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterMetaPatch {
    /// Overrides `meta.key`.
    pub key: Option<String>,
    /// Overrides `meta.value`.
    pub value: Option<String>,
    /// Overrides `meta.params`.
    pub params: Option<Value>,
    /// Overrides `meta.negate`.
    pub negate: Option<bool>,
    /// Overrides `meta.disabled`.
    pub disabled: Option<bool>,
}

impl FilterMetaPatch {
    /// Sets the negate override.
    #[must_use]
    pub const fn negate(mut self, negate: bool) -> Self {
        self.negate = Some(negate);
        self
    }

    /// Sets the disabled override.
    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Sets the key override.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the display value override.
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn apply(self, meta: &mut FilterMeta) {
        if let Some(key) = self.key {
            meta.key = Some(key);
        }
        if let Some(value) = self.value {
            meta.value = Some(value);
        }
        if let Some(params) = self.params {
            meta.params = Some(params);
        }
        if let Some(negate) = self.negate {
            meta.negate = negate;
        }
        if let Some(disabled) = self.disabled {
            meta.disabled = disabled;
        }
    }
}

/// Builds a placeholder filter for the "add filter" editor.
///
/// The filter is disabled, not negated, has no alias, and is stored in the
/// global state when pinned or the app state otherwise.
#[must_use]
pub fn build_empty_filter(is_pinned: bool, index: Option<&str>) -> Filter {
    let store = if is_pinned {
        FilterStore::GlobalState
    } else {
        FilterStore::AppState
    };

    Filter {
        meta: FilterMeta {
            index: index.map(str::to_string),
            negate: false,
            disabled: true,
            alias: None,
            ..FilterMeta::default()
        },
        query: FilterQuery::Empty,
        state: Some(FilterState::new(store)),
    }
}

/// Wraps an arbitrary query DSL object in a custom filter.
///
/// `$state` is only attached when `store` is given; otherwise the caller
/// decides where the filter lives.
#[must_use]
#[allow(clippy::fn_params_excessive_bools)]
pub fn build_custom_filter(
    index: &str,
    query_dsl: Map<String, Value>,
    disabled: bool,
    negate: bool,
    alias: Option<String>,
    store: Option<FilterStore>,
) -> Filter {
    Filter {
        meta: FilterMeta {
            index: Some(index.to_string()),
            negate,
            disabled,
            alias,
            ..FilterMeta::default()
        },
        query: FilterQuery::Custom(query_dsl),
        state: store.map(FilterState::new),
    }
}

/// Wraps a `query_string` body in a filter with no `$state`.
#[must_use]
pub fn build_query_filter(
    query: QueryStringQuery,
    index: &str,
    alias: Option<String>,
    meta_overrides: FilterMetaPatch,
) -> Filter {
    let mut meta = FilterMeta {
        index: Some(index.to_string()),
        alias,
        ..FilterMeta::default()
    };
    meta_overrides.apply(&mut meta);

    Filter::new(meta, FilterQuery::QueryString(query))
}

/// Builds a `match_phrase` filter on one field.
#[must_use]
pub fn build_phrase_filter(field: &str, value: impl Into<Value>, index: &str) -> Filter {
    let value = value.into();
    let meta = FilterMeta {
        index: Some(index.to_string()),
        key: Some(field.to_string()),
        value: Some(display_value(&value)),
        params: Some(serde_json::json!({ "query": value.clone() })),
        ..FilterMeta::default()
    };

    Filter::new(
        meta,
        FilterQuery::Phrase {
            field: field.to_string(),
            value,
        },
    )
}

/// Builds a filter matching any of several phrases on one field.
#[must_use]
pub fn build_phrases_filter(field: &str, values: Vec<Value>, index: &str) -> Filter {
    let display = values.iter().map(display_value).collect::<Vec<_>>().join(", ");
    let meta = FilterMeta {
        index: Some(index.to_string()),
        key: Some(field.to_string()),
        value: Some(display),
        params: Some(Value::Array(values.clone())),
        ..FilterMeta::default()
    };

    Filter::new(
        meta,
        FilterQuery::Phrases {
            field: field.to_string(),
            values,
        },
    )
}

/// Builds a `range` filter on one field.
#[must_use]
pub fn build_range_filter(field: &str, params: RangeParams, index: &str) -> Filter {
    let meta = FilterMeta {
        index: Some(index.to_string()),
        key: Some(field.to_string()),
        value: Some(params.display()),
        params: serde_json::to_value(&params).ok(),
        ..FilterMeta::default()
    };

    Filter::new(
        meta,
        FilterQuery::Range {
            field: field.to_string(),
            params,
        },
    )
}

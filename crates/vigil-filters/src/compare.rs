//! Structural comparison and de-duplication of filters.
//!
//! Two filters are compared on their kind, `meta.key`, `meta.value` and
//! predicate payload. [`FilterCompareOptions`] decides which of the remaining
//! flags also take part.

use serde::{Deserialize, Serialize};

use crate::types::{DataView, Filter, FilterKind, OneOrMany};

/// Which metadata flags take part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCompareOptions {
    /// Compare `meta.index`.
    pub index: bool,
    /// Compare `meta.disabled`.
    pub disabled: bool,
    /// Compare `meta.negate`.
    pub negate: bool,
    /// Compare `$state.store`.
    pub state: bool,
    /// Compare `meta.alias`.
    pub alias: bool,
}

/// Compares every flag.
pub const COMPARE_ALL_OPTIONS: FilterCompareOptions = FilterCompareOptions::compare_all();

impl FilterCompareOptions {
    /// Compares every flag.
    #[must_use]
    pub const fn compare_all() -> Self {
        Self {
            index: true,
            disabled: true,
            negate: true,
            state: true,
            alias: true,
        }
    }

    /// Compares the predicate only, ignoring every flag.
    #[must_use]
    pub const fn payload_only() -> Self {
        Self {
            index: false,
            disabled: false,
            negate: false,
            state: false,
            alias: false,
        }
    }

    /// Sets whether `meta.negate` is compared.
    #[must_use]
    pub const fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Sets whether `meta.disabled` is compared.
    #[must_use]
    pub const fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Sets whether `meta.alias` is compared.
    #[must_use]
    pub const fn with_alias(mut self, alias: bool) -> Self {
        self.alias = alias;
        self
    }

    /// Sets whether `meta.index` is compared.
    #[must_use]
    pub const fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    /// Sets whether `$state.store` is compared.
    #[must_use]
    pub const fn with_state(mut self, state: bool) -> Self {
        self.state = state;
        self
    }
}

impl Default for FilterCompareOptions {
    fn default() -> Self {
        Self::compare_all()
    }
}

/// Returns true if two filters are the same under `options`.
#[must_use]
pub fn compare_filters(first: &Filter, second: &Filter, options: &FilterCompareOptions) -> bool {
    let same_predicate = first.kind() == second.kind()
        && first.meta.key == second.meta.key
        && first.meta.value == second.meta.value
        && first.query == second.query;
    if !same_predicate {
        return false;
    }

    (!options.index || first.meta.index == second.meta.index)
        && (!options.disabled || first.meta.disabled == second.meta.disabled)
        && (!options.negate || first.meta.negate == second.meta.negate)
        && (!options.alias || first.meta.alias == second.meta.alias)
        && (!options.state || store_of(first) == store_of(second))
}

fn store_of(filter: &Filter) -> Option<crate::types::FilterStore> {
    filter.state.map(|state| state.store)
}

/// Returns true if both lists hold the same filters, ignoring order.
///
/// Duplicates count: every filter of `first` is paired with a distinct
/// filter of `second`.
#[must_use]
pub fn compare_filter_lists(
    first: &[Filter],
    second: &[Filter],
    options: &FilterCompareOptions,
) -> bool {
    if first.len() != second.len() {
        return false;
    }

    let mut used = vec![false; second.len()];
    first.iter().all(|filter| {
        let matched = second
            .iter()
            .enumerate()
            .position(|(index, candidate)| !used[index] && compare_filters(filter, candidate, options));
        matched.is_some_and(|index| {
            used[index] = true;
            true
        })
    })
}

/// Returns the filters of `incoming` that have no match in `existing`.
///
/// `incoming` may be a single filter or a list.
#[must_use]
pub fn dedup_filters(
    existing: &[Filter],
    incoming: impl Into<OneOrMany<Filter>>,
    options: &FilterCompareOptions,
) -> Vec<Filter> {
    incoming
        .into()
        .into_vec()
        .into_iter()
        .filter(|candidate| {
            !existing
                .iter()
                .any(|filter| compare_filters(filter, candidate, options))
        })
        .collect()
}

/// Removes duplicates, keeping the first occurrence of each filter in order.
#[must_use]
pub fn uniq_filters(filters: &[Filter], options: &FilterCompareOptions) -> Vec<Filter> {
    filters.iter().fold(Vec::new(), |mut unique, filter| {
        let fresh = dedup_filters(&unique, filter.clone(), options);
        unique.extend(fresh);
        unique
    })
}

/// Returns true if the enabled filters of both lists are the same.
///
/// Disabled filters are stripped from both sides first, so adding, removing
/// or editing a disabled filter is not a change. `options` defaults to
/// [`COMPARE_ALL_OPTIONS`].
#[must_use]
pub fn only_disabled_filters_changed(
    new_filters: &[Filter],
    old_filters: &[Filter],
    options: Option<&FilterCompareOptions>,
) -> bool {
    let enabled = |filters: &[Filter]| -> Vec<Filter> {
        filters
            .iter()
            .filter(|filter| !filter.is_disabled())
            .cloned()
            .collect()
    };

    compare_filter_lists(
        &enabled(old_filters),
        &enabled(new_filters),
        options.unwrap_or(&COMPARE_ALL_OPTIONS),
    )
}

/// Returns true if a filter applies to a data view.
///
/// Filters without a key, and any filter when no data view is given, always
/// match. Custom filters may reference several fields, so they match on the
/// data view id instead of field membership.
#[must_use]
pub fn filter_matches_index(filter: &Filter, data_view: Option<&DataView>) -> bool {
    let (Some(key), Some(data_view)) = (filter.meta.key.as_deref(), data_view) else {
        return true;
    };

    if filter.kind() == Some(FilterKind::Custom) {
        return filter.meta.index.as_deref() == Some(data_view.id.as_str());
    }

    data_view.has_field(key)
}

//! Translation of a filter bar into an Elasticsearch `bool` query.

use serde_json::Value;
use tracing::debug;

use crate::compare::filter_matches_index;
use crate::config::RequestBodyConfig;
use crate::types::{DataView, Filter};

/// Builds the `bool` query applying a list of filters.
///
/// Disabled filters and filters without a payload are skipped. Negated
/// filters go to `must_not`, the rest to `filter`. When the configuration
/// asks for it, filters whose field is missing from `data_view` are dropped.
#[must_use]
pub fn build_query_from_filters(
    filters: &[Filter],
    data_view: Option<&DataView>,
    config: &RequestBodyConfig,
) -> Value {
    let mut filter_clauses = Vec::new();
    let mut must_not_clauses = Vec::new();

    for filter in filters.iter().filter(|filter| !filter.is_disabled()) {
        if config.ignore_filters_not_in_index && !filter_matches_index(filter, data_view) {
            debug!(
                key = ?filter.meta.key,
                "Skipping filter whose field is not in the data view"
            );
            continue;
        }

        let Some(clause) = filter.query.to_dsl() else {
            continue;
        };

        if filter.meta.negate {
            must_not_clauses.push(clause);
        } else {
            filter_clauses.push(clause);
        }
    }

    serde_json::json!({
        "bool": {
            "must": [],
            "filter": filter_clauses,
            "should": [],
            "must_not": must_not_clauses,
        }
    })
}

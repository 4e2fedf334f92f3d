//! Normalization of partially built visual queries.
//!
//! Editors hand over whatever JSON they currently hold. Normalizing turns it
//! into a complete [`VisualQuery`]: missing sequences become empty, entries
//! that do not decode are dropped, and nested queries are cut off at
//! [`QueryConfig::max_depth`].

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::operations::OperationRegistry;
use crate::types::{
    BinaryOperator, BinaryQuery, LabelFilter, Operation, OperationParam, VectorMatching,
    VisualQuery,
};

/// Normalizes an editor value into a complete visual query.
///
/// Never fails and is idempotent: normalizing the serialized result again
/// yields an equal query. A non-empty `metric` is always kept.
#[must_use]
pub fn normalize_default_value(value: &Value, config: &QueryConfig) -> VisualQuery {
    normalize_at(value, 1, config)
}

/// Completes every known operation with the declared defaults of the
/// parameters it leaves out, recursively through binary queries.
///
/// A comparison stored as `[50]` becomes `[50, false]`, the form parsing
/// produces. Unknown ids and raw queries are left as they are.
#[must_use]
pub fn fill_default_params(query: &VisualQuery, registry: &OperationRegistry) -> VisualQuery {
    if query.is_raw() {
        return query.clone();
    }

    VisualQuery {
        operations: query
            .operations
            .iter()
            .map(|operation| {
                registry
                    .get(&operation.id)
                    .map_or_else(|| operation.clone(), |def| def.complete(operation))
            })
            .collect(),
        binary_queries: query
            .binary_queries
            .iter()
            .map(|binary| BinaryQuery {
                query: fill_default_params(&binary.query, registry),
                ..binary.clone()
            })
            .collect(),
        ..query.clone()
    }
}

fn normalize_at(value: &Value, depth: usize, config: &QueryConfig) -> VisualQuery {
    let Some(object) = value.as_object() else {
        if !value.is_null() {
            debug!("visual query value is not an object, using an empty query");
        }
        return VisualQuery::default();
    };

    VisualQuery {
        metric: string_field(object, "metric"),
        labels: labels(object),
        operations: operations(object),
        binary_queries: binary_queries(object, depth, config),
        raw: string_field(object, "raw"),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn entries<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn labels(object: &Map<String, Value>) -> Vec<LabelFilter> {
    entries(object, "labels")
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(label) => Some(label),
            Err(err) => {
                debug!(error = %err, "dropping malformed label filter");
                None
            }
        })
        .collect()
}

fn operations(object: &Map<String, Value>) -> Vec<Operation> {
    entries(object, "operations")
        .iter()
        .filter_map(|entry| {
            let Some(id) = entry.get("id").and_then(Value::as_str) else {
                debug!("dropping operation without an id");
                return None;
            };
            let params = entry
                .get("params")
                .and_then(Value::as_array)
                .map(|params| {
                    params
                        .iter()
                        .filter_map(|param| serde_json::from_value::<OperationParam>(param.clone()).ok())
                        .collect()
                })
                .unwrap_or_default();
            Some(Operation {
                id: id.to_string(),
                params,
            })
        })
        .collect()
}

fn binary_queries(object: &Map<String, Value>, depth: usize, config: &QueryConfig) -> Vec<BinaryQuery> {
    let entries = entries(object, "binaryQueries");
    if entries.is_empty() {
        return Vec::new();
    }
    if depth + 1 > config.max_depth {
        warn!(
            max_depth = config.max_depth,
            dropped = entries.len(),
            "dropping binary queries nested past the depth limit"
        );
        return Vec::new();
    }

    entries
        .iter()
        .filter_map(|entry| {
            let operator = entry
                .get("operator")
                .and_then(Value::as_str)
                .and_then(BinaryOperator::from_symbol);
            let Some(operator) = operator else {
                debug!("dropping binary query without a valid operator");
                return None;
            };
            let vector_matching = entry
                .get("vectorMatching")
                .filter(|matching| !matching.is_null())
                .and_then(|matching| serde_json::from_value::<VectorMatching>(matching.clone()).ok());

            Some(BinaryQuery {
                operator,
                return_bool: entry
                    .get("returnBool")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                vector_matching,
                query: normalize_at(entry.get("query").unwrap_or(&Value::Null), depth + 1, config),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabelOperator;
    use serde_json::json;

    fn normalize(value: &Value) -> VisualQuery {
        normalize_default_value(value, &QueryConfig::default())
    }

    #[test]
    fn fills_missing_sequences() {
        let query = normalize(&json!({"metric": "up"}));
        assert_eq!(query, VisualQuery::new("up"));
        assert!(query.labels.is_empty());
        assert!(query.operations.is_empty());
    }

    #[test]
    fn non_objects_become_empty_queries() {
        assert_eq!(normalize(&Value::Null), VisualQuery::default());
        assert_eq!(normalize(&json!([1, 2])), VisualQuery::default());
    }

    #[test]
    fn keeps_well_formed_entries() {
        let query = normalize(&json!({
            "metric": "http_requests_total",
            "labels": [
                {"label": "job", "op": "=", "value": "api"},
                {"label": "code", "op": "=~", "value": "5.."}
            ],
            "operations": [
                {"id": "rate", "params": ["5m"]},
                {"id": "sum_by", "params": ["job"]}
            ]
        }));

        assert_eq!(query.labels.len(), 2);
        assert_eq!(query.labels[1].op, LabelOperator::RegexMatch);
        assert_eq!(
            query.operations,
            vec![
                Operation::new("rate").with_param("5m"),
                Operation::new("sum_by").with_param("job"),
            ]
        );
    }

    #[test]
    fn drops_malformed_entries() {
        let query = normalize(&json!({
            "metric": "up",
            "labels": [{"label": "job"}, "junk", {"label": "a", "op": "=", "value": "b"}],
            "operations": [{"params": [1]}, {"id": "round"}, {"id": "clamp", "params": [0, null, 1]}],
            "binaryQueries": [{"operator": "??", "query": {}}]
        }));

        assert_eq!(query.labels, vec![LabelFilter::equal("a", "b")]);
        assert_eq!(
            query.operations,
            vec![
                Operation::new("round"),
                Operation::new("clamp").with_param(0.0).with_param(1.0),
            ]
        );
        assert!(query.binary_queries.is_empty());
    }

    #[test]
    fn normalizes_nested_queries() {
        let query = normalize(&json!({
            "metric": "errors",
            "binaryQueries": [{
                "operator": "/",
                "returnBool": false,
                "vectorMatching": {"kind": "on", "labels": ["job"]},
                "query": {"metric": "requests"}
            }]
        }));

        assert_eq!(
            query.binary_queries,
            vec![BinaryQuery::new(BinaryOperator::Divide, VisualQuery::new("requests"))
                .with_vector_matching(VectorMatching::on(["job"]))]
        );
    }

    #[test]
    fn nesting_is_capped() {
        let mut value = json!({"metric": "leaf"});
        for _ in 0..40 {
            value = json!({"metric": "m", "binaryQueries": [{"operator": "+", "query": value}]});
        }

        let config = QueryConfig::default().with_max_depth(4);
        let query = normalize_default_value(&value, &config);
        assert_eq!(query.depth(), 4);
    }

    #[test]
    fn idempotent() {
        let value = json!({
            "metric": "up",
            "labels": [{"label": "job", "op": "!=", "value": "x"}, 7],
            "operations": [{"id": "topk", "params": [5]}],
            "binaryQueries": [{"operator": ">", "returnBool": true, "query": {"labels": []}}]
        });

        let once = normalize(&value);
        let again = normalize(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, again);
    }

    #[test]
    fn defaults_fill_trailing_params() {
        let registry = OperationRegistry::standard();
        let query = normalize(&json!({
            "metric": "x",
            "operations": [{"id": "greater_than", "params": [50]}, {"id": "mystery"}],
            "binaryQueries": [{
                "operator": "*",
                "query": {"metric": "y", "operations": [{"id": "rate"}]}
            }]
        }));

        let filled = fill_default_params(&query, &registry);
        assert_eq!(
            filled.operations,
            vec![
                Operation::new("greater_than").with_param(50.0).with_param(false),
                Operation::new("mystery"),
            ]
        );
        assert_eq!(
            filled.binary_queries[0].query.operations,
            vec![Operation::new("rate").with_param("$__rate_interval")]
        );
        assert_eq!(fill_default_params(&filled, &registry), filled);
    }

    #[test]
    fn raw_text_is_kept() {
        let query = normalize(&json!({"raw": "up offset 5m"}));
        assert!(query.is_raw());
    }
}

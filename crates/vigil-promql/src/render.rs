//! Rendering of visual queries to PromQL text.
//!
//! Rendering is total: unknown operation ids become a visible placeholder and
//! nesting past [`QueryConfig::max_depth`] becomes the depth-limit
//! placeholder, so a partially invalid query still displays.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::config::QueryConfig;
use crate::operations::{Grouping, OperationRegistry, RenderKind};
use crate::types::{
    BinaryOperator, LabelFilter, Operation, OperationParam, VectorMatching, VisualQuery,
};

static METRIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").unwrap_or_else(|_| unreachable!()));

/// Words that cannot start a vector selector.
pub(crate) const KEYWORDS: &[&str] = &[
    "and",
    "or",
    "unless",
    "atan2",
    "by",
    "without",
    "on",
    "ignoring",
    "group_left",
    "group_right",
    "bool",
    "offset",
];

/// Returns true if `name` can be written as a bare metric selector.
///
/// Aggregation names are excluded because `sum (x)` would read as a call.
#[must_use]
pub fn is_valid_metric_name(name: &str, registry: &OperationRegistry) -> bool {
    METRIC_NAME.is_match(name)
        && !KEYWORDS.contains(&name)
        && !name.eq_ignore_ascii_case("inf")
        && !name.eq_ignore_ascii_case("nan")
        && !registry.is_aggregation(name)
}

/// Renders a query to PromQL text.
#[must_use]
pub fn render(query: &VisualQuery, registry: &OperationRegistry, config: &QueryConfig) -> String {
    Renderer { registry, config }.query(query, 1).text
}

/// Renders label matchers as `{label="value", ...}` in the given order.
///
/// Returns an empty string for an empty list.
#[must_use]
pub fn render_labels(labels: &[LabelFilter]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let matchers: Vec<String> = labels
        .iter()
        .map(|filter| format!("{}{}{}", filter.label, filter.op, quote(&filter.value)))
        .collect();
    format!("{{{}}}", matchers.join(", "))
}

/// Quotes a string literal, escaping backslashes, quotes and control characters.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() && value.is_sign_positive() {
        "+Inf".to_string()
    } else if value.is_infinite() {
        "-Inf".to_string()
    } else {
        format!("{value}")
    }
}

/// A rendered fragment and the precedence of its outermost operator;
/// `None` for atoms (selectors and calls).
#[derive(Debug, Clone)]
struct Rendered {
    text: String,
    precedence: Option<u8>,
}

impl Rendered {
    const fn atom(text: String) -> Self {
        Self {
            text,
            precedence: None,
        }
    }

    fn wrapped_if(&self, wrap: bool) -> String {
        if wrap {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }
}

struct Renderer<'a> {
    registry: &'a OperationRegistry,
    config: &'a QueryConfig,
}

impl Renderer<'_> {
    fn query(&self, query: &VisualQuery, depth: usize) -> Rendered {
        if depth > self.config.max_depth {
            warn!(max_depth = self.config.max_depth, "query nesting exceeds depth limit");
            return Rendered::atom(self.config.depth_limit_placeholder.clone());
        }
        if let Some(raw) = &query.raw {
            // Opaque text: parenthesize whenever it is an operand.
            return Rendered {
                text: raw.clone(),
                precedence: Some(0),
            };
        }

        let mut current = self.selector(query);
        for operation in &query.operations {
            current = self.operation(operation, current);
        }
        for binary in &query.binary_queries {
            let rhs = self.query(&binary.query, depth + 1);
            current = infix(
                &current,
                binary.operator,
                binary.return_bool,
                binary.vector_matching.as_ref(),
                &rhs,
            );
        }
        current
    }

    fn selector(&self, query: &VisualQuery) -> Rendered {
        let metric = query.metric.as_deref().unwrap_or_default();
        if metric.is_empty() || is_valid_metric_name(metric, self.registry) {
            return Rendered::atom(format!("{metric}{}", render_labels(&query.labels)));
        }

        let mut labels = Vec::with_capacity(query.labels.len() + 1);
        labels.push(LabelFilter::equal("__name__", metric));
        labels.extend(query.labels.iter().cloned());
        Rendered::atom(render_labels(&labels))
    }

    fn operation(&self, operation: &Operation, inner: Rendered) -> Rendered {
        let Some(def) = self.registry.get(&operation.id) else {
            warn!(id = %operation.id, "rendering unknown operation as placeholder");
            return Rendered::atom(format!(
                "<{}:{}>({})",
                self.config.unknown_operation_marker, operation.id, inner.text
            ));
        };
        let name = def.function.as_str();
        let params = &operation.params;

        match def.render {
            RenderKind::RangeFunction => {
                let range = params.first().map(param_raw).unwrap_or_default();
                let selector = inner.wrapped_if(inner.precedence.is_some());
                let mut args: Vec<String> = params.iter().skip(1).map(param_literal).collect();
                args.push(format!("{selector}[{range}]"));
                Rendered::atom(format!("{name}({})", args.join(", ")))
            }
            RenderKind::Function => {
                let args: Vec<String> = std::iter::once(inner.text)
                    .chain(params.iter().map(param_literal))
                    .collect();
                Rendered::atom(format!("{name}({})", args.join(", ")))
            }
            RenderKind::FunctionParamsFirst => {
                let args: Vec<String> = params
                    .iter()
                    .map(param_literal)
                    .chain(std::iter::once(inner.text))
                    .collect();
                Rendered::atom(format!("{name}({})", args.join(", ")))
            }
            RenderKind::Aggregation {
                grouping,
                leading_param,
            } => {
                let (leading, labels) = match params.split_first() {
                    Some((first, rest)) if leading_param => (Some(first), rest),
                    _ => (None, params.as_slice()),
                };
                let args: Vec<String> = leading
                    .map(param_literal)
                    .into_iter()
                    .chain(std::iter::once(inner.text))
                    .collect();
                let args = args.join(", ");

                match grouping {
                    Grouping::None => Rendered::atom(format!("{name}({args})")),
                    Grouping::By | Grouping::Without => {
                        let labels: Vec<String> = labels.iter().map(param_raw).collect();
                        let keyword = grouping.keyword().unwrap_or_default();
                        Rendered::atom(format!("{name} {keyword}({}) ({args})", labels.join(", ")))
                    }
                }
            }
            RenderKind::BinaryScalar { operator } => {
                let value = params
                    .first()
                    .or_else(|| def.params.first().and_then(|param| param.default.as_ref()))
                    .map_or_else(|| "0".to_string(), param_literal);
                let return_bool =
                    operator.is_comparison() && params.get(1) == Some(&OperationParam::Bool(true));
                infix(&inner, operator, return_bool, None, &Rendered::atom(value))
            }
        }
    }
}

fn infix(
    lhs: &Rendered,
    operator: BinaryOperator,
    return_bool: bool,
    matching: Option<&VectorMatching>,
    rhs: &Rendered,
) -> Rendered {
    let precedence = operator.precedence();
    let wrap_lhs = lhs.precedence.is_some_and(|inner| {
        inner < precedence || (inner == precedence && operator.is_right_associative())
    });

    let mut text = format!("{} {operator}", lhs.wrapped_if(wrap_lhs));
    if return_bool {
        text.push_str(" bool");
    }
    if let Some(matching) = matching {
        let _ = write!(
            text,
            " {}({})",
            matching.kind.as_str(),
            matching.labels.join(", ")
        );
    }
    text.push(' ');
    text.push_str(&rhs.wrapped_if(rhs.precedence.is_some()));

    Rendered {
        text,
        precedence: Some(precedence),
    }
}

/// A parameter written as a literal argument: numbers bare, strings quoted.
fn param_literal(param: &OperationParam) -> String {
    match param {
        OperationParam::Number(n) => format_number(*n),
        OperationParam::String(s) => quote(s),
        OperationParam::Bool(b) => b.to_string(),
    }
}

/// A parameter written verbatim: ranges and label names.
fn param_raw(param: &OperationParam) -> String {
    match param {
        OperationParam::String(s) => s.clone(),
        OperationParam::Number(n) => format_number(*n),
        OperationParam::Bool(b) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BinaryQuery, LabelOperator};
    use test_case::test_case;

    fn render_std(query: &VisualQuery) -> String {
        render(query, &OperationRegistry::standard(), &QueryConfig::default())
    }

    fn op(id: &str) -> Operation {
        Operation::new(id)
    }

    mod selector_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn empty_query_renders_empty() {
            assert_eq!(render_std(&VisualQuery::default()), "");
        }

        #[test]
        fn metric_and_labels_in_stored_order() {
            let query = VisualQuery::new("http_requests_total")
                .with_label(LabelFilter::equal("job", "api"))
                .with_label(LabelFilter::new("code", LabelOperator::RegexMatch, "5.."))
                .with_label(LabelFilter::new("env", LabelOperator::NotEqual, "dev"));
            assert_eq!(
                render_std(&query),
                r#"http_requests_total{job="api", code=~"5..", env!="dev"}"#
            );
        }

        #[test]
        fn labels_without_metric() {
            let query = VisualQuery::default().with_label(LabelFilter::equal("job", "api"));
            assert_eq!(render_std(&query), r#"{job="api"}"#);
        }

        #[test]
        fn label_values_are_escaped() {
            let query = VisualQuery::new("up").with_label(LabelFilter::new(
                "path",
                LabelOperator::RegexMatch,
                "a\\.b\"c\n",
            ));
            assert_eq!(render_std(&query), r#"up{path=~"a\\.b\"c\n"}"#);
        }

        #[test_case("node.cpu.seconds" ; "dotted name")]
        #[test_case("sum" ; "aggregation name")]
        #[test_case("on" ; "keyword")]
        fn invalid_metric_names_use_name_matcher(metric: &str) {
            let query = VisualQuery::new(metric).with_label(LabelFilter::equal("job", "api"));
            assert_eq!(
                render_std(&query),
                format!(r#"{{__name__="{metric}", job="api"}}"#)
            );
        }
    }

    mod operation_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn range_function() {
            let query = VisualQuery::new("http_requests_total")
                .with_operation(op("rate").with_param("5m"));
            assert_eq!(render_std(&query), "rate(http_requests_total[5m])");
        }

        #[test]
        fn range_function_with_extra_param() {
            let query = VisualQuery::new("latency")
                .with_operation(op("quantile_over_time").with_param("1h").with_param(0.99));
            assert_eq!(render_std(&query), "quantile_over_time(0.99, latency[1h])");
        }

        #[test]
        fn function_with_trailing_params() {
            let query = VisualQuery::new("x")
                .with_operation(op("clamp").with_param(0.0).with_param(1.5))
                .with_operation(op("label_replace")
                    .with_param("dst")
                    .with_param("$1")
                    .with_param("src")
                    .with_param("(.*)"));
            assert_eq!(
                render_std(&query),
                r#"label_replace(clamp(x, 0, 1.5), "dst", "$1", "src", "(.*)")"#
            );
        }

        #[test]
        fn function_with_params_first() {
            let query = VisualQuery::new("bucket")
                .with_operation(op("rate").with_param("$__rate_interval"))
                .with_operation(op("sum_by").with_param("le"))
                .with_operation(op("histogram_quantile").with_param(0.9));
            assert_eq!(
                render_std(&query),
                "histogram_quantile(0.9, sum by(le) (rate(bucket[$__rate_interval])))"
            );
        }

        #[test_case("sum", vec![], "sum(x)")]
        #[test_case("sum_by", vec!["job".into(), "instance".into()], "sum by(job, instance) (x)")]
        #[test_case("avg_without", vec!["pod".into()], "avg without(pod) (x)")]
        #[test_case("topk", vec![5.0.into()], "topk(5, x)")]
        #[test_case("topk_by", vec![3.0.into(), "job".into()], "topk by(job) (3, x)")]
        #[test_case("count_values", vec!["version".into()], r#"count_values("version", x)"#)]
        fn aggregations(id: &str, params: Vec<OperationParam>, expected: &str) {
            let query = VisualQuery::new("x").with_operation(Operation {
                id: id.to_string(),
                params,
            });
            assert_eq!(render_std(&query), expected);
        }

        #[test]
        fn binary_scalar_and_bool() {
            let query = VisualQuery::new("x")
                .with_operation(op("multiply").with_param(100.0))
                .with_operation(op("greater_than").with_param(50.0).with_param(true));
            assert_eq!(render_std(&query), "x * 100 > bool 50");
        }

        #[test]
        fn lower_precedence_inner_is_parenthesized() {
            let query = VisualQuery::new("x")
                .with_operation(op("addition").with_param(1.0))
                .with_operation(op("multiply").with_param(2.0));
            assert_eq!(render_std(&query), "(x + 1) * 2");
        }

        #[test]
        fn power_is_right_associative() {
            let query = VisualQuery::new("x")
                .with_operation(op("exponent").with_param(2.0))
                .with_operation(op("exponent").with_param(3.0));
            assert_eq!(render_std(&query), "(x ^ 2) ^ 3");
        }

        #[test]
        fn unknown_operation_renders_placeholder() {
            let query = VisualQuery::new("x")
                .with_operation(op("rate").with_param("5m"))
                .with_operation(op("frobnicate"))
                .with_operation(op("abs"));
            assert_eq!(render_std(&query), "abs(<unknown:frobnicate>(rate(x[5m])))");
        }

        #[test]
        fn unknown_operation_marker_is_configurable() {
            let config = QueryConfig::default().with_unknown_operation_marker("missing");
            let query = VisualQuery::new("x").with_operation(op("frobnicate"));
            assert_eq!(
                render(&query, &OperationRegistry::standard(), &config),
                "<missing:frobnicate>(x)"
            );
        }

        #[test]
        fn custom_registry() {
            let registry = OperationRegistry::new();
            let query = VisualQuery::new("x").with_operation(op("abs"));
            assert_eq!(
                render(&query, &registry, &QueryConfig::default()),
                "<unknown:abs>(x)"
            );
        }
    }

    mod binary_query_tests {
        use super::*;

        #[test]
        fn binary_query_with_matching() {
            let query = VisualQuery::new("errors").with_binary_query(
                BinaryQuery::new(BinaryOperator::Divide, VisualQuery::new("requests"))
                    .with_vector_matching(VectorMatching::on(["job"])),
            );
            assert_eq!(render_std(&query), "errors / on(job) requests");
        }

        #[test]
        fn binary_queries_left_associate() {
            let query = VisualQuery::new("a")
                .with_binary_query(BinaryQuery::new(BinaryOperator::Add, VisualQuery::new("b")))
                .with_binary_query(BinaryQuery::new(BinaryOperator::Multiply, VisualQuery::new("c")))
                .with_binary_query(BinaryQuery::new(BinaryOperator::Multiply, VisualQuery::new("d")));
            assert_eq!(render_std(&query), "(a + b) * c * d");
        }

        #[test]
        fn nested_binary_right_operand_is_parenthesized() {
            let inner = VisualQuery::new("b")
                .with_binary_query(BinaryQuery::new(BinaryOperator::Multiply, VisualQuery::new("c")));
            let query = VisualQuery::new("a")
                .with_binary_query(BinaryQuery::new(BinaryOperator::Add, inner))
                .with_binary_query(
                    BinaryQuery::new(BinaryOperator::GreaterThan, VisualQuery::new("d"))
                        .with_return_bool(true)
                        .with_vector_matching(VectorMatching::ignoring(["pod", "node"])),
                );
            assert_eq!(
                render_std(&query),
                "a + (b * c) > bool ignoring(pod, node) d"
            );
        }

        #[test]
        fn depth_limit_renders_placeholder() {
            let config = QueryConfig::default().with_max_depth(2);
            let deepest = VisualQuery::new("c");
            let middle = VisualQuery::new("b")
                .with_binary_query(BinaryQuery::new(BinaryOperator::Add, deepest));
            let query = VisualQuery::new("a")
                .with_binary_query(BinaryQuery::new(BinaryOperator::Add, middle));
            assert_eq!(
                render(&query, &OperationRegistry::standard(), &config),
                "a + (b + <depth limit>)"
            );
        }
    }

    #[test]
    fn raw_query_is_echoed() {
        assert_eq!(render_std(&VisualQuery::raw("up offset 5m")), "up offset 5m");
        let query = VisualQuery::new("a")
            .with_binary_query(BinaryQuery::new(BinaryOperator::Add, VisualQuery::raw("b @ 10")));
        assert_eq!(render_std(&query), "a + (b @ 10)");
    }

    #[test_case(5.0, "5")]
    #[test_case(0.25, "0.25")]
    #[test_case(-3.5, "-3.5")]
    #[test_case(f64::INFINITY, "+Inf")]
    #[test_case(f64::NAN, "NaN")]
    fn numbers(value: f64, expected: &str) {
        assert_eq!(format_number(value), expected);
    }
}

//! Parsing of PromQL text back into a visual query.
//!
//! Parsing runs in two passes: a nom grammar produces an expression tree,
//! which is then mapped onto the operation registry. Only expressions the
//! registry can express come back as structured queries:
//!
//! - selectors, with label matchers
//! - range functions over a range selector
//! - registry functions and aggregations, with prefix or postfix `by`/`without`
//! - binary operators with a number on the right, as scalar operations
//! - binary operators between two queries, with `bool`, `on(...)` and
//!   `ignoring(...)`
//!
//! Everything else (offsets, `@`, subqueries, `group_left`, unary minus,
//! unknown functions) is rejected by [`try_parse`] and kept as raw text by
//! [`parse`].

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, one_of},
    combinator::{map, opt, value},
    error::{Error, ErrorKind},
    multi::separated_list0,
    number::complete::double,
    sequence::{delimited, preceded},
    IResult, Parser,
};
use tracing::debug;

use crate::config::QueryConfig;
use crate::error::{QueryError, Result};
use crate::operations::{Grouping, OperationRegistry, RenderKind};
use crate::render::KEYWORDS;
use crate::types::{
    BinaryOperator, BinaryQuery, LabelFilter, LabelOperator, Operation, OperationParam,
    VectorMatching, VectorMatchingKind, VisualQuery,
};

/// Parses query text, falling back to a raw-mode query when the text has no
/// visual form. Never fails.
#[must_use]
pub fn parse(text: &str, registry: &OperationRegistry, config: &QueryConfig) -> VisualQuery {
    match try_parse(text, registry, config) {
        Ok(query) => query,
        Err(err) => {
            debug!(error = %err, "query cannot be edited visually, keeping raw text");
            VisualQuery::raw(text)
        }
    }
}

/// Parses query text into a structured visual query.
///
/// Blank text parses to an empty query.
///
/// # Errors
///
/// Returns an error if the text is not valid syntax, or if it is valid but
/// uses constructs the registry cannot express.
pub fn try_parse(
    text: &str,
    registry: &OperationRegistry,
    config: &QueryConfig,
) -> Result<VisualQuery> {
    let input = text.trim();
    if input.is_empty() {
        return Ok(VisualQuery::default());
    }

    let parser = ExprParser {
        registry,
        max_nesting: config.max_parse_nesting,
    };
    let (rest, expr) = parser
        .expr(input, 0, 0)
        .map_err(|err| syntax_error(input, err, config))?;

    let rest = rest.trim_start();
    if !rest.is_empty() {
        return Err(QueryError::TrailingInput {
            offset: input.len() - rest.len(),
            remaining: rest.trim_end().to_string(),
        });
    }

    Converter { registry, config }.query(expr, 1)
}

fn syntax_error(input: &str, err: nom::Err<Error<&str>>, config: &QueryConfig) -> QueryError {
    match err {
        nom::Err::Incomplete(_) => QueryError::Parse {
            offset: input.len(),
            reason: "incomplete input".to_string(),
        },
        nom::Err::Error(e) | nom::Err::Failure(e) if e.code == ErrorKind::TooLarge => {
            QueryError::NestingTooDeep {
                limit: config.max_parse_nesting,
            }
        }
        nom::Err::Error(e) | nom::Err::Failure(e) => QueryError::Parse {
            offset: input.len().saturating_sub(e.input.len()),
            reason: e.code.description().to_string(),
        },
    }
}

// ============================================================================
// Expression tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Str(String),
    Selector {
        metric: Option<String>,
        labels: Vec<LabelFilter>,
        range: Option<String>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Aggregate {
        name: String,
        grouping: Grouping,
        labels: Vec<String>,
        args: Vec<Expr>,
    },
    /// `first op rhs op rhs ...`, grouped from the left. Kept flat so long
    /// chains cost no recursion.
    Chain {
        first: Box<Expr>,
        steps: Vec<BinaryStep>,
    },
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
struct BinaryStep {
    operator: BinaryOperator,
    return_bool: bool,
    matching: Option<VectorMatching>,
    rhs: Expr,
}

// ============================================================================
// Expressions
// ============================================================================

struct ExprParser<'r> {
    registry: &'r OperationRegistry,
    max_nesting: usize,
}

impl ExprParser<'_> {
    /// Precedence climbing over binary operators. `^` is right-associative,
    /// every other operator groups to the left.
    fn expr<'a>(&self, input: &'a str, min_precedence: u8, depth: usize) -> IResult<&'a str, Expr> {
        let (mut input, first) = self.primary(input, depth)?;
        let mut steps = Vec::new();

        loop {
            let Ok((rest, operator)) = preceded(multispace0, parse_binary_operator).parse(input)
            else {
                break;
            };
            let precedence = operator.precedence();
            if precedence < min_precedence {
                break;
            }

            let (rest, return_bool) = opt(preceded(multispace0, keyword("bool"))).parse(rest)?;
            let (rest, matching) = opt(preceded(multispace0, parse_vector_matching)).parse(rest)?;
            let next_min = if operator.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let (rest, rhs) = self.expr(rest, next_min, depth + 1)?;

            steps.push(BinaryStep {
                operator,
                return_bool: return_bool.is_some(),
                matching,
                rhs,
            });
            input = rest;
        }

        if steps.is_empty() {
            return Ok((input, first));
        }
        Ok((
            input,
            Expr::Chain {
                first: Box::new(first),
                steps,
            },
        ))
    }

    fn primary<'a>(&self, input: &'a str, depth: usize) -> IResult<&'a str, Expr> {
        if depth > self.max_nesting {
            return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
        }
        let (input, _) = multispace0(input)?;

        if input.starts_with('(') {
            let (input, _) = char('(')(input)?;
            let (input, inner) = self.expr(input, 0, depth + 1)?;
            let (input, _) = multispace0(input)?;
            let (input, _) = char(')')(input)?;
            return Ok((input, Expr::Paren(Box::new(inner))));
        }
        if input.starts_with(['"', '\'']) {
            let (input, text) = parse_string(input)?;
            return Ok((input, Expr::Str(text)));
        }
        if let Ok((input, number)) = parse_number(input) {
            return Ok((input, Expr::Number(number)));
        }
        if input.starts_with('{') {
            return parse_selector(input, None);
        }

        let (rest, name) = parse_identifier(input)?;
        if KEYWORDS.contains(&name) {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }
        if name.eq_ignore_ascii_case("inf") {
            return Ok((rest, Expr::Number(f64::INFINITY)));
        }
        if name.eq_ignore_ascii_case("nan") {
            return Ok((rest, Expr::Number(f64::NAN)));
        }

        let after = rest.trim_start();
        if self.registry.is_aggregation(name) && (after.starts_with('(') || starts_with_grouping(after)) {
            return self.aggregate(rest, name, depth);
        }
        if after.starts_with('(') {
            let (rest, args) = self.arguments(rest, depth)?;
            return Ok((
                rest,
                Expr::Call {
                    name: name.to_string(),
                    args,
                },
            ));
        }
        parse_selector(rest, Some(name))
    }

    /// `name [by|without (labels)] (args) [by|without (labels)]`
    fn aggregate<'a>(&self, input: &'a str, name: &str, depth: usize) -> IResult<&'a str, Expr> {
        let (input, prefix) = opt(preceded(multispace0, parse_grouping)).parse(input)?;
        let (input, args) = self.arguments(input, depth)?;
        let (input, grouping) = match prefix {
            Some(grouping) => (input, Some(grouping)),
            None => opt(preceded(multispace0, parse_grouping)).parse(input)?,
        };
        let (grouping, labels) = grouping.unwrap_or_default();

        Ok((
            input,
            Expr::Aggregate {
                name: name.to_string(),
                grouping,
                labels,
                args,
            },
        ))
    }

    fn arguments<'a>(&self, input: &'a str, depth: usize) -> IResult<&'a str, Vec<Expr>> {
        let (input, _) = multispace0(input)?;
        let (input, _) = char('(')(input)?;
        let (input, args) = separated_list0((multispace0, char(',')), |arg: &'a str| {
            self.expr(arg, 0, depth + 1)
        })
        .parse(input)?;
        let (input, _) = multispace0(input)?;
        let (input, _) = char(')')(input)?;
        Ok((input, args))
    }
}

// ============================================================================
// Selectors
// ============================================================================

/// Parse the part of a selector after the metric name: `{labels}[range]`
fn parse_selector<'a>(input: &'a str, metric: Option<&str>) -> IResult<&'a str, Expr> {
    let (input, labels) = opt(preceded(multispace0, parse_label_matchers)).parse(input)?;
    if metric.is_none() && labels.is_none() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }
    let (input, range) = opt(parse_range).parse(input)?;

    Ok((
        input,
        Expr::Selector {
            metric: metric.map(str::to_string),
            labels: labels.unwrap_or_default(),
            range: range.map(str::to_string),
        },
    ))
}

/// Parse label matchers: {label1="value1", label2!="value2", label3=~"pattern",}
fn parse_label_matchers(input: &str) -> IResult<&str, Vec<LabelFilter>> {
    delimited(
        char('{'),
        separated_list0((multispace0, char(',')), parse_label_matcher),
        (opt((multispace0, char(','))), multispace0, char('}')),
    )
    .parse(input)
}

fn parse_label_matcher(input: &str) -> IResult<&str, LabelFilter> {
    let (input, _) = multispace0(input)?;
    let (input, label) = parse_label_name(input)?;
    let (input, _) = multispace0(input)?;
    let (input, op) = alt((
        value(LabelOperator::RegexMatch, tag("=~")),
        value(LabelOperator::RegexNotMatch, tag("!~")),
        value(LabelOperator::NotEqual, tag("!=")),
        value(LabelOperator::Equal, tag("=")),
    ))
    .parse(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_string(input)?;

    Ok((input, LabelFilter::new(label, op, value)))
}

/// Parse range: `[5m]`, `[$__rate_interval]`
fn parse_range(input: &str) -> IResult<&str, &str> {
    delimited(
        (multispace0, char('['), multispace0),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
        (multispace0, char(']')),
    )
    .parse(input)
}

// ============================================================================
// Modifiers
// ============================================================================

fn parse_binary_operator(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        value(BinaryOperator::Equal, tag("==")),
        value(BinaryOperator::NotEqual, tag("!=")),
        value(BinaryOperator::GreaterOrEqual, tag(">=")),
        value(BinaryOperator::LessOrEqual, tag("<=")),
        value(BinaryOperator::GreaterThan, tag(">")),
        value(BinaryOperator::LessThan, tag("<")),
        value(BinaryOperator::Add, tag("+")),
        value(BinaryOperator::Subtract, tag("-")),
        value(BinaryOperator::Multiply, tag("*")),
        value(BinaryOperator::Divide, tag("/")),
        value(BinaryOperator::Modulo, tag("%")),
        value(BinaryOperator::Power, tag("^")),
        value(BinaryOperator::Atan2, keyword("atan2")),
        value(BinaryOperator::And, keyword("and")),
        value(BinaryOperator::Or, keyword("or")),
        value(BinaryOperator::Unless, keyword("unless")),
    ))
    .parse(input)
}

/// Parse `on(labels)` / `ignoring(labels)`
fn parse_vector_matching(input: &str) -> IResult<&str, VectorMatching> {
    let (input, kind) = alt((
        value(VectorMatchingKind::On, keyword("on")),
        value(VectorMatchingKind::Ignoring, keyword("ignoring")),
    ))
    .parse(input)?;
    let (input, labels) = parse_label_list(input)?;
    Ok((input, VectorMatching { kind, labels }))
}

/// Parse `by(labels)` / `without(labels)`
fn parse_grouping(input: &str) -> IResult<&str, (Grouping, Vec<String>)> {
    let (input, grouping) = alt((
        value(Grouping::By, keyword("by")),
        value(Grouping::Without, keyword("without")),
    ))
    .parse(input)?;
    let (input, labels) = parse_label_list(input)?;
    Ok((input, (grouping, labels)))
}

fn starts_with_grouping(input: &str) -> bool {
    parse_grouping(input).is_ok()
}

/// Parse label list: `(job, instance)`
fn parse_label_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        (multispace0, char('(')),
        separated_list0(
            (multispace0, char(',')),
            preceded(multispace0, map(parse_label_name, String::from)),
        ),
        (multispace0, char(')')),
    )
    .parse(input)
}

// ============================================================================
// Tokens
// ============================================================================

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Parse metric or function name
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    let (rest, name) = take_while1(is_ident_char)(input)?;
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Alpha)));
    }
    Ok((rest, name))
}

/// Parse label name
fn parse_label_name(input: &str) -> IResult<&str, &str> {
    let (rest, name) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)?;
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Alpha)));
    }
    Ok((rest, name))
}

/// A word that must not run on into an identifier: `or` does not match `order`.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = tag(word)(input)?;
        if rest.starts_with(is_ident_char) {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }
        Ok((rest, matched))
    }
}

/// Parse number literal; `Inf` and `NaN` without a sign are identifiers.
fn parse_number(input: &str) -> IResult<&str, f64> {
    let numeric = input.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'));
    if !numeric {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Float)));
    }
    alt((parse_signed_inf, double)).parse(input)
}

fn parse_signed_inf(input: &str) -> IResult<&str, f64> {
    let (rest, sign) = one_of("+-")(input)?;
    let (rest, _) = tag_no_case("inf")(rest)?;
    if rest.starts_with(is_ident_char) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Float)));
    }
    let value = if sign == '-' {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };
    Ok((rest, value))
}

/// Parse a single- or double-quoted string with backslash escapes.
fn parse_string(input: &str) -> IResult<&str, String> {
    let mut chars = input.char_indices();
    let Some(quote) = chars.next().map(|(_, c)| c).filter(|c| matches!(c, '"' | '\'')) else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    };

    let mut out = String::new();
    let mut escaped = false;
    for (index, c) in chars {
        if escaped {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((&input[index + c.len_utf8()..], out));
        } else {
            out.push(c);
        }
    }

    // Unterminated literal.
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

// ============================================================================
// Expression tree to visual query
// ============================================================================

struct Converter<'r> {
    registry: &'r OperationRegistry,
    config: &'r QueryConfig,
}

impl Converter<'_> {
    fn query(&self, expr: Expr, depth: usize) -> Result<VisualQuery> {
        match expr {
            Expr::Paren(inner) => self.query(*inner, depth),
            Expr::Selector {
                metric,
                labels,
                range: None,
            } => Ok(selector_query(metric, labels)),
            Expr::Selector { range: Some(_), .. } => Err(QueryError::unsupported(
                "range selector outside a range function",
            )),
            Expr::Number(_) | Expr::Str(_) => {
                Err(QueryError::unsupported("literal outside an operation"))
            }
            Expr::Call { name, args } => self.call(&name, args, depth),
            Expr::Aggregate {
                name,
                grouping,
                labels,
                args,
            } => self.aggregate(&name, grouping, labels, args, depth),
            Expr::Chain { first, steps } => {
                let mut query = self.query(*first, depth)?;
                for step in steps {
                    self.binary(&mut query, step, depth)?;
                }
                Ok(query)
            }
        }
    }

    /// The input of an operation; operations apply before binary queries, so
    /// an input that carries binary queries has no visual form.
    fn operand(&self, expr: Expr, depth: usize) -> Result<VisualQuery> {
        let query = self.query(expr, depth)?;
        if query.binary_queries.is_empty() {
            Ok(query)
        } else {
            Err(QueryError::unsupported(
                "operation applied to a binary expression between queries",
            ))
        }
    }

    fn call(&self, name: &str, mut args: Vec<Expr>, depth: usize) -> Result<VisualQuery> {
        let def = self
            .registry
            .find_function(name)
            .ok_or_else(|| QueryError::UnknownFunction {
                name: name.to_string(),
            })?;
        let id = def.id.clone();

        let (mut query, params) = match def.render {
            RenderKind::RangeFunction => {
                let Some(Expr::Selector {
                    metric,
                    labels,
                    range: Some(range),
                }) = args.pop()
                else {
                    return Err(QueryError::unsupported(format!(
                        "{name} expects a range selector as its last argument"
                    )));
                };
                let mut params = vec![OperationParam::String(range)];
                params.extend(literals(args)?);
                (selector_query(metric, labels), params)
            }
            RenderKind::Function => {
                if args.is_empty() {
                    return Err(QueryError::unsupported(format!("{name} expects an argument")));
                }
                let inner = args.remove(0);
                let params = literals(args)?;
                (self.operand(inner, depth)?, params)
            }
            RenderKind::FunctionParamsFirst => {
                let Some(inner) = args.pop() else {
                    return Err(QueryError::unsupported(format!("{name} expects an argument")));
                };
                let params = literals(args)?;
                (self.operand(inner, depth)?, params)
            }
            RenderKind::Aggregation { .. } | RenderKind::BinaryScalar { .. } => {
                return Err(QueryError::UnknownFunction {
                    name: name.to_string(),
                });
            }
        };

        query.operations.push(Operation { id, params });
        Ok(query)
    }

    fn aggregate(
        &self,
        name: &str,
        grouping: Grouping,
        labels: Vec<String>,
        mut args: Vec<Expr>,
        depth: usize,
    ) -> Result<VisualQuery> {
        let def = self
            .registry
            .find_aggregation(name, grouping)
            .ok_or_else(|| QueryError::UnknownFunction {
                name: name.to_string(),
            })?;
        let leading_param = matches!(
            def.render,
            RenderKind::Aggregation {
                leading_param: true,
                ..
            }
        );
        let expected = if leading_param { 2 } else { 1 };
        if args.len() != expected {
            return Err(QueryError::unsupported(format!(
                "{name} expects {expected} argument(s), got {}",
                args.len()
            )));
        }
        let id = def.id.clone();

        let Some(inner) = args.pop() else {
            return Err(QueryError::unsupported(format!("{name} expects an argument")));
        };
        let mut params = literals(args)?;
        params.extend(labels.into_iter().map(OperationParam::String));

        let mut query = self.operand(inner, depth)?;
        query.operations.push(Operation { id, params });
        Ok(query)
    }

    /// Applies one step of a binary chain to the query built so far.
    fn binary(&self, query: &mut VisualQuery, step: BinaryStep, depth: usize) -> Result<()> {
        let BinaryStep {
            operator,
            return_bool,
            matching,
            rhs,
        } = step;
        if return_bool && !operator.is_comparison() {
            return Err(QueryError::unsupported(format!(
                "bool modifier on non-comparison operator {operator}"
            )));
        }

        if let (Expr::Number(number), None) = (&rhs, &matching) {
            let def = self.registry.find_binary_scalar(operator).ok_or_else(|| {
                QueryError::unsupported(format!("{operator} with a number operand"))
            })?;
            if !query.binary_queries.is_empty() {
                return Err(QueryError::unsupported(
                    "operation applied to a binary expression between queries",
                ));
            }
            let mut params = vec![OperationParam::Number(*number)];
            if operator.is_comparison() {
                params.push(OperationParam::Bool(return_bool));
            }
            query.operations.push(Operation {
                id: def.id.clone(),
                params,
            });
            return Ok(());
        }

        if depth + 1 > self.config.max_depth {
            return Err(QueryError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        let right = self.query(rhs, depth + 1)?;
        query.binary_queries.push(BinaryQuery {
            operator,
            return_bool,
            vector_matching: matching,
            query: right,
        });
        Ok(())
    }
}

/// Builds a selector query, lifting a leading `__name__="..."` matcher into
/// the metric.
fn selector_query(metric: Option<String>, mut labels: Vec<LabelFilter>) -> VisualQuery {
    let metric = metric.or_else(|| {
        let named = labels
            .first()
            .is_some_and(|first| first.label == "__name__" && first.op == LabelOperator::Equal);
        named.then(|| labels.remove(0).value)
    });

    VisualQuery {
        metric,
        labels,
        ..VisualQuery::default()
    }
}

fn literals(args: Vec<Expr>) -> Result<Vec<OperationParam>> {
    args.into_iter()
        .map(|arg| match arg {
            Expr::Number(number) => Ok(OperationParam::Number(number)),
            Expr::Str(text) => Ok(OperationParam::String(text)),
            _ => Err(QueryError::unsupported("operation parameters must be literals")),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn registry() -> OperationRegistry {
        OperationRegistry::standard()
    }

    fn parse_std(text: &str) -> VisualQuery {
        parse(text, &registry(), &QueryConfig::default())
    }

    fn try_parse_std(text: &str) -> Result<VisualQuery> {
        try_parse(text, &registry(), &QueryConfig::default())
    }

    fn op(id: &str, params: Vec<OperationParam>) -> Operation {
        Operation {
            id: id.to_string(),
            params,
        }
    }

    mod token_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn strings_unescape() {
            assert_eq!(
                parse_string(r#""a\\.b\"c\n" rest"#),
                Ok((" rest", "a\\.b\"c\n".to_string()))
            );
            assert_eq!(parse_string("'it''s'"), Ok(("'s'", "it".to_string())));
        }

        #[test]
        fn unterminated_string_fails() {
            assert!(parse_string(r#""open"#).is_err());
        }

        #[test]
        fn keywords_need_a_boundary() {
            assert!(keyword("or")("or x").is_ok());
            assert!(keyword("or")("order").is_err());
        }

        #[test_case("42", 42.0)]
        #[test_case("0.25", 0.25)]
        #[test_case("-3", -3.0)]
        #[test_case(".5", 0.5)]
        #[test_case("1e3", 1000.0)]
        fn numbers(text: &str, expected: f64) {
            let (rest, number) = parse_number(text).unwrap();
            assert!(rest.is_empty());
            assert!((number - expected).abs() < f64::EPSILON);
        }

        #[test]
        fn signed_infinity() {
            assert_eq!(parse_number("-Inf").map(|(_, n)| n), Ok(f64::NEG_INFINITY));
            assert_eq!(parse_number("+inf").map(|(_, n)| n), Ok(f64::INFINITY));
            assert!(parse_number("x").is_err());
        }
    }

    mod selector_tests {
        use super::*;

        #[test]
        fn bare_metric() {
            assert_eq!(parse_std("up"), VisualQuery::new("up"));
        }

        #[test]
        fn metric_with_labels() {
            let query = parse_std(r#"http_requests_total{job="api", code=~"5..", env!='dev', x!~"y"}"#);
            assert_eq!(query.metric.as_deref(), Some("http_requests_total"));
            assert_eq!(
                query.labels,
                vec![
                    LabelFilter::equal("job", "api"),
                    LabelFilter::new("code", LabelOperator::RegexMatch, "5.."),
                    LabelFilter::new("env", LabelOperator::NotEqual, "dev"),
                    LabelFilter::new("x", LabelOperator::RegexNotMatch, "y"),
                ]
            );
        }

        #[test]
        fn labels_without_metric() {
            let query = parse_std(r#"{job="api"}"#);
            assert_eq!(query.metric, None);
            assert_eq!(query.labels, vec![LabelFilter::equal("job", "api")]);
        }

        #[test]
        fn name_matcher_becomes_metric() {
            let query = parse_std(r#"{__name__="node.cpu", mode="idle"}"#);
            assert_eq!(query.metric.as_deref(), Some("node.cpu"));
            assert_eq!(query.labels, vec![LabelFilter::equal("mode", "idle")]);
        }

        #[test]
        fn trailing_comma_in_matchers() {
            let query = parse_std(r#"up{job="api", }"#);
            assert!(!query.is_raw());
            assert_eq!(query.labels, vec![LabelFilter::equal("job", "api")]);
            assert!(parse_std(r#"up{job="api",,}"#).is_raw());
        }

        #[test]
        fn blank_text_is_an_empty_query() {
            assert_eq!(parse_std("   "), VisualQuery::default());
        }
    }

    mod operation_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn range_function() {
            let query = parse_std("rate(http_requests_total{job=\"api\"}[5m])");
            assert_eq!(query.labels.len(), 1);
            assert_eq!(query.operations, vec![op("rate", vec!["5m".into()])]);
        }

        #[test]
        fn range_function_with_extra_param() {
            let query = parse_std("quantile_over_time(0.99, latency[$__interval])");
            assert_eq!(
                query.operations,
                vec![op("quantile_over_time", vec!["$__interval".into(), 0.99.into()])]
            );
        }

        #[test]
        fn nested_pipeline() {
            let query = parse_std(
                "histogram_quantile(0.9, sum by (le) (rate(bucket[$__rate_interval])))",
            );
            assert_eq!(query.metric.as_deref(), Some("bucket"));
            assert_eq!(
                query.operations,
                vec![
                    op("rate", vec!["$__rate_interval".into()]),
                    op("sum_by", vec!["le".into()]),
                    op("histogram_quantile", vec![0.9.into()]),
                ]
            );
        }

        #[test_case("sum(x)", "sum", vec![])]
        #[test_case("sum by(job) (x)", "sum_by", vec!["job".into()])]
        #[test_case("sum(x) by (job, pod)", "sum_by", vec!["job".into(), "pod".into()])]
        #[test_case("max without(pod) (x)", "max_without", vec!["pod".into()])]
        #[test_case("topk(5, x)", "topk", vec![5.0.into()])]
        #[test_case("bottomk by(job) (3, x)", "bottomk_by", vec![3.0.into(), "job".into()])]
        #[test_case(r#"count_values("version", x)"#, "count_values", vec!["version".into()])]
        fn aggregations(text: &str, id: &str, params: Vec<OperationParam>) {
            assert_eq!(parse_std(text).operations, vec![op(id, params)]);
        }

        #[test]
        fn function_params() {
            let query = parse_std(r#"label_replace(clamp(x, 0, 1.5), "dst", "$1", "src", "(.*)")"#);
            assert_eq!(
                query.operations,
                vec![
                    op("clamp", vec![0.0.into(), 1.5.into()]),
                    op(
                        "label_replace",
                        vec!["dst".into(), "$1".into(), "src".into(), "(.*)".into()]
                    ),
                ]
            );
        }

        #[test]
        fn scalar_operations() {
            let query = parse_std("(x + 1) * 2 > bool 50");
            assert_eq!(
                query.operations,
                vec![
                    op("addition", vec![1.0.into()]),
                    op("multiply", vec![2.0.into()]),
                    op("greater_than", vec![50.0.into(), true.into()]),
                ]
            );
        }

        #[test]
        fn precedence_without_parentheses() {
            let query = parse_std("x * 100 + 1");
            let ids: Vec<&str> = query.operations.iter().map(|o| o.id.as_str()).collect();
            assert_eq!(ids, vec!["multiply", "addition"]);
        }

        #[test]
        fn power_groups_right() {
            let query = parse_std("x ^ 2 ^ 3");
            assert!(query.is_raw(), "2 ^ 3 is a literal expression");
            let grouped = parse_std("(x ^ 2) ^ 3");
            assert_eq!(grouped.operations.len(), 2);
        }
    }

    mod binary_query_tests {
        use super::*;

        #[test]
        fn binary_query_with_modifiers() {
            let query = parse_std("errors > bool on(job) requests");
            assert_eq!(query.metric.as_deref(), Some("errors"));
            assert_eq!(
                query.binary_queries,
                vec![BinaryQuery::new(BinaryOperator::GreaterThan, VisualQuery::new("requests"))
                    .with_return_bool(true)
                    .with_vector_matching(VectorMatching::on(["job"]))]
            );
        }

        #[test]
        fn chains_left_associate() {
            let query = parse_std("a / b unless ignoring(pod) c");
            let ops: Vec<BinaryOperator> =
                query.binary_queries.iter().map(|b| b.operator).collect();
            assert_eq!(ops, vec![BinaryOperator::Divide, BinaryOperator::Unless]);
        }

        #[test]
        fn parenthesized_right_operand_nests() {
            let query = parse_std("a + (b * c)");
            assert_eq!(query.binary_queries.len(), 1);
            assert_eq!(query.binary_queries[0].query.binary_queries.len(), 1);
        }

        #[test]
        fn scalar_on_query_with_operations() {
            let query = parse_std("a * 2 + b");
            assert_eq!(query.operations, vec![op("multiply", vec![2.0.into()])]);
            assert_eq!(query.binary_queries.len(), 1);
        }

        #[test]
        fn scalar_after_binary_query_is_unsupported() {
            assert!(matches!(
                try_parse_std("a + b * 2 - c > 1"),
                Err(QueryError::Unsupported { .. })
            ));
        }

        #[test]
        fn long_query_chain() {
            let text = vec!["a"; 10_000].join(" + ");
            let query = parse_std(&text);
            assert!(!query.is_raw());
            assert_eq!(query.binary_queries.len(), 9_999);
            assert_eq!(query.depth(), 2);
        }

        #[test]
        fn long_scalar_chain() {
            let text = format!("x{}", " + 1".repeat(10_000));
            let query = parse_std(&text);
            assert_eq!(query.metric.as_deref(), Some("x"));
            assert_eq!(query.operations.len(), 10_000);
            assert!(query.binary_queries.is_empty());
        }

        #[test]
        fn long_power_chain_hits_nesting_limit() {
            let text = vec!["a"; 10_000].join(" ^ ");
            assert!(matches!(
                try_parse_std(&text),
                Err(QueryError::NestingTooDeep { limit: 128 })
            ));
        }
    }

    mod raw_mode_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("up offset 5m" ; "offset modifier")]
        #[test_case("up @ 1609746000" ; "at modifier")]
        #[test_case("rate(up[5m:1m])" ; "subquery")]
        #[test_case("predict_linear(up[1h], 3600)" ; "unknown function")]
        #[test_case("sum(a + b)" ; "aggregation over binary expression")]
        #[test_case("(a + b) * 2" ; "scalar over binary expression")]
        #[test_case("a * on(job) group_left b" ; "group modifier")]
        #[test_case("-up" ; "unary minus")]
        #[test_case("1 + 2" ; "literal arithmetic")]
        #[test_case("up[5m]" ; "bare range selector")]
        #[test_case("a + bool b" ; "bool on arithmetic")]
        #[test_case(r#"up{job="api"#; "unterminated string")]
        #[test_case("abs(<unknown:x>(up))" ; "rendered placeholder")]
        fn unsupported_text_is_kept_raw(text: &str) {
            let query = parse_std(text);
            assert!(query.is_raw());
            assert_eq!(query.raw.as_deref(), Some(text));
        }

        #[test]
        fn errors_are_typed() {
            assert!(matches!(
                try_parse_std("predict_linear(up[1h], 3600)"),
                Err(QueryError::UnknownFunction { name }) if name == "predict_linear"
            ));
            assert!(matches!(
                try_parse_std("up offset 5m"),
                Err(QueryError::TrailingInput { offset: 3, .. })
            ));
            assert!(matches!(
                try_parse_std("sum(a + b)"),
                Err(QueryError::Unsupported { .. })
            ));
            assert!(matches!(try_parse_std("(up"), Err(QueryError::Parse { .. })));
        }

        #[test]
        fn nesting_limit() {
            let config = QueryConfig::default().with_max_parse_nesting(8);
            let text = format!("{}up{}", "(".repeat(20), ")".repeat(20));
            assert!(matches!(
                try_parse(&text, &registry(), &config),
                Err(QueryError::NestingTooDeep { limit: 8 })
            ));
            assert!(try_parse_std(&text).is_ok());
        }

        #[test]
        fn binary_depth_limit() {
            let config = QueryConfig::default().with_max_depth(2);
            assert!(try_parse("a + b - c", &registry(), &config).is_ok());
            assert!(matches!(
                try_parse("a + (b + c)", &registry(), &config),
                Err(QueryError::DepthExceeded { limit: 2 })
            ));
        }
    }
}

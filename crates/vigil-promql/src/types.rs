//! Core types for the visual query model.
//!
//! This module provides:
//! - [`VisualQuery`] — A metric selector, label filters, an operation pipeline and nested binary queries
//! - [`LabelFilter`] — One `label<op>"value"` matcher
//! - [`Operation`] — One pipeline stage, an operation id plus positional parameters
//! - [`BinaryQuery`] — A nested query combined with its parent through a binary operator
//! - [`BinaryOperator`] — Arithmetic, comparison and set operators with their precedence

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label matching operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelOperator {
    /// `=`
    #[default]
    #[serde(rename = "=")]
    Equal,
    /// `!=`
    #[serde(rename = "!=")]
    NotEqual,
    /// `=~`
    #[serde(rename = "=~")]
    RegexMatch,
    /// `!~`
    #[serde(rename = "!~")]
    RegexNotMatch,
}

impl LabelOperator {
    /// Returns the operator as written in a selector.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::RegexMatch => "=~",
            Self::RegexNotMatch => "!~",
        }
    }
}

impl fmt::Display for LabelOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelFilter {
    /// Label name.
    pub label: String,
    /// Matching operator.
    pub op: LabelOperator,
    /// Value or regular expression.
    pub value: String,
}

impl LabelFilter {
    /// Creates a matcher.
    #[must_use]
    pub fn new(label: impl Into<String>, op: LabelOperator, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            op,
            value: value.into(),
        }
    }

    /// Creates an equality matcher.
    #[must_use]
    pub fn equal(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, LabelOperator::Equal, value)
    }
}

/// A positional operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationParam {
    /// A flag, such as the `bool` modifier of comparisons.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string, a label name or a range duration.
    String(String),
}

impl OperationParam {
    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Bool(_) | Self::Number(_) => None,
        }
    }
}

impl From<bool> for OperationParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for OperationParam {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for OperationParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OperationParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// One stage of the operation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Registry id, e.g. `rate`, `sum_by` or `multiply`.
    pub id: String,
    /// Positional parameters.
    #[serde(default)]
    pub params: Vec<OperationParam>,
}

impl Operation {
    /// Creates an operation without parameters.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<OperationParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// Binary operator between two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `+`
    #[serde(rename = "+")]
    Add,
    /// `-`
    #[serde(rename = "-")]
    Subtract,
    /// `*`
    #[serde(rename = "*")]
    Multiply,
    /// `/`
    #[serde(rename = "/")]
    Divide,
    /// `%`
    #[serde(rename = "%")]
    Modulo,
    /// `^`
    #[serde(rename = "^")]
    Power,
    /// `atan2`
    #[serde(rename = "atan2")]
    Atan2,
    /// `==`
    #[serde(rename = "==")]
    Equal,
    /// `!=`
    #[serde(rename = "!=")]
    NotEqual,
    /// `>`
    #[serde(rename = ">")]
    GreaterThan,
    /// `<`
    #[serde(rename = "<")]
    LessThan,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// `<=`
    #[serde(rename = "<=")]
    LessOrEqual,
    /// `and`
    #[serde(rename = "and")]
    And,
    /// `or`
    #[serde(rename = "or")]
    Or,
    /// `unless`
    #[serde(rename = "unless")]
    Unless,
}

impl BinaryOperator {
    /// Every operator, in precedence order from loosest to tightest.
    pub const ALL: [Self; 16] = [
        Self::Or,
        Self::And,
        Self::Unless,
        Self::Equal,
        Self::NotEqual,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Modulo,
        Self::Atan2,
        Self::Power,
    ];

    /// Returns the operator as written in a query.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
            Self::Atan2 => "atan2",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::And => "and",
            Self::Or => "or",
            Self::Unless => "unless",
        }
    }

    /// Looks up an operator by its symbol or keyword.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == symbol)
    }

    /// Binding strength; higher binds tighter.
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And | Self::Unless => 2,
            Self::Equal
            | Self::NotEqual
            | Self::GreaterThan
            | Self::LessThan
            | Self::GreaterOrEqual
            | Self::LessOrEqual => 3,
            Self::Add | Self::Subtract => 4,
            Self::Multiply | Self::Divide | Self::Modulo | Self::Atan2 => 5,
            Self::Power => 6,
        }
    }

    /// Only `^` groups from the right.
    #[must_use]
    pub const fn is_right_associative(&self) -> bool {
        matches!(self, Self::Power)
    }

    /// Returns true for comparison operators, which accept the `bool` modifier.
    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        self.precedence() == 3
    }

    /// Returns true for `and`, `or` and `unless`.
    #[must_use]
    pub const fn is_set_operator(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Unless)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of label list restricting vector matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMatchingKind {
    /// `on(labels)`
    On,
    /// `ignoring(labels)`
    Ignoring,
}

impl VectorMatchingKind {
    /// Returns the keyword as written in a query.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Ignoring => "ignoring",
        }
    }
}

/// `on(...)` or `ignoring(...)` clause of a binary query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorMatching {
    /// Clause keyword.
    pub kind: VectorMatchingKind,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl VectorMatching {
    /// Creates an `on(labels)` clause.
    #[must_use]
    pub fn on<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: VectorMatchingKind::On,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an `ignoring(labels)` clause.
    #[must_use]
    pub fn ignoring<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: VectorMatchingKind::Ignoring,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// A nested query combined with the query that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryQuery {
    /// Operator joining the owner (left) and `query` (right).
    pub operator: BinaryOperator,
    /// `bool` modifier; only meaningful for comparisons.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub return_bool: bool,
    /// Optional `on(...)` / `ignoring(...)` clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_matching: Option<VectorMatching>,
    /// Right-hand query.
    pub query: VisualQuery,
}

impl BinaryQuery {
    /// Creates a binary query without modifiers.
    #[must_use]
    pub const fn new(operator: BinaryOperator, query: VisualQuery) -> Self {
        Self {
            operator,
            return_bool: false,
            vector_matching: None,
            query,
        }
    }

    /// Sets the `bool` modifier.
    #[must_use]
    pub const fn with_return_bool(mut self, return_bool: bool) -> Self {
        self.return_bool = return_bool;
        self
    }

    /// Sets the vector matching clause.
    #[must_use]
    pub fn with_vector_matching(mut self, matching: VectorMatching) -> Self {
        self.vector_matching = Some(matching);
        self
    }
}

/// Structured, editable representation of one metric query.
///
/// Every edit method leaves `self` untouched and returns the complete
/// replacement value, so editors never hand partial patches to their owner.
/// Index-based edits with an out-of-range index return an unchanged copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualQuery {
    /// Selected metric, `None` until the user picks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// Label matchers, in editor order.
    #[serde(default)]
    pub labels: Vec<LabelFilter>,
    /// Pipeline stages, applied left to right.
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Nested queries, left-associated in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binary_queries: Vec<BinaryQuery>,
    /// Set when the query text could not be decomposed; the text is kept
    /// verbatim and the structured fields are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl VisualQuery {
    /// Creates a query selecting a metric.
    #[must_use]
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: Some(metric.into()),
            ..Self::default()
        }
    }

    /// Creates an opaque query holding unparseable text.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw: Some(text.into()),
            ..Self::default()
        }
    }

    /// Returns true if the query is held as opaque text.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.raw.is_some()
    }

    /// Nesting depth: 1 for a query without binary queries.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .binary_queries
            .iter()
            .map(|binary| binary.query.depth())
            .max()
            .unwrap_or(0)
    }

    /// Replaces the metric.
    #[must_use]
    pub fn with_metric(&self, metric: impl Into<String>) -> Self {
        Self {
            metric: Some(metric.into()),
            ..self.clone()
        }
    }

    /// Appends a label matcher.
    #[must_use]
    pub fn with_label(&self, label: LabelFilter) -> Self {
        let mut next = self.clone();
        next.labels.push(label);
        next
    }

    /// Appends an operation.
    #[must_use]
    pub fn with_operation(&self, operation: Operation) -> Self {
        let mut next = self.clone();
        next.operations.push(operation);
        next
    }

    /// Appends a binary query.
    #[must_use]
    pub fn with_binary_query(&self, binary: BinaryQuery) -> Self {
        let mut next = self.clone();
        next.binary_queries.push(binary);
        next
    }

    /// Replaces the label matcher at `index`.
    #[must_use]
    pub fn replace_label(&self, index: usize, label: LabelFilter) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.labels.get_mut(index) {
            *slot = label;
        }
        next
    }

    /// Removes the label matcher at `index`.
    #[must_use]
    pub fn remove_label(&self, index: usize) -> Self {
        let mut next = self.clone();
        if index < next.labels.len() {
            next.labels.remove(index);
        }
        next
    }

    /// Replaces the operation at `index`.
    #[must_use]
    pub fn replace_operation(&self, index: usize, operation: Operation) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.operations.get_mut(index) {
            *slot = operation;
        }
        next
    }

    /// Removes the operation at `index`.
    #[must_use]
    pub fn remove_operation(&self, index: usize) -> Self {
        let mut next = self.clone();
        if index < next.operations.len() {
            next.operations.remove(index);
        }
        next
    }

    /// Moves the operation at `from` so that it ends up at `to`.
    #[must_use]
    pub fn move_operation(&self, from: usize, to: usize) -> Self {
        let mut next = self.clone();
        let len = next.operations.len();
        if from < len && to < len {
            let operation = next.operations.remove(from);
            next.operations.insert(to, operation);
        }
        next
    }
}

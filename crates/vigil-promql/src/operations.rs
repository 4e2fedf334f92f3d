//! The operation registry: how each operation id renders and parses.
//!
//! An [`OperationRegistry`] is a plain value handed to the renderer and the
//! parser. [`OperationRegistry::standard`] builds the default table; tests and
//! hosts can build or extend their own.

use crate::types::{BinaryOperator, Operation, OperationParam};

/// Expected type of an operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// A number.
    Number,
    /// A quoted string.
    String,
    /// A range duration such as `5m` or `$__rate_interval`.
    Duration,
    /// A flag.
    Bool,
    /// A bare label name.
    Label,
}

/// Declaration of one operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    /// Name shown in the editor.
    pub name: String,
    /// Expected type.
    pub kind: ParamKind,
    /// The parameter may be left out.
    pub optional: bool,
    /// The parameter repeats until the end of the list.
    pub rest: bool,
    /// Value used when the operation is added in the editor.
    pub default: Option<OperationParam>,
}

impl ParamDef {
    /// Declares a required parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            rest: false,
            default: None,
        }
    }

    /// Marks the parameter optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the parameter repeating.
    #[must_use]
    pub const fn rest(mut self) -> Self {
        self.rest = true;
        self
    }

    /// Sets the editor default.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<OperationParam>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Label grouping of an aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Grouping {
    /// No grouping clause.
    #[default]
    None,
    /// `by(labels)`
    By,
    /// `without(labels)`
    Without,
}

impl Grouping {
    /// Returns the clause keyword, if any.
    #[must_use]
    pub const fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::By => Some("by"),
            Self::Without => Some("without"),
        }
    }
}

/// Textual form of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKind {
    /// `f(extra..., inner[range])`; the first parameter is the range.
    RangeFunction,
    /// `f(inner, params...)`
    Function,
    /// `f(params..., inner)`
    FunctionParamsFirst,
    /// `f by(labels) (param, inner)`. With `leading_param` the first
    /// parameter is an argument; the remaining parameters are the labels.
    Aggregation {
        /// Grouping clause.
        grouping: Grouping,
        /// The aggregation takes a value argument before the inner expression.
        leading_param: bool,
    },
    /// `inner <op> [bool] n`; comparisons carry the `bool` flag as a second
    /// parameter.
    BinaryScalar {
        /// The operator.
        operator: BinaryOperator,
    },
}

/// Editor grouping of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationCategory {
    /// `sum`, `topk`, ...
    Aggregations,
    /// `rate`, `*_over_time`, ...
    RangeFunctions,
    /// Element-wise functions.
    Functions,
    /// Arithmetic and comparisons against a number.
    BinaryOps,
}

/// Declaration of one operation id.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDef {
    /// Id stored in [`Operation::id`].
    pub id: String,
    /// Function or aggregation name in query text.
    pub function: String,
    /// Parameter declarations.
    pub params: Vec<ParamDef>,
    /// Textual form.
    pub render: RenderKind,
    /// Editor grouping.
    pub category: OperationCategory,
}

impl OperationDef {
    /// Declares an operation without parameters.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        function: impl Into<String>,
        render: RenderKind,
        category: OperationCategory,
    ) -> Self {
        Self {
            id: id.into(),
            function: function.into(),
            params: Vec::new(),
            render,
            category,
        }
    }

    /// Appends a parameter declaration.
    #[must_use]
    pub fn with_param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    /// Builds an [`Operation`] with the default value of every required,
    /// non-repeating parameter.
    #[must_use]
    pub fn instantiate(&self) -> Operation {
        let params = self
            .params
            .iter()
            .filter(|param| !param.optional && !param.rest)
            .map(|param| {
                param.default.clone().unwrap_or_else(|| match param.kind {
                    ParamKind::Number => OperationParam::Number(0.0),
                    ParamKind::Bool => OperationParam::Bool(false),
                    ParamKind::String | ParamKind::Duration | ParamKind::Label => {
                        OperationParam::String(String::new())
                    }
                })
            })
            .collect();

        Operation {
            id: self.id.clone(),
            params,
        }
    }

    /// Appends the declared defaults of trailing parameters the operation
    /// leaves out. Stops at the first optional, repeating or default-less
    /// parameter, so positions never shift.
    #[must_use]
    pub fn complete(&self, operation: &Operation) -> Operation {
        let missing = self
            .params
            .iter()
            .skip(operation.params.len())
            .map_while(|param| {
                if param.optional || param.rest {
                    None
                } else {
                    param.default.clone()
                }
            });

        Operation {
            id: operation.id.clone(),
            params: operation.params.iter().cloned().chain(missing).collect(),
        }
    }

    const fn is_function(&self) -> bool {
        matches!(
            self.render,
            RenderKind::RangeFunction | RenderKind::Function | RenderKind::FunctionParamsFirst
        )
    }
}

/// Lookup table from operation id to its declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationRegistry {
    defs: Vec<OperationDef>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { defs: Vec::new() }
    }

    /// Adds a declaration, replacing any existing one with the same id.
    pub fn register(&mut self, def: OperationDef) {
        if let Some(existing) = self.defs.iter_mut().find(|existing| existing.id == def.id) {
            *existing = def;
        } else {
            self.defs.push(def);
        }
    }

    /// Builder form of [`OperationRegistry::register`].
    #[must_use]
    pub fn with(mut self, def: OperationDef) -> Self {
        self.register(def);
        self
    }

    /// Returns the declaration of an operation id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&OperationDef> {
        self.defs.iter().find(|def| def.id == id)
    }

    /// Returns the function-style operation named `name` in query text.
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<&OperationDef> {
        self.defs
            .iter()
            .find(|def| def.is_function() && def.function == name)
    }

    /// Returns the aggregation named `name` with the given grouping.
    #[must_use]
    pub fn find_aggregation(&self, name: &str, grouping: Grouping) -> Option<&OperationDef> {
        self.defs.iter().find(|def| {
            def.function == name
                && matches!(def.render, RenderKind::Aggregation { grouping: g, .. } if g == grouping)
        })
    }

    /// Returns true if `name` is an aggregation in any grouping.
    #[must_use]
    pub fn is_aggregation(&self, name: &str) -> bool {
        self.defs
            .iter()
            .any(|def| def.function == name && matches!(def.render, RenderKind::Aggregation { .. }))
    }

    /// Returns the scalar form of a binary operator.
    #[must_use]
    pub fn find_binary_scalar(&self, operator: BinaryOperator) -> Option<&OperationDef> {
        self.defs
            .iter()
            .find(|def| def.render == RenderKind::BinaryScalar { operator })
    }

    /// Builds an operation with default parameters, for the editor's "add"
    /// action.
    #[must_use]
    pub fn instantiate(&self, id: &str) -> Option<Operation> {
        self.get(id).map(OperationDef::instantiate)
    }

    /// Iterates the declarations of one category, in registration order.
    pub fn by_category(&self, category: OperationCategory) -> impl Iterator<Item = &OperationDef> {
        self.defs.iter().filter(move |def| def.category == category)
    }

    /// Number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns true if the registry has no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// The default operation table.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();

        for (name, default_range) in [
            ("rate", "$__rate_interval"),
            ("irate", "$__rate_interval"),
            ("increase", "$__rate_interval"),
            ("delta", "$__interval"),
            ("idelta", "$__interval"),
            ("deriv", "$__interval"),
            ("changes", "$__interval"),
            ("resets", "$__interval"),
            ("avg_over_time", "$__interval"),
            ("min_over_time", "$__interval"),
            ("max_over_time", "$__interval"),
            ("sum_over_time", "$__interval"),
            ("count_over_time", "$__interval"),
            ("last_over_time", "$__interval"),
            ("present_over_time", "$__interval"),
            ("stddev_over_time", "$__interval"),
            ("stdvar_over_time", "$__interval"),
        ] {
            registry.register(range_function(name, default_range));
        }
        registry.register(
            range_function("quantile_over_time", "$__interval")
                .with_param(ParamDef::new("quantile", ParamKind::Number).with_default(0.95)),
        );

        for name in [
            "abs", "absent", "ceil", "floor", "exp", "ln", "log2", "log10", "sqrt", "sgn",
            "timestamp", "sort", "sort_desc",
        ] {
            registry.register(function(name));
        }
        registry.register(
            function("round").with_param(ParamDef::new("to nearest", ParamKind::Number).optional()),
        );
        registry.register(
            function("clamp")
                .with_param(ParamDef::new("min", ParamKind::Number).with_default(0.0))
                .with_param(ParamDef::new("max", ParamKind::Number).with_default(1.0)),
        );
        registry.register(
            function("clamp_min").with_param(ParamDef::new("min", ParamKind::Number).with_default(0.0)),
        );
        registry.register(
            function("clamp_max").with_param(ParamDef::new("max", ParamKind::Number).with_default(1.0)),
        );
        registry.register(
            function("label_replace")
                .with_param(ParamDef::new("destination label", ParamKind::String))
                .with_param(ParamDef::new("replacement", ParamKind::String).with_default("$1"))
                .with_param(ParamDef::new("source label", ParamKind::String))
                .with_param(ParamDef::new("regex", ParamKind::String).with_default("(.*)")),
        );
        registry.register(
            function("label_join")
                .with_param(ParamDef::new("destination label", ParamKind::String))
                .with_param(ParamDef::new("separator", ParamKind::String).with_default(","))
                .with_param(ParamDef::new("source label", ParamKind::String).rest()),
        );
        registry.register(
            OperationDef::new(
                "histogram_quantile",
                "histogram_quantile",
                RenderKind::FunctionParamsFirst,
                OperationCategory::Functions,
            )
            .with_param(ParamDef::new("quantile", ParamKind::Number).with_default(0.95)),
        );

        for name in ["sum", "avg", "min", "max", "count", "stddev", "stdvar", "group"] {
            for def in aggregation(name, None) {
                registry.register(def);
            }
        }
        for (name, leading) in [
            ("topk", ParamDef::new("k", ParamKind::Number).with_default(5.0)),
            ("bottomk", ParamDef::new("k", ParamKind::Number).with_default(5.0)),
            ("quantile", ParamDef::new("quantile", ParamKind::Number).with_default(0.95)),
            ("count_values", ParamDef::new("label", ParamKind::String).with_default("value")),
        ] {
            for def in aggregation(name, Some(leading)) {
                registry.register(def);
            }
        }

        for (id, operator) in [
            ("addition", BinaryOperator::Add),
            ("subtraction", BinaryOperator::Subtract),
            ("multiply", BinaryOperator::Multiply),
            ("divide", BinaryOperator::Divide),
            ("modulo", BinaryOperator::Modulo),
            ("exponent", BinaryOperator::Power),
            ("equal", BinaryOperator::Equal),
            ("not_equal", BinaryOperator::NotEqual),
            ("greater_than", BinaryOperator::GreaterThan),
            ("less_than", BinaryOperator::LessThan),
            ("greater_or_equal", BinaryOperator::GreaterOrEqual),
            ("less_or_equal", BinaryOperator::LessOrEqual),
        ] {
            registry.register(binary_scalar(id, operator));
        }

        registry
    }
}

fn range_function(name: &str, default_range: &str) -> OperationDef {
    OperationDef::new(name, name, RenderKind::RangeFunction, OperationCategory::RangeFunctions)
        .with_param(ParamDef::new("range", ParamKind::Duration).with_default(default_range))
}

fn function(name: &str) -> OperationDef {
    OperationDef::new(name, name, RenderKind::Function, OperationCategory::Functions)
}

/// The three groupings of one aggregation: `name`, `name_by`, `name_without`.
fn aggregation(name: &str, leading: Option<ParamDef>) -> [OperationDef; 3] {
    let leading_param = leading.is_some();
    let declare = |id: String, grouping: Grouping| {
        let mut def = OperationDef::new(
            id,
            name,
            RenderKind::Aggregation {
                grouping,
                leading_param,
            },
            OperationCategory::Aggregations,
        );
        if let Some(param) = &leading {
            def = def.with_param(param.clone());
        }
        if grouping != Grouping::None {
            def = def.with_param(ParamDef::new("label", ParamKind::Label).rest());
        }
        def
    };

    [
        declare(name.to_string(), Grouping::None),
        declare(format!("{name}_by"), Grouping::By),
        declare(format!("{name}_without"), Grouping::Without),
    ]
}

fn binary_scalar(id: &str, operator: BinaryOperator) -> OperationDef {
    let def = OperationDef::new(
        id,
        operator.as_str(),
        RenderKind::BinaryScalar { operator },
        OperationCategory::BinaryOps,
    )
    .with_param(ParamDef::new("value", ParamKind::Number).with_default(2.0));

    if operator.is_comparison() {
        def.with_param(ParamDef::new("bool", ParamKind::Bool).with_default(false))
    } else {
        def
    }
}

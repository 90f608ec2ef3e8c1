//! A tiny boolean expression language with lazily evaluated variables.
//!
//! Expressions combine named signals with `not`, `every` and `some`. Variables
//! are bound either to a constant or to a lazy [`Binding`]. A lazy binding is
//! invoked only when evaluation actually reaches it, and at most once per
//! [`evaluate`] call; `every` and `some` short-circuit left to right. Some
//! signals re-validate a whole tree, so skipping them is what keeps repeated
//! evaluation cheap.
//!
//! Nothing here knows about trees or grammars.

use facet::Facet;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A boolean expression over named variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A constant.
    Value(bool),

    /// A named variable. Unbound names evaluate to `false`.
    Variable(String),

    /// Negation.
    Not(Box<Expression>),

    /// `true` if all operands are; `true` for no operands.
    Every(Vec<Expression>),

    /// `true` if any operand is; `false` for no operands.
    Some(Vec<Expression>),
}

impl Expression {
    /// A variable reference.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    /// The negation of `expr`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expression) -> Self {
        Expression::Not(Box::new(expr))
    }

    /// Parse an expression from its JSON description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParse`] for unreadable JSON and
    /// [`Error::InvalidDescription`] if a node lacks its payload.
    pub fn from_json(json: &str) -> Result<Self> {
        let description: ExpressionDescription =
            facet_json::from_str(json).map_err(|e| Error::JsonParse(e.to_string()))?;
        Self::try_from(&description)
    }

    /// Names of all variables referenced anywhere in the expression.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Value(_) => {}
            Expression::Variable(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expression::Not(inner) => inner.collect_variables(out),
            Expression::Every(operands) | Expression::Some(operands) => {
                for operand in operands {
                    operand.collect_variables(out);
                }
            }
        }
    }
}

/// What a variable name is bound to.
pub enum Binding<'a> {
    /// A value known up front.
    Value(bool),

    /// A value computed on demand. Invoked at most once per evaluation.
    Lazy(Box<dyn Fn() -> bool + 'a>),
}

impl std::fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Binding::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Variable bindings for [`evaluate`].
#[derive(Debug, Default)]
pub struct Variables<'a> {
    bindings: HashMap<String, Binding<'a>>,
}

impl<'a> Variables<'a> {
    /// An empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to a constant.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: bool) -> Self {
        self.bindings.insert(name.into(), Binding::Value(value));
        self
    }

    /// Binds `name` to a thunk evaluated on demand.
    #[must_use]
    pub fn with_lazy(mut self, name: impl Into<String>, thunk: impl Fn() -> bool + 'a) -> Self {
        self.bindings
            .insert(name.into(), Binding::Lazy(Box::new(thunk)));
        self
    }

    /// Binds or rebinds `name`.
    pub fn insert(&mut self, name: impl Into<String>, binding: Binding<'a>) {
        self.bindings.insert(name.into(), binding);
    }

    /// Returns `true` if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// Evaluates `expr` against `variables`.
///
/// Lazy bindings run at most once and only when reached. `every` stops at the
/// first `false`, `some` at the first `true`; later operands are not touched.
#[must_use]
pub fn evaluate(expr: &Expression, variables: &Variables<'_>) -> bool {
    Evaluation {
        variables,
        memo: HashMap::new(),
    }
    .eval(expr)
}

struct Evaluation<'v, 'b, 'e> {
    variables: &'v Variables<'b>,
    memo: HashMap<&'e str, bool>,
}

impl<'e> Evaluation<'_, '_, 'e> {
    fn eval(&mut self, expr: &'e Expression) -> bool {
        match expr {
            Expression::Value(value) => *value,
            Expression::Variable(name) => self.lookup(name),
            Expression::Not(inner) => !self.eval(inner),
            Expression::Every(operands) => operands.iter().all(|operand| self.eval(operand)),
            Expression::Some(operands) => operands.iter().any(|operand| self.eval(operand)),
        }
    }

    fn lookup(&mut self, name: &'e str) -> bool {
        if let Some(&cached) = self.memo.get(name) {
            return cached;
        }
        let value = match self.variables.bindings.get(name) {
            Some(Binding::Value(value)) => *value,
            Some(Binding::Lazy(thunk)) => thunk(),
            None => false,
        };
        self.memo.insert(name, value);
        value
    }
}

/// Serialized form of an [`Expression`], as found in configuration.
///
/// The JSON shape is `{"type": "value", "value": true}`,
/// `{"type": "var", "name": "..."}`, `{"type": "not", "expr": ...}`,
/// `{"type": "every", "exprs": [...]}` or `{"type": "some", "exprs": [...]}`.
#[derive(Debug, Clone, Facet)]
pub struct ExpressionDescription {
    /// Which kind of expression this is.
    #[facet(rename = "type")]
    pub kind: ExpressionKind,

    /// Payload of `value`.
    #[facet(default)]
    pub value: Option<bool>,

    /// Payload of `var`.
    #[facet(default)]
    pub name: Option<String>,

    /// Payload of `not`.
    #[facet(default)]
    pub expr: Option<Box<ExpressionDescription>>,

    /// Payload of `every` and `some`.
    #[facet(default)]
    pub exprs: Vec<ExpressionDescription>,
}

/// Discriminant of an [`ExpressionDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum ExpressionKind {
    /// A constant.
    #[facet(rename = "value")]
    Value,
    /// A variable reference.
    #[facet(rename = "var")]
    Variable,
    /// Negation.
    #[facet(rename = "not")]
    Not,
    /// Conjunction.
    #[facet(rename = "every")]
    Every,
    /// Disjunction.
    #[facet(rename = "some")]
    Some,
}

impl TryFrom<&ExpressionDescription> for Expression {
    type Error = Error;

    fn try_from(desc: &ExpressionDescription) -> Result<Self> {
        let missing = |field: &str| {
            Error::InvalidDescription(format!("{:?} expression without '{field}'", desc.kind))
        };
        let operands = || {
            desc.exprs
                .iter()
                .map(Expression::try_from)
                .collect::<Result<Vec<_>>>()
        };

        match desc.kind {
            ExpressionKind::Value => desc.value.map(Expression::Value).ok_or_else(|| missing("value")),
            ExpressionKind::Variable => desc
                .name
                .clone()
                .map(Expression::Variable)
                .ok_or_else(|| missing("name")),
            ExpressionKind::Not => {
                let inner = desc.expr.as_deref().ok_or_else(|| missing("expr"))?;
                Ok(Expression::not(Expression::try_from(inner)?))
            }
            ExpressionKind::Every => Ok(Expression::Every(operands()?)),
            ExpressionKind::Some => Ok(Expression::Some(operands()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_constants_and_not() {
        let vars = Variables::new();
        assert!(evaluate(&Expression::Value(true), &vars));
        assert!(!evaluate(&Expression::not(Expression::Value(true)), &vars));
    }

    #[test]
    fn test_empty_every_and_some() {
        let vars = Variables::new();
        assert!(evaluate(&Expression::Every(vec![]), &vars));
        assert!(!evaluate(&Expression::Some(vec![]), &vars));
    }

    #[test]
    fn test_unbound_variable_is_false() {
        let vars = Variables::new();
        assert!(!evaluate(&Expression::var("nope"), &vars));
        assert!(evaluate(&Expression::not(Expression::var("nope")), &vars));
    }

    #[test]
    fn test_some_short_circuits() {
        let v1 = Cell::new(0);
        let v2 = Cell::new(0);
        let vars = Variables::new()
            .with_lazy("v1", || {
                v1.set(v1.get() + 1);
                true
            })
            .with_lazy("v2", || {
                v2.set(v2.get() + 1);
                true
            });

        let expr = Expression::Some(vec![Expression::var("v1"), Expression::var("v2")]);
        assert!(evaluate(&expr, &vars));
        assert_eq!(v1.get(), 1);
        assert_eq!(v2.get(), 0);
    }

    #[test]
    fn test_every_short_circuits() {
        let v2 = Cell::new(0);
        let vars = Variables::new()
            .with_lazy("v1", || false)
            .with_lazy("v2", || {
                v2.set(v2.get() + 1);
                true
            });

        let expr = Expression::Every(vec![Expression::var("v1"), Expression::var("v2")]);
        assert!(!evaluate(&expr, &vars));
        assert_eq!(v2.get(), 0);
    }

    #[test]
    fn test_lazy_variable_runs_once_per_evaluation() {
        let calls = Cell::new(0);
        let vars = Variables::new().with_lazy("v", || {
            calls.set(calls.get() + 1);
            true
        });

        let expr = Expression::Every(vec![
            Expression::var("v"),
            Expression::not(Expression::not(Expression::var("v"))),
            Expression::Some(vec![Expression::var("v")]),
        ]);
        assert!(evaluate(&expr, &vars));
        assert_eq!(calls.get(), 1);

        assert!(evaluate(&expr, &vars));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_unreached_variable_never_runs() {
        let vars = Variables::new()
            .with_value("off", false)
            .with_lazy("boom", || panic!("must not be evaluated"));
        let expr = Expression::Every(vec![Expression::var("off"), Expression::var("boom")]);
        assert!(!evaluate(&expr, &vars));
    }

    #[test]
    fn test_parse_expression() {
        let json = r#"{
            "type": "some",
            "exprs": [
                { "type": "var", "name": "ifLegalDrag" },
                { "type": "every", "exprs": [
                    { "type": "var", "name": "ifEmpty" },
                    { "type": "not", "expr": { "type": "value", "value": false } }
                ] }
            ]
        }"#;

        let expr = Expression::from_json(json).unwrap();
        assert_eq!(
            expr,
            Expression::Some(vec![
                Expression::var("ifLegalDrag"),
                Expression::Every(vec![
                    Expression::var("ifEmpty"),
                    Expression::not(Expression::Value(false)),
                ]),
            ])
        );
        assert_eq!(expr.variables(), ["ifLegalDrag", "ifEmpty"]);
    }

    #[test]
    fn test_parse_rejects_missing_payload() {
        assert!(matches!(
            Expression::from_json(r#"{ "type": "var" }"#),
            Err(Error::InvalidDescription(_))
        ));
        assert!(matches!(
            Expression::from_json(r#"{ "type": "not" }"#),
            Err(Error::InvalidDescription(_))
        ));
    }
}

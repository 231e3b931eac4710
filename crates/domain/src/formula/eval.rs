//! Reference evaluator for [`Formula`].
//!
//! The production evaluator lives in the external rule engine; this one backs
//! previews and tests. `matches(..)` needs the host's pattern engine and is
//! reported as unsupported.

use std::collections::HashMap;
use std::fmt;

use super::{BinaryOp, Formula, Function, UnaryOp};

/// Runtime value of an attribute or sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
        }
    }

    /// Numeric view; `null` counts as zero.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    fn from_bool(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Error type for formula evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Function {function} expected {expected} args, got {got}")]
    InvalidArgCount {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Not supported by the reference evaluator: {0}")]
    Unsupported(&'static str),
}

/// Attribute values visible to a formula.
pub trait Scope {
    /// Value of the rule's source attribute.
    fn source(&self) -> Value;

    /// Value of a named attribute; undefined attributes are `null`.
    fn attribute(&self, name: &str) -> Value;

    fn capture(&self, _index: u8) -> Value {
        Value::Null
    }
}

/// A [`Scope`] backed by a map, for previews and tests.
#[derive(Debug, Clone, Default)]
pub struct MapScope {
    source: Option<Value>,
    attributes: HashMap<String, Value>,
}

impl MapScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, value: impl Into<Value>) -> Self {
        self.source = Some(value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl Scope for MapScope {
    fn source(&self) -> Value {
        self.source.clone().unwrap_or(Value::Null)
    }

    fn attribute(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }
}

impl Formula {
    pub fn evaluate(&self, scope: &dyn Scope) -> Result<Value, EvalError> {
        match self {
            Formula::Number { value } => Ok(Value::Number(*value)),
            Formula::Text { value } => Ok(Value::Text(value.clone())),
            Formula::Null => Ok(Value::Null),
            Formula::Source => Ok(scope.source()),
            Formula::Attribute { name } => Ok(scope.attribute(name)),
            Formula::Capture { index } => Ok(scope.capture(*index)),
            Formula::Unary { op, operand } => {
                let value = operand.evaluate(scope)?;
                match op {
                    UnaryOp::Not => Ok(Value::from_bool(!value.is_truthy())),
                    UnaryOp::Neg => Ok(Value::Number(-number(&value, "-")?)),
                }
            }
            Formula::Binary { op, left, right } => eval_binary(*op, left, right, scope),
            Formula::Conditional {
                condition,
                consequent,
                alternative,
            } => {
                if condition.evaluate(scope)?.is_truthy() {
                    consequent.evaluate(scope)
                } else {
                    match alternative {
                        Some(alternative) => alternative.evaluate(scope),
                        None => Ok(Value::Null),
                    }
                }
            }
            Formula::Call { function, args } => eval_call(*function, args, scope),
        }
    }
}

fn number(value: &Value, context: &str) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| EvalError::TypeMismatch(format!("'{}' is not a number in {}", value, context)))
}

fn eval_binary(
    op: BinaryOp,
    left: &Formula,
    right: &Formula,
    scope: &dyn Scope,
) -> Result<Value, EvalError> {
    // Short-circuit operators yield an operand, not a boolean
    match op {
        BinaryOp::And => {
            let l = left.evaluate(scope)?;
            return if l.is_truthy() { right.evaluate(scope) } else { Ok(l) };
        }
        BinaryOp::Or => {
            let l = left.evaluate(scope)?;
            return if l.is_truthy() { Ok(l) } else { right.evaluate(scope) };
        }
        _ => {}
    }

    let l = left.evaluate(scope)?;
    let r = right.evaluate(scope)?;
    match op {
        BinaryOp::Add => match (&l, &r) {
            (Value::Text(a), b) => Ok(Value::Text(format!("{}{}", a, b))),
            (a, Value::Text(b)) => Ok(Value::Text(format!("{}{}", a, b))),
            _ => Ok(Value::Number(number(&l, "+")? + number(&r, "+")?)),
        },
        BinaryOp::Sub => Ok(Value::Number(number(&l, "-")? - number(&r, "-")?)),
        BinaryOp::Mul => Ok(Value::Number(number(&l, "*")? * number(&r, "*")?)),
        BinaryOp::Div => {
            let divisor = number(&r, "/")?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Number(number(&l, "/")? / divisor))
        }
        BinaryOp::Eq => Ok(Value::from_bool(loose_equals(&l, &r))),
        BinaryOp::Ne => Ok(Value::from_bool(!loose_equals(&l, &r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&l, &r) {
                (Value::Null, _) | (_, Value::Null) => None,
                (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
                _ => match (l.as_number(), r.as_number()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                },
            };
            let result = ordering.map_or(false, |o| match op {
                BinaryOp::Lt => o.is_lt(),
                BinaryOp::Le => o.is_le(),
                BinaryOp::Gt => o.is_gt(),
                _ => o.is_ge(),
            });
            Ok(Value::from_bool(result))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled above"),
    }
}

fn loose_equals(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Text(a), Value::Text(b)) => a == b,
        _ => match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn eval_call(function: Function, args: &[Formula], scope: &dyn Scope) -> Result<Value, EvalError> {
    function
        .check_arity(args.len())
        .map_err(|expected| EvalError::InvalidArgCount {
            function: function.name(),
            expected,
            got: args.len(),
        })?;

    let numbers = |args: &[Formula]| -> Result<Vec<f64>, EvalError> {
        args.iter()
            .map(|a| a.evaluate(scope).and_then(|v| number(&v, function.name())))
            .collect()
    };

    match function {
        Function::Floor => Ok(Value::Number(numbers(args)?[0].floor())),
        Function::Ceil => Ok(Value::Number(numbers(args)?[0].ceil())),
        Function::Abs => Ok(Value::Number(numbers(args)?[0].abs())),
        Function::Min => Ok(Value::Number(
            numbers(args)?.into_iter().fold(f64::INFINITY, f64::min),
        )),
        Function::Max => Ok(Value::Number(
            numbers(args)?.into_iter().fold(f64::NEG_INFINITY, f64::max),
        )),
        Function::Steps => {
            let values = numbers(args)?;
            let input = values[0];
            let mut result = values[1];
            for pair in values[2..].chunks_exact(2) {
                if pair[0] <= input {
                    result = pair[1];
                }
            }
            Ok(Value::Number(result))
        }
        Function::Table => {
            let values = numbers(args)?;
            let index = values[0];
            let table = &values[2..];
            if index >= 0.0 && index.fract() == 0.0 && (index as usize) < table.len() {
                Ok(Value::Number(table[index as usize]))
            } else {
                Ok(Value::Number(values[1]))
            }
        }
        Function::Matches => Err(EvalError::Unsupported("matches")),
    }
}

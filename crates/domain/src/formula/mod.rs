//! Formula AST attached to derivation rules.
//!
//! A formula computes one contribution to a target attribute from the value
//! of the rule's source attribute (`source`) and any other attributes it
//! names. The external evaluation engine consumes the canonical text produced
//! by [`Formula`]'s `Display` impl; rendering and re-parsing that text with
//! [`crate::conditional::compile_expression`] yields the same tree.

mod eval;

pub use eval::{EvalError, MapScope, Scope, Value};

use std::fmt;
use std::ops;

use serde::{Deserialize, Serialize};

/// Binary operators, lowest precedence last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    pub(crate) const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 2,
            Self::And => 3,
            Self::Eq | Self::Ne => 4,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 5,
            Self::Add | Self::Sub => 6,
            Self::Mul | Self::Div => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Built-in functions understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Function {
    Floor,
    Ceil,
    Abs,
    Min,
    Max,
    /// `steps(input, below, t1, v1, t2, v2, ...)`
    Steps,
    /// `table(index, fallback, v0, v1, ...)`
    Table,
    /// `matches(list, 'pattern', value)`, evaluated by the host
    Matches,
}

impl Function {
    pub const ALL: [Function; 8] = [
        Function::Floor,
        Function::Ceil,
        Function::Abs,
        Function::Min,
        Function::Max,
        Function::Steps,
        Function::Table,
        Function::Matches,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Steps => "steps",
            Self::Table => "table",
            Self::Matches => "matches",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Checks an argument count, returning a description of the expected
    /// count when it is wrong.
    pub fn check_arity(&self, count: usize) -> Result<(), &'static str> {
        let ok = match self {
            Self::Floor | Self::Ceil | Self::Abs => count == 1,
            Self::Min | Self::Max => count >= 2,
            Self::Steps => count >= 2 && count % 2 == 0,
            Self::Table => count >= 2,
            Self::Matches => count == 3,
        };
        if ok {
            Ok(())
        } else {
            Err(match self {
                Self::Floor | Self::Ceil | Self::Abs => "exactly 1",
                Self::Min | Self::Max => "at least 2",
                Self::Steps => "an even number, at least 2",
                Self::Table => "at least 2",
                Self::Matches => "exactly 3",
            })
        }
    }
}

/// Expression tree for a rule formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Formula {
    Number { value: f64 },
    Text { value: String },
    /// No contribution
    Null,
    /// Value of the rule's source attribute
    Source,
    Attribute { name: String },
    /// `$n` capture of a goody pattern match
    Capture { index: u8 },
    Unary {
        op: UnaryOp,
        operand: Box<Formula>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Formula>,
        right: Box<Formula>,
    },
    Conditional {
        condition: Box<Formula>,
        consequent: Box<Formula>,
        alternative: Option<Box<Formula>>,
    },
    Call {
        function: Function,
        args: Vec<Formula>,
    },
}

impl Formula {
    pub fn number(value: f64) -> Self {
        Self::Number { value }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn attr(name: impl Into<String>) -> Self {
        Self::Attribute { name: name.into() }
    }

    pub fn source() -> Self {
        Self::Source
    }

    pub fn capture(index: u8) -> Self {
        Self::Capture { index }
    }

    pub fn call(function: Function, args: Vec<Formula>) -> Self {
        Self::Call { function, args }
    }

    pub fn binary(op: BinaryOp, left: Formula, right: Formula) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `condition ? consequent` (null otherwise).
    pub fn when(condition: Formula, consequent: Formula) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternative: None,
        }
    }

    /// `condition ? consequent : alternative`.
    pub fn if_else(condition: Formula, consequent: Formula, alternative: Formula) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternative: Some(Box::new(alternative)),
        }
    }

    /// Negation; literal numbers are folded.
    pub fn neg(self) -> Self {
        match self {
            Self::Number { value } => Self::number(-value),
            other => Self::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(other),
            },
        }
    }

    pub fn not(self) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    pub fn floor(self) -> Self {
        Self::call(Function::Floor, vec![self])
    }

    pub fn and(self, other: Formula) -> Self {
        Self::binary(BinaryOp::And, self, other)
    }

    pub fn or(self, other: Formula) -> Self {
        Self::binary(BinaryOp::Or, self, other)
    }

    pub fn ge(self, other: Formula) -> Self {
        Self::binary(BinaryOp::Ge, self, other)
    }

    pub fn gt(self, other: Formula) -> Self {
        Self::binary(BinaryOp::Gt, self, other)
    }

    pub fn equals(self, other: Formula) -> Self {
        Self::binary(BinaryOp::Eq, self, other)
    }

    /// `steps(input, below, t1, v1, ...)`: value of the highest threshold not
    /// above `input`, or `below` when every threshold is above it.
    pub fn steps(input: Formula, below: f64, steps: &[(f64, f64)]) -> Self {
        let mut args = Vec::with_capacity(2 + steps.len() * 2);
        args.push(input);
        args.push(Self::number(below));
        for &(threshold, value) in steps {
            args.push(Self::number(threshold));
            args.push(Self::number(value));
        }
        Self::call(Function::Steps, args)
    }

    /// `table(index, fallback, v0, v1, ...)`.
    pub fn table(index: Formula, fallback: f64, values: &[f64]) -> Self {
        let mut args = Vec::with_capacity(2 + values.len());
        args.push(index);
        args.push(Self::number(fallback));
        args.extend(values.iter().map(|&v| Self::number(v)));
        Self::call(Function::Table, args)
    }

    /// `matches(list, 'pattern', value)`.
    pub fn matches(list: Formula, pattern: impl Into<String>, value: Formula) -> Self {
        Self::call(Function::Matches, vec![list, Self::text(pattern), value])
    }

    /// Sums a list of terms, returning zero for an empty list.
    pub fn sum(terms: impl IntoIterator<Item = Formula>) -> Self {
        terms
            .into_iter()
            .reduce(|acc, term| acc + term)
            .unwrap_or_else(|| Self::number(0.0))
    }

    /// Names of all attributes the formula reads, in order of appearance.
    pub fn referenced_attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Attribute { name } => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Self::Unary { operand, .. } => operand.collect_attributes(names),
            Self::Binary { left, right, .. } => {
                left.collect_attributes(names);
                right.collect_attributes(names);
            }
            Self::Conditional {
                condition,
                consequent,
                alternative,
            } => {
                condition.collect_attributes(names);
                consequent.collect_attributes(names);
                if let Some(alternative) = alternative {
                    alternative.collect_attributes(names);
                }
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_attributes(names);
                }
            }
            _ => {}
        }
    }

    const CONDITIONAL_PRECEDENCE: u8 = 1;
    const UNARY_PRECEDENCE: u8 = 8;
    const PRIMARY_PRECEDENCE: u8 = 9;

    fn precedence(&self) -> u8 {
        match self {
            Self::Conditional { .. } => Self::CONDITIONAL_PRECEDENCE,
            Self::Binary { op, .. } => op.precedence(),
            Self::Unary { .. } => Self::UNARY_PRECEDENCE,
            Self::Number { value } if *value < 0.0 => Self::UNARY_PRECEDENCE,
            _ => Self::PRIMARY_PRECEDENCE,
        }
    }

    fn write_with(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            f.write_str("(")?;
            self.write_bare(f)?;
            f.write_str(")")
        } else {
            self.write_bare(f)
        }
    }

    fn write_bare(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number { value } => write_number(f, *value),
            Self::Text { value } => write_text(f, value),
            Self::Null => f.write_str("null"),
            Self::Source => f.write_str("source"),
            Self::Attribute { name } => write_attribute(f, name),
            Self::Capture { index } => write!(f, "${}", index),
            Self::Unary { op, operand } => {
                f.write_str(match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                })?;
                // `- -x` must not collapse into a decrement-looking token
                if matches!(op, UnaryOp::Neg) && operand.precedence() == Self::UNARY_PRECEDENCE {
                    f.write_str("(")?;
                    operand.write_bare(f)?;
                    return f.write_str(")");
                }
                operand.write_with(f, Self::UNARY_PRECEDENCE)
            }
            Self::Binary { op, left, right } => {
                let precedence = op.precedence();
                left.write_with(f, precedence)?;
                write!(f, " {} ", op.symbol())?;
                right.write_with(f, precedence + 1)
            }
            Self::Conditional {
                condition,
                consequent,
                alternative,
            } => {
                condition.write_with(f, Self::CONDITIONAL_PRECEDENCE + 1)?;
                f.write_str(" ? ")?;
                consequent.write_with(f, Self::CONDITIONAL_PRECEDENCE + 1)?;
                if let Some(alternative) = alternative {
                    f.write_str(" : ")?;
                    alternative.write_with(f, Self::CONDITIONAL_PRECEDENCE)?;
                }
                Ok(())
            }
            Self::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    arg.write_with(f, Self::CONDITIONAL_PRECEDENCE)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        write!(f, "{}", value)
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in value.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

/// Whether an attribute name can be written without back-quotes.
pub(crate) fn is_bare_attribute(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.ends_with('.')
        && !matches!(name, "source" | "null")
}

fn write_attribute(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare_attribute(name) {
        f.write_str(name)
    } else {
        f.write_str("`")?;
        for c in name.chars() {
            if c == '`' || c == '\\' {
                f.write_str("\\")?;
            }
            write!(f, "{}", c)?;
        }
        f.write_str("`")
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_bare(f)
    }
}

impl ops::Add for Formula {
    type Output = Formula;

    fn add(self, rhs: Formula) -> Formula {
        Formula::binary(BinaryOp::Add, self, rhs)
    }
}

impl ops::Sub for Formula {
    type Output = Formula;

    fn sub(self, rhs: Formula) -> Formula {
        Formula::binary(BinaryOp::Sub, self, rhs)
    }
}

impl ops::Mul for Formula {
    type Output = Formula;

    fn mul(self, rhs: Formula) -> Formula {
        Formula::binary(BinaryOp::Mul, self, rhs)
    }
}

impl ops::Div for Formula {
    type Output = Formula;

    fn div(self, rhs: Formula) -> Formula {
        Formula::binary(BinaryOp::Div, self, rhs)
    }
}

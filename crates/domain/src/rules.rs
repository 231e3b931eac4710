//! Compiler output: derivation rules and note templates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::formula::Formula;

/// How a rule's contribution combines with others on the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeOp {
    /// Replaces the current value
    Set,
    Add,
    Max,
    Min,
    /// Only applies while the target is still unset
    FirstWins,
    /// Collects contributions into a list
    Accumulate,
}

impl MergeOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Max => "max",
            Self::Min => "min",
            Self::FirstWins => "firstWins",
            Self::Accumulate => "accumulate",
        }
    }

    /// Whether applying contributions in any order yields the same result.
    ///
    /// Only commutative operators may target an attribute from more than one
    /// record.
    pub const fn is_commutative(&self) -> bool {
        matches!(self, Self::Add | Self::Max | Self::Min | Self::Accumulate)
    }
}

impl fmt::Display for MergeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeOp {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" | "=" => Ok(Self::Set),
            "add" | "+" => Ok(Self::Add),
            "max" | "^" => Ok(Self::Max),
            "min" | "v" => Ok(Self::Min),
            "firstWins" => Ok(Self::FirstWins),
            "accumulate" => Ok(Self::Accumulate),
            other => Err(CompileError::semantic(format!(
                "unknown merge operator '{}'",
                other
            ))),
        }
    }
}

/// One atomic contribution to a computed attribute.
///
/// `formula` is evaluated with `source` bound to the source attribute's value;
/// `None` contributes the source value itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationRule {
    pub target: String,
    pub source: String,
    pub op: MergeOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
}

impl DerivationRule {
    pub fn new(
        target: impl Into<String>,
        source: impl Into<String>,
        op: MergeOp,
        formula: Option<Formula>,
    ) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            op,
            formula,
        }
    }

    /// Rule contributing `formula`.
    pub fn computed(
        target: impl Into<String>,
        source: impl Into<String>,
        op: MergeOp,
        formula: Formula,
    ) -> Self {
        Self::new(target, source, op, Some(formula))
    }

    /// Rule copying the source value unchanged.
    pub fn passthrough(target: impl Into<String>, source: impl Into<String>, op: MergeOp) -> Self {
        Self::new(target, source, op, None)
    }
}

impl fmt::Display for DerivationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}- {}", self.target, self.op, self.source)?;
        if let Some(formula) = &self.formula {
            write!(f, " : {}", formula)?;
        }
        Ok(())
    }
}

/// Display template for a computed attribute.
///
/// `%V` is replaced by the attribute value and `%1`, `%2`, ... by the
/// attributes `<attribute>.1`, `<attribute>.2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTemplate {
    pub attribute: String,
    pub section: String,
    pub format: String,
}

impl NoteTemplate {
    pub fn new(
        attribute: impl Into<String>,
        section: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            section: section.into(),
            format: format.into(),
        }
    }
}

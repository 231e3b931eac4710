//! Progression-table compiler.
//!
//! Each progression is parsed from the values of one field and compiles to a
//! [`Formula`] whose `source` is the character's level in the owning class
//! (or experience points, for [`ExperienceTable`]). Every progression declares
//! how contributions from several classes merge.

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::formula::{Formula, Function};
use crate::parser::{parse_number, parse_whole};
use crate::rules::MergeOp;

/// Declared multi-class merge policy of a progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergePolicy {
    TakeHighest,
    /// Lowest is most favorable (saving throws)
    TakeLowest,
    Sum,
    /// Target is owned by a single class
    Exclusive,
}

impl MergePolicy {
    pub const fn op(&self) -> MergeOp {
        match self {
            Self::TakeHighest => MergeOp::Max,
            Self::TakeLowest => MergeOp::Min,
            Self::Sum => MergeOp::Add,
            Self::Exclusive => MergeOp::Set,
        }
    }
}

/// A per-level formula or step table.
pub trait Progression {
    fn merge_policy(&self) -> MergePolicy;

    /// Value for a concrete input.
    fn value_at(&self, input: u32) -> f64;

    /// Formula computing the value from `source`.
    fn formula(&self) -> Formula;
}

fn expect_arity(values: &[String], expected: usize, shape: &str) -> Result<(), CompileError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(CompileError::structural(format!(
            "{} takes {} values, got {}",
            shape,
            expected,
            values.len()
        )))
    }
}

fn parse_period(text: &str) -> Result<u32, CompileError> {
    let period = parse_whole(text)?;
    if period == 0 {
        return Err(CompileError::semantic("period must be at least 1"));
    }
    Ok(period)
}

/// `floor((source - 1) / period)`, or `source - 1` when `period` is 1.
fn elapsed_periods(period: u32) -> Formula {
    let elapsed = Formula::source() - Formula::number(1.0);
    if period == 1 {
        elapsed
    } else {
        (elapsed / Formula::number(f64::from(period))).floor()
    }
}

fn elapsed_periods_at(level: u32, period: u32) -> f64 {
    ((f64::from(level) - 1.0) / f64::from(period)).floor()
}

/// Scales a formula by a factor, omitting `* 1`.
fn scaled(formula: Formula, factor: f64) -> Formula {
    if factor == 1.0 {
        formula
    } else {
        formula * Formula::number(factor)
    }
}

/// Optional flat bonus from a given level on (`+N@L`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackStep {
    pub bonus: f64,
    pub from_level: u32,
}

impl AttackStep {
    /// Parses `+N@L`; `-` and the empty string mean no step.
    pub fn parse(text: &str) -> Result<Option<Self>, CompileError> {
        let text = text.trim();
        if text.is_empty() || text == "-" {
            return Ok(None);
        }
        let (bonus, level) = text.split_once('@').ok_or_else(|| {
            CompileError::structural(format!("step clause '{}' is not of the form +N@L", text))
        })?;
        let from_level = parse_whole(level)?;
        if from_level == 0 {
            return Err(CompileError::semantic("step level must be at least 1"));
        }
        Ok(Some(Self {
            bonus: parse_number(bonus)?,
            from_level,
        }))
    }
}

/// Attack bonus `[base, increment, period, step]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackProgression {
    pub base: f64,
    pub increment: f64,
    pub period: u32,
    pub step: Option<AttackStep>,
}

impl AttackProgression {
    pub fn parse(values: &[String]) -> Result<Self, CompileError> {
        expect_arity(values, 4, "attack progression [base, increment, period, step]")?;
        Ok(Self {
            base: parse_number(&values[0])?,
            increment: parse_number(&values[1])?,
            period: parse_period(&values[2])?,
            step: AttackStep::parse(&values[3])?,
        })
    }
}

impl Progression for AttackProgression {
    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::TakeHighest
    }

    fn value_at(&self, level: u32) -> f64 {
        let step = match self.step {
            Some(step) if level >= step.from_level => step.bonus,
            _ => 0.0,
        };
        self.base + elapsed_periods_at(level, self.period) * self.increment + step
    }

    fn formula(&self) -> Formula {
        let mut terms = Vec::with_capacity(3);
        if self.base != 0.0 {
            terms.push(Formula::number(self.base));
        }
        if self.increment != 0.0 {
            terms.push(scaled(elapsed_periods(self.period), self.increment));
        }
        if let Some(step) = self.step {
            terms.push(Formula::if_else(
                Formula::source().ge(Formula::number(f64::from(step.from_level))),
                Formula::number(step.bonus),
                Formula::number(0.0),
            ));
        }
        Formula::sum(terms)
    }
}

/// Hit dice `[die, capLevel, perLevelAfterCap]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitDieProgression {
    /// Dice rolled at first level
    pub count: u32,
    pub sides: u32,
    pub cap: u32,
    pub per_level: f64,
}

impl HitDieProgression {
    pub fn parse(values: &[String]) -> Result<Self, CompileError> {
        expect_arity(values, 3, "hit die progression [die, cap, perLevel]")?;
        let (count, sides) = parse_die(&values[0])?;
        let cap = parse_whole(&values[1])?;
        if cap == 0 {
            return Err(CompileError::semantic("hit die cap must be at least 1"));
        }
        Ok(Self {
            count,
            sides,
            cap,
            per_level: parse_number(&values[2])?,
        })
    }

    /// `source > cap ? (source - cap) * perLevel : 0`
    pub fn bonus_formula(&self) -> Formula {
        if self.per_level == 0.0 {
            return Formula::number(0.0);
        }
        let cap = Formula::number(f64::from(self.cap));
        Formula::if_else(
            Formula::source().gt(cap.clone()),
            scaled(Formula::source() - cap, self.per_level),
            Formula::number(0.0),
        )
    }
}

impl Progression for HitDieProgression {
    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Sum
    }

    fn value_at(&self, level: u32) -> f64 {
        f64::from(level.saturating_add(self.count.saturating_sub(1)).min(self.cap))
    }

    fn formula(&self) -> Formula {
        let dice = if self.count > 1 {
            Formula::source() + Formula::number(f64::from(self.count - 1))
        } else {
            Formula::source()
        };
        Formula::call(Function::Min, vec![dice, Formula::number(f64::from(self.cap))])
    }
}

fn without_noise(value: f64) -> f64 {
    const SCALE: f64 = 1e6;
    let snapped = (value * SCALE).round() / SCALE;
    if snapped.is_finite() {
        snapped
    } else {
        value
    }
}

/// Parses `NdS` or `dS`.
fn parse_die(text: &str) -> Result<(u32, u32), CompileError> {
    let text = text.trim();
    let (count, sides) = text
        .split_once(['d', 'D'])
        .ok_or_else(|| CompileError::structural(format!("'{}' is not a die (expected NdS)", text)))?;
    let count = if count.is_empty() {
        1
    } else {
        parse_whole(count)?
    };
    let sides = parse_whole(sides)?;
    if count == 0 || sides == 0 {
        return Err(CompileError::semantic(format!("die '{}' rolls nothing", text)));
    }
    Ok((count, sides))
}

/// Saving throw `[base, decrement, period]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgression {
    pub base: f64,
    pub decrement: f64,
    pub period: u32,
}

impl SaveProgression {
    pub fn parse(values: &[String]) -> Result<Self, CompileError> {
        expect_arity(values, 3, "save progression [base, decrement, period]")?;
        Ok(Self {
            base: parse_number(&values[0])?,
            decrement: parse_number(&values[1])?,
            period: parse_period(&values[2])?,
        })
    }
}

impl Progression for SaveProgression {
    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::TakeLowest
    }

    fn value_at(&self, level: u32) -> f64 {
        self.base - (elapsed_periods_at(level, self.period) * self.decrement).floor()
    }

    fn formula(&self) -> Formula {
        if self.decrement == 0.0 {
            return Formula::number(self.base);
        }
        let reduction = scaled(elapsed_periods(self.period), self.decrement);
        let reduction = if self.decrement.fract() == 0.0 {
            reduction
        } else {
            reduction.floor()
        };
        Formula::number(self.base) - reduction
    }
}

/// Cumulative experience thresholds, one per level starting at level 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceTable {
    pub thresholds: Vec<f64>,
}

impl ExperienceTable {
    /// Parses thresholds and scales them by `multiplier`.
    ///
    /// Scaled values keep their fractional part; only floating-point noise
    /// below a millionth is dropped.
    pub fn parse(values: &[String], multiplier: f64) -> Result<Self, CompileError> {
        let thresholds = values
            .iter()
            .map(|v| parse_number(v).map(|n| without_noise(n * multiplier)))
            .collect::<Result<Vec<_>, _>>()?;
        if thresholds.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(CompileError::semantic(
                "experience thresholds must be strictly ascending",
            ));
        }
        Ok(Self { thresholds })
    }

    /// Experience needed for the level after `level`; past the last
    /// threshold this is a sentinel one interval beyond it.
    pub fn next_at(&self, level: u32) -> f64 {
        self.thresholds
            .get(level as usize)
            .copied()
            .unwrap_or_else(|| self.sentinel())
    }

    fn sentinel(&self) -> f64 {
        match self.thresholds.as_slice() {
            [] => 0.0,
            [only] => only + 1.0,
            [.., before, last] => last + (last - before),
        }
    }

    /// `table(level, sentinel, t1, t2, ...)`
    pub fn next_formula(&self) -> Formula {
        if self.thresholds.is_empty() {
            return Formula::number(0.0);
        }
        Formula::table(Formula::source(), self.sentinel(), &self.thresholds)
    }
}

impl Progression for ExperienceTable {
    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Exclusive
    }

    /// Level reached with `input` experience points.
    fn value_at(&self, experience: u32) -> f64 {
        let experience = f64::from(experience);
        self.thresholds.iter().filter(|t| **t <= experience).count() as f64
    }

    fn formula(&self) -> Formula {
        if self.thresholds.is_empty() {
            return Formula::number(0.0);
        }
        let steps: Vec<(f64, f64)> = self
            .thresholds
            .iter()
            .enumerate()
            .map(|(i, t)| (*t, (i + 1) as f64))
            .collect();
        Formula::steps(Formula::source(), 0.0, &steps)
    }
}

/// Splits a `<group><level>` label such as `MU3` into `("MU", 3)`.
pub fn parse_group_level(label: &str) -> Result<(&str, u32), CompileError> {
    let label = label.trim();
    let digits_at = label
        .find(|c: char| c.is_ascii_digit())
        .filter(|at| *at > 0)
        .ok_or_else(|| {
            CompileError::structural(format!("'{}' is not a caster group and level", label))
        })?;
    let (group, level) = label.split_at(digits_at);
    Ok((group, parse_whole(level)?))
}

/// Spells per day of one spell level for one caster group:
/// `C1:1=1;2=2;4=3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellSlotTable {
    pub group: String,
    pub spell_level: u32,
    /// `(characterLevel, slotCount)`, ascending by level
    pub steps: Vec<(u32, u32)>,
}

impl SpellSlotTable {
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let (label, table) = text.trim().split_once(':').ok_or_else(|| {
            CompileError::structural(format!(
                "spell slots '{}' are not of the form <group><level>:<table>",
                text
            ))
        })?;
        let (group, spell_level) = parse_group_level(label)?;

        let mut steps: Vec<(u32, u32)> = Vec::new();
        for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (level, count) = entry.split_once('=').ok_or_else(|| {
                CompileError::structural(format!("slot entry '{}' has no '='", entry))
            })?;
            let level = parse_whole(level)?;
            if steps.last().is_some_and(|(previous, _)| *previous >= level) {
                return Err(CompileError::semantic(format!(
                    "spell slot levels for {} must be strictly ascending",
                    label
                )));
            }
            steps.push((level, parse_whole(count)?));
        }

        Ok(Self {
            group: group.to_string(),
            spell_level,
            steps,
        })
    }

    /// `<group><level>`, e.g. `C1`.
    pub fn label(&self) -> String {
        format!("{}{}", self.group, self.spell_level)
    }
}

impl Progression for SpellSlotTable {
    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Sum
    }

    fn value_at(&self, level: u32) -> f64 {
        self.steps
            .iter()
            .take_while(|(at, _)| *at <= level)
            .last()
            .map_or(0.0, |(_, count)| f64::from(*count))
    }

    fn formula(&self) -> Formula {
        if self.steps.is_empty() {
            return Formula::number(0.0);
        }
        let steps: Vec<(f64, f64)> = self
            .steps
            .iter()
            .map(|(level, count)| (f64::from(*level), f64::from(*count)))
            .collect();
        Formula::steps(Formula::source(), 0.0, &steps)
    }
}

/// Weapon proficiencies `[initial, period, penalty]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyProgression {
    pub initial: f64,
    pub period: u32,
    /// Attack modifier with a non-proficient weapon
    pub penalty: f64,
}

impl ProficiencyProgression {
    pub fn parse(values: &[String]) -> Result<Self, CompileError> {
        expect_arity(values, 3, "weapon proficiency [initial, period, penalty]")?;
        Ok(Self {
            initial: parse_number(&values[0])?,
            period: parse_period(&values[1])?,
            penalty: parse_number(&values[2])?,
        })
    }

    pub fn penalty_formula(&self) -> Formula {
        Formula::number(self.penalty)
    }
}

impl Progression for ProficiencyProgression {
    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::TakeHighest
    }

    fn value_at(&self, level: u32) -> f64 {
        self.initial + elapsed_periods_at(level, self.period)
    }

    fn formula(&self) -> Formula {
        Formula::number(self.initial) + elapsed_periods(self.period)
    }
}

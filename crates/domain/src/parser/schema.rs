//! Field schemas per content kind and the typed values they parse into.

use serde::{Deserialize, Serialize};

use crate::conditional::compile_expression;
use crate::content::ContentKind;
use crate::error::CompileError;
use crate::formula::Formula;
use crate::progression::{
    AttackProgression, ExperienceTable, HitDieProgression, ProficiencyProgression,
    SaveProgression, SpellSlotTable,
};

use super::{parse_number, parse_whole, ParseOptions};

/// Shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    /// Exactly one value
    Text,
    /// Exactly one integer or decimal
    Number,
    /// Ordered list, possibly empty
    List,
    /// `L:Name`, `Name` or `predicate ? L:Name` entries
    Leveled,
    Attack,
    HitDie,
    Save,
    Experience,
    /// `C1:1=1;2=2` entries
    SpellSlots,
    Proficiency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: FieldShape,
    pub required: bool,
}

const fn required(name: &'static str, shape: FieldShape) -> FieldSpec {
    FieldSpec {
        name,
        shape,
        required: true,
    }
}

const fn optional(name: &'static str, shape: FieldShape) -> FieldSpec {
    FieldSpec {
        name,
        shape,
        required: false,
    }
}

/// Saving throw categories, each a required class field.
pub const SAVE_CATEGORIES: [&str; 5] = ["Breath", "Death", "Petrification", "Spell", "Wand"];

const CLASS_FIELDS: &[FieldSpec] = &[
    optional("Require", FieldShape::List),
    required("Experience", FieldShape::Experience),
    required("HitDie", FieldShape::HitDie),
    required("Attack", FieldShape::Attack),
    optional("WeaponProficiency", FieldShape::Proficiency),
    required("Breath", FieldShape::Save),
    required("Death", FieldShape::Save),
    required("Petrification", FieldShape::Save),
    required("Spell", FieldShape::Save),
    required("Wand", FieldShape::Save),
    optional("Features", FieldShape::Leveled),
    optional("Languages", FieldShape::List),
    optional("SpellSlots", FieldShape::SpellSlots),
];

const RACE_FIELDS: &[FieldSpec] = &[
    optional("Require", FieldShape::List),
    optional("Features", FieldShape::Leveled),
    optional("Languages", FieldShape::List),
];

const SPELL_FIELDS: &[FieldSpec] = &[
    required("School", FieldShape::Text),
    required("Level", FieldShape::List),
    required("Description", FieldShape::Text),
    optional("Duration", FieldShape::List),
    optional("Effect", FieldShape::List),
    optional("Range", FieldShape::List),
];

const WEAPON_FIELDS: &[FieldSpec] = &[
    required("Category", FieldShape::Text),
    required("Damage", FieldShape::Text),
    optional("Range", FieldShape::Number),
];

const ARMOR_FIELDS: &[FieldSpec] = &[
    required("AC", FieldShape::Number),
    optional("Move", FieldShape::Number),
    optional("Weight", FieldShape::Number),
];

const SHIELD_FIELDS: &[FieldSpec] = &[
    required("AC", FieldShape::Number),
    optional("Weight", FieldShape::Number),
];

const SKILL_FIELDS: &[FieldSpec] = &[
    optional("Ability", FieldShape::Text),
    optional("Class", FieldShape::List),
];

const FEATURE_FIELDS: &[FieldSpec] = &[
    optional("Section", FieldShape::List),
    optional("Note", FieldShape::List),
    optional("Effects", FieldShape::List),
    optional("Type", FieldShape::List),
];

const GOODY_FIELDS: &[FieldSpec] = &[
    required("Pattern", FieldShape::Text),
    optional("Effect", FieldShape::Text),
    required("Value", FieldShape::Text),
    required("Attribute", FieldShape::List),
    optional("Section", FieldShape::List),
    optional("Note", FieldShape::List),
];

/// Allowed fields for a content kind.
pub fn schema(kind: ContentKind) -> &'static [FieldSpec] {
    match kind {
        ContentKind::Class => CLASS_FIELDS,
        ContentKind::Race => RACE_FIELDS,
        ContentKind::Spell => SPELL_FIELDS,
        ContentKind::Weapon => WEAPON_FIELDS,
        ContentKind::Armor => ARMOR_FIELDS,
        ContentKind::Shield => SHIELD_FIELDS,
        ContentKind::Skill => SKILL_FIELDS,
        ContentKind::Feature => FEATURE_FIELDS,
        ContentKind::Language => &[],
        ContentKind::Goody => GOODY_FIELDS,
    }
}

/// A feature granted at a level, optionally only when a predicate holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeveledFeature {
    pub level: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Formula>,
}

impl LeveledFeature {
    pub fn parse(entry: &str) -> Result<Self, CompileError> {
        let entry = entry.trim();
        let (condition, granted) = match entry.rfind('?') {
            Some(at) => (
                Some(compile_expression(&entry[..at])?),
                entry[at + 1..].trim(),
            ),
            None => (None, entry),
        };

        let (level, name) = match granted.split_once(':') {
            Some((level, name)) if is_level(level) => (parse_whole(level)?, name.trim()),
            _ => (1, granted),
        };
        if level == 0 {
            return Err(CompileError::semantic(format!(
                "feature '{}' has level 0",
                name
            )));
        }
        if name.is_empty() {
            return Err(CompileError::structural(format!(
                "feature entry '{}' has no name",
                entry
            )));
        }

        Ok(Self {
            level,
            name: name.to_string(),
            condition,
        })
    }
}

fn is_level(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "shape", content = "value")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
    Leveled(Vec<LeveledFeature>),
    Attack(AttackProgression),
    HitDie(HitDieProgression),
    Save(SaveProgression),
    Experience(ExperienceTable),
    SpellSlots(Vec<SpellSlotTable>),
    Proficiency(ProficiencyProgression),
}

impl FieldShape {
    /// Converts the raw values of one field.
    pub fn convert(
        &self,
        values: Vec<String>,
        options: &ParseOptions,
    ) -> Result<FieldValue, CompileError> {
        match self {
            Self::Text => Ok(FieldValue::Text(single(values)?)),
            Self::Number => Ok(FieldValue::Number(parse_number(&single(values)?)?)),
            Self::List => Ok(FieldValue::List(values)),
            Self::Leveled => values
                .iter()
                .map(|entry| LeveledFeature::parse(entry))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Leveled),
            Self::Attack => AttackProgression::parse(&values).map(FieldValue::Attack),
            Self::HitDie => HitDieProgression::parse(&values).map(FieldValue::HitDie),
            Self::Save => SaveProgression::parse(&values).map(FieldValue::Save),
            Self::Experience => ExperienceTable::parse(&values, options.experience_multiplier)
                .map(FieldValue::Experience),
            Self::SpellSlots => values
                .iter()
                .map(|entry| SpellSlotTable::parse(entry))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::SpellSlots),
            Self::Proficiency => {
                ProficiencyProgression::parse(&values).map(FieldValue::Proficiency)
            }
        }
    }
}

fn single(values: Vec<String>) -> Result<String, CompileError> {
    let count = values.len();
    let mut values = values.into_iter();
    match (values.next(), count) {
        (Some(value), 1) => Ok(value),
        _ => Err(CompileError::structural(format!(
            "expected a single value, got {}",
            count
        ))),
    }
}

//! Compiler settings.
//!
//! Settings are plain data with serde defaults so a host can ship a partial
//! JSON file and inherit everything it leaves out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sheetsmith_domain::ParseOptions;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Tunables shared by every choice compiler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompilerSettings {
    /// Factor applied to experience thresholds in class records
    #[serde(default = "default_experience_multiplier")]
    pub experience_multiplier: f64,

    /// Abilities a skill may be keyed on; each has a `<name>Modifier` attribute
    #[serde(default = "default_ability_names")]
    pub ability_names: Vec<String>,

    /// Note section tags a feature or goody may use
    #[serde(default = "default_sections")]
    pub sections: Vec<String>,

    // ============================================================================
    // Equipment
    // ============================================================================
    #[serde(default = "default_weapon_categories")]
    pub weapon_categories: Vec<String>,

    /// Categories attacking with the ranged ability
    #[serde(default = "default_ranged_categories")]
    pub ranged_categories: Vec<String>,

    #[serde(default = "default_melee_ability")]
    pub melee_ability: String,

    #[serde(default = "default_ranged_ability")]
    pub ranged_ability: String,

    // ============================================================================
    // Magic
    // ============================================================================
    /// Caster group code to casting class, e.g. `C` to `Cleric`
    #[serde(default = "default_caster_groups")]
    pub caster_groups: BTreeMap<String, String>,

    #[serde(default = "default_spell_schools")]
    pub spell_schools: Vec<String>,
}

fn default_experience_multiplier() -> f64 { 1000.0 }
fn default_melee_ability() -> String { "strength".to_string() }
fn default_ranged_ability() -> String { "dexterity".to_string() }

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_ability_names() -> Vec<String> {
    strings(&[
        "strength",
        "intelligence",
        "wisdom",
        "dexterity",
        "constitution",
        "charisma",
    ])
}

fn default_sections() -> Vec<String> {
    strings(&[
        "ability",
        "combat",
        "feature",
        "magic",
        "save",
        "skill",
        "validation",
    ])
}

fn default_weapon_categories() -> Vec<String> {
    strings(&["Li", "1h", "2h", "R", "Un"])
}

fn default_ranged_categories() -> Vec<String> {
    strings(&["R"])
}

fn default_caster_groups() -> BTreeMap<String, String> {
    [
        ("C", "Cleric"),
        ("D", "Druid"),
        ("I", "Illusionist"),
        ("MU", "Magic-User"),
    ]
    .into_iter()
    .map(|(code, class)| (code.to_string(), class.to_string()))
    .collect()
}

fn default_spell_schools() -> Vec<String> {
    strings(&[
        "Abjuration",
        "Alteration",
        "Conjuration",
        "Divination",
        "Enchantment",
        "Evocation",
        "Illusion",
        "Necromancy",
    ])
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            experience_multiplier: default_experience_multiplier(),
            ability_names: default_ability_names(),
            sections: default_sections(),
            weapon_categories: default_weapon_categories(),
            ranged_categories: default_ranged_categories(),
            melee_ability: default_melee_ability(),
            ranged_ability: default_ranged_ability(),
            caster_groups: default_caster_groups(),
            spell_schools: default_spell_schools(),
        }
    }
}

impl CompilerSettings {
    /// Parses and validates settings from JSON; absent fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.experience_multiplier.is_finite() && self.experience_multiplier > 0.0) {
            return Err(SettingsError::Invalid(format!(
                "experience multiplier must be positive, got {}",
                self.experience_multiplier
            )));
        }
        if let Some(category) = self
            .ranged_categories
            .iter()
            .find(|c| !self.weapon_categories.contains(*c))
        {
            return Err(SettingsError::Invalid(format!(
                "ranged category '{}' is not a weapon category",
                category
            )));
        }
        for ability in [&self.melee_ability, &self.ranged_ability] {
            if !self.is_ability(ability) {
                return Err(SettingsError::Invalid(format!(
                    "'{}' is not a known ability",
                    ability
                )));
            }
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            experience_multiplier: self.experience_multiplier,
        }
    }

    pub fn is_ability(&self, name: &str) -> bool {
        self.ability_names.iter().any(|a| a == name)
    }

    pub fn is_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s == name)
    }

    pub fn is_ranged(&self, category: &str) -> bool {
        self.ranged_categories.iter().any(|c| c == category)
    }

    pub fn caster_class(&self, group: &str) -> Option<&str> {
        self.caster_groups.get(group).map(String::as_str)
    }

    /// Four-letter abbreviation of a known school.
    pub fn school_abbreviation(&self, school: &str) -> Option<String> {
        self.spell_schools
            .iter()
            .find(|s| s.as_str() == school)
            .map(|s| s.chars().take(4).collect())
    }
}

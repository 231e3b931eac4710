//! Content records: the static input stream of the compiler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// Kind of a content record.
///
/// Closed set; every kind has exactly one choice compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    Class,
    Race,
    Spell,
    Weapon,
    Armor,
    Shield,
    Skill,
    Feature,
    Language,
    Goody,
}

impl ContentKind {
    pub const ALL: [ContentKind; 10] = [
        ContentKind::Class,
        ContentKind::Race,
        ContentKind::Spell,
        ContentKind::Weapon,
        ContentKind::Armor,
        ContentKind::Shield,
        ContentKind::Skill,
        ContentKind::Feature,
        ContentKind::Language,
        ContentKind::Goody,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Race => "race",
            Self::Spell => "spell",
            Self::Weapon => "weapon",
            Self::Armor => "armor",
            Self::Shield => "shield",
            Self::Skill => "skill",
            Self::Feature => "feature",
            Self::Language => "language",
            Self::Goody => "goody",
        }
    }

    /// Name of the selection attribute the host sets when a record of this
    /// kind is chosen (e.g. `race`, `armor`).
    pub const fn selection_attribute(&self) -> &'static str {
        match self {
            Self::Class => "levels",
            Self::Race => "race",
            Self::Spell => "spells",
            Self::Weapon => "weapons",
            Self::Armor => "armor",
            Self::Shield => "shield",
            Self::Skill => "skills",
            Self::Feature => "features",
            Self::Language => "languages",
            Self::Goody => "goodies",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let singular = match lower.as_str() {
            "classes" => "class",
            "races" => "race",
            "spells" => "spell",
            "weapons" => "weapon",
            "armors" => "armor",
            "shields" => "shield",
            "skills" => "skill",
            "features" => "feature",
            "languages" => "language",
            "goodies" => "goody",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == singular)
            .ok_or_else(|| CompileError::semantic(format!("unknown content kind '{}'", s)))
    }
}

/// One named content item with its raw textual specification.
///
/// Records are created once from static tables and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    kind: ContentKind,
    name: String,
    raw_spec: String,
}

impl ContentRecord {
    pub fn new(kind: ContentKind, name: impl Into<String>, raw_spec: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            raw_spec: raw_spec.into(),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_spec(&self) -> &str {
        &self.raw_spec
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.kind, self.name.clone())
    }
}

/// Identity of a record: names are unique per kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub kind: ContentKind,
    pub name: String,
}

impl RecordKey {
    pub fn new(kind: ContentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_singular_and_plural() {
        assert_eq!("Class".parse::<ContentKind>(), Ok(ContentKind::Class));
        assert_eq!("goodies".parse::<ContentKind>(), Ok(ContentKind::Goody));
        assert_eq!(" Weapons ".parse::<ContentKind>(), Ok(ContentKind::Weapon));
    }

    #[test]
    fn unknown_kind_is_semantic_error() {
        let err = "deity".parse::<ContentKind>().expect_err("deity is not a kind");
        assert!(matches!(err, CompileError::SemanticValidation(_)));
    }

    #[test]
    fn record_key_display() {
        let record = ContentRecord::new(ContentKind::Race, "Dwarf", "Languages=Common,Dwarf");
        assert_eq!(record.key().to_string(), "race 'Dwarf'");
        assert_eq!(record.raw_spec(), "Languages=Common,Dwarf");
    }
}

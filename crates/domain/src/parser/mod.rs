//! Attribute-string parser.
//!
//! Every content record carries a raw specification of whitespace-separated
//! `Key=Value` tokens:
//!
//! ```text
//! Experience=0,1.6,3 HitDie=d10,9,3 Features="1:Armor Proficiency",9:Extra
//! ```
//!
//! Double-quoted segments keep spaces and commas verbatim; top-level commas
//! split a value into an ordered list. [`FieldTable::parse`] validates the
//! tokens against the kind's schema and converts each into a typed
//! [`FieldValue`] in a single pass.

mod schema;

pub use schema::{schema, FieldShape, FieldSpec, FieldValue, LeveledFeature, SAVE_CATEGORIES};

use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::error::CompileError;
use crate::progression::{
    AttackProgression, ExperienceTable, HitDieProgression, ProficiencyProgression,
    SaveProgression, SpellSlotTable,
};

/// Parses an integer or decimal.
pub fn parse_number(text: &str) -> Result<f64, CompileError> {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('+')
        .unwrap_or(trimmed)
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| CompileError::semantic(format!("'{}' is not a number", text)))
}

/// Parses a non-negative whole number.
pub fn parse_whole(text: &str) -> Result<u32, CompileError> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| CompileError::semantic(format!("'{}' is not a whole number", text)))
}

/// One `Key=Value` token before schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub name: String,
    pub values: Vec<String>,
}

/// Splits a raw specification into fields.
pub fn tokenize(raw: &str) -> Result<Vec<RawField>, CompileError> {
    let mut fields = Vec::new();
    let mut chars = raw.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        let mut has_separator = false;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '=' {
                has_separator = true;
                break;
            }
            name.push(c);
        }
        if !has_separator {
            return Err(CompileError::structural(format!(
                "token '{}' has no '='",
                name
            )));
        }
        if name.is_empty() {
            return Err(CompileError::structural("token has an empty key"));
        }

        let mut values = Vec::new();
        let mut current = String::new();
        let mut touched = false;
        let mut quoted = false;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() && !quoted {
                break;
            }
            chars.next();
            match c {
                '"' => {
                    quoted = !quoted;
                    touched = true;
                }
                ',' if !quoted => {
                    values.push(std::mem::take(&mut current));
                    touched = true;
                }
                c => {
                    current.push(c);
                    touched = true;
                }
            }
        }
        if quoted {
            return Err(CompileError::structural(format!(
                "unterminated quote in field '{}'",
                name
            )));
        }
        if touched {
            values.push(current);
        }

        fields.push(RawField { name, values });
    }

    Ok(fields)
}

/// Parser settings supplied by the compiler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    /// Factor applied to experience thresholds
    pub experience_multiplier: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            experience_multiplier: 1000.0,
        }
    }
}

/// Schema-validated, typed fields of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTable {
    kind: ContentKind,
    fields: Vec<(&'static str, FieldValue)>,
}

impl FieldTable {
    pub fn parse(kind: ContentKind, raw: &str) -> Result<Self, CompileError> {
        Self::parse_with(kind, raw, &ParseOptions::default())
    }

    pub fn parse_with(
        kind: ContentKind,
        raw: &str,
        options: &ParseOptions,
    ) -> Result<Self, CompileError> {
        let specs = schema(kind);
        let mut fields: Vec<(&'static str, FieldValue)> = Vec::new();

        for raw_field in tokenize(raw)? {
            let spec = specs
                .iter()
                .find(|spec| spec.name == raw_field.name)
                .ok_or_else(|| {
                    CompileError::semantic(format!(
                        "unknown field '{}' for {}",
                        raw_field.name, kind
                    ))
                })?;
            if fields.iter().any(|(name, _)| *name == spec.name) {
                return Err(CompileError::structural(format!(
                    "field '{}' appears more than once",
                    spec.name
                )));
            }
            let value = spec
                .shape
                .convert(raw_field.values, options)
                .map_err(|e| e.in_field(spec.name))?;
            fields.push((spec.name, value));
        }

        if let Some(missing) = specs
            .iter()
            .find(|spec| spec.required && !fields.iter().any(|(name, _)| *name == spec.name))
        {
            return Err(CompileError::semantic(format!(
                "missing required field '{}'",
                missing.name
            )));
        }

        Ok(Self { kind, fields })
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    fn missing(&self, name: &str) -> CompileError {
        CompileError::semantic(format!("{} has no field '{}'", self.kind, name))
    }

    fn wrong_shape(name: &str, expected: &str) -> CompileError {
        CompileError::semantic(format!("field '{}' is not {}", name, expected))
    }

    pub fn text(&self, name: &str) -> Result<&str, CompileError> {
        self.optional_text(name)?
            .ok_or_else(|| self.missing(name))
    }

    pub fn optional_text(&self, name: &str) -> Result<Option<&str>, CompileError> {
        match self.get(name) {
            None => Ok(None),
            Some(FieldValue::Text(text)) => Ok(Some(text)),
            Some(_) => Err(Self::wrong_shape(name, "text")),
        }
    }

    pub fn optional_number(&self, name: &str) -> Result<Option<f64>, CompileError> {
        match self.get(name) {
            None => Ok(None),
            Some(FieldValue::Number(n)) => Ok(Some(*n)),
            Some(_) => Err(Self::wrong_shape(name, "a number")),
        }
    }

    pub fn number(&self, name: &str) -> Result<f64, CompileError> {
        self.optional_number(name)?
            .ok_or_else(|| self.missing(name))
    }

    /// List values; an absent list field is empty.
    pub fn list(&self, name: &str) -> Result<&[String], CompileError> {
        match self.get(name) {
            None => Ok(&[]),
            Some(FieldValue::List(values)) => Ok(values),
            Some(_) => Err(Self::wrong_shape(name, "a list")),
        }
    }

    pub fn leveled(&self, name: &str) -> Result<&[LeveledFeature], CompileError> {
        match self.get(name) {
            None => Ok(&[]),
            Some(FieldValue::Leveled(features)) => Ok(features),
            Some(_) => Err(Self::wrong_shape(name, "a leveled feature list")),
        }
    }

    pub fn attack(&self, name: &str) -> Result<&AttackProgression, CompileError> {
        match self.get(name) {
            Some(FieldValue::Attack(attack)) => Ok(attack),
            Some(_) => Err(Self::wrong_shape(name, "an attack progression")),
            None => Err(self.missing(name)),
        }
    }

    pub fn hit_die(&self, name: &str) -> Result<&HitDieProgression, CompileError> {
        match self.get(name) {
            Some(FieldValue::HitDie(hit_die)) => Ok(hit_die),
            Some(_) => Err(Self::wrong_shape(name, "a hit die progression")),
            None => Err(self.missing(name)),
        }
    }

    pub fn save(&self, name: &str) -> Result<&SaveProgression, CompileError> {
        match self.get(name) {
            Some(FieldValue::Save(save)) => Ok(save),
            Some(_) => Err(Self::wrong_shape(name, "a save progression")),
            None => Err(self.missing(name)),
        }
    }

    pub fn experience(&self, name: &str) -> Result<&ExperienceTable, CompileError> {
        match self.get(name) {
            Some(FieldValue::Experience(table)) => Ok(table),
            Some(_) => Err(Self::wrong_shape(name, "an experience table")),
            None => Err(self.missing(name)),
        }
    }

    pub fn spell_slots(&self, name: &str) -> Result<&[SpellSlotTable], CompileError> {
        match self.get(name) {
            None => Ok(&[]),
            Some(FieldValue::SpellSlots(tables)) => Ok(tables),
            Some(_) => Err(Self::wrong_shape(name, "a spell slot list")),
        }
    }

    pub fn proficiency(
        &self,
        name: &str,
    ) -> Result<Option<&ProficiencyProgression>, CompileError> {
        match self.get(name) {
            None => Ok(None),
            Some(FieldValue::Proficiency(progression)) => Ok(Some(progression)),
            Some(_) => Err(Self::wrong_shape(name, "a proficiency progression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::Progression;

    fn raw(name: &str, values: &[&str]) -> RawField {
        RawField {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn tokenizes_lists_and_quotes() {
        let fields =
            tokenize(r#"School=Evocation Level=C1,"MU 2" Description="Heals, then $E""#)
                .expect("tokenizes");
        assert_eq!(
            fields,
            vec![
                raw("School", &["Evocation"]),
                raw("Level", &["C1", "MU 2"]),
                raw("Description", &["Heals, then $E"]),
            ]
        );
    }

    #[test]
    fn empty_values_and_trailing_commas() {
        let fields = tokenize(r#"Languages= Attack=-1,2,4, Note="""#).expect("tokenizes");
        assert_eq!(fields[0], raw("Languages", &[]));
        assert_eq!(fields[1], raw("Attack", &["-1", "2", "4", ""]));
        assert_eq!(fields[2], raw("Note", &[""]));
    }

    #[test]
    fn bare_key_is_structural() {
        let err = tokenize("AC=5 Heavy").expect_err("bare key");
        assert!(matches!(err, CompileError::StructuralParse(_)));
        assert!(err.to_string().contains("'Heavy'"));
    }

    #[test]
    fn unterminated_quote_is_structural() {
        let err = tokenize(r#"Description="never closed"#).expect_err("open quote");
        assert!(matches!(err, CompileError::StructuralParse(_)));
    }

    #[test]
    fn parses_class_into_typed_fields() {
        let table = FieldTable::parse(
            ContentKind::Class,
            "Experience=0,2,4 HitDie=d10,9,3 Attack=0,1,1,- \
             Breath=17,1.5,2 Death=14,1.5,2 Petrification=15,1.5,2 Spell=17,1.5,2 Wand=16,1.5,2 \
             Features=\"1:Armor Proficiency\",\"strength >= 17 ? 1:Exceptional Strength\" \
             SpellSlots=C1:9=1;11=2",
        )
        .expect("parses");

        assert_eq!(table.kind(), ContentKind::Class);
        assert_eq!(table.experience("Experience").map(|t| t.value_at(2000)), Ok(2.0));
        assert_eq!(table.attack("Attack").map(|a| a.value_at(5)), Ok(4.0));
        assert_eq!(table.leveled("Features").map(|f| f.len()), Ok(2));
        assert_eq!(table.spell_slots("SpellSlots").map(|s| s.len()), Ok(1));
        assert_eq!(table.list("Languages"), Ok(&[][..]));
        assert_eq!(table.proficiency("WeaponProficiency"), Ok(None));
    }

    #[test]
    fn experience_multiplier_comes_from_options() {
        let options = ParseOptions {
            experience_multiplier: 1.0,
        };
        let table = FieldTable::parse_with(
            ContentKind::Class,
            "Experience=0,2000 HitDie=d8,9,2 Attack=0,1,2, Breath=16,1,3 Death=13,1,3 \
             Petrification=12,1,3 Spell=15,1,3 Wand=14,1,3",
            &options,
        )
        .expect("parses");
        assert_eq!(
            table.experience("Experience").map(|t| t.thresholds.clone()),
            Ok(vec![0.0, 2000.0])
        );
    }

    #[test]
    fn unknown_field_is_semantic() {
        let err = FieldTable::parse(ContentKind::Armor, "AC=5 Color=red").expect_err("unknown");
        assert!(matches!(err, CompileError::SemanticValidation(_)));
        assert!(err.to_string().contains("Color"));
    }

    #[test]
    fn duplicate_field_is_structural() {
        let err = FieldTable::parse(ContentKind::Armor, "AC=5 AC=6").expect_err("duplicate");
        assert!(matches!(err, CompileError::StructuralParse(_)));
    }

    #[test]
    fn missing_required_field_is_semantic() {
        let err = FieldTable::parse(ContentKind::Weapon, "Category=1h").expect_err("no damage");
        assert!(matches!(err, CompileError::SemanticValidation(_)));
        assert!(err.to_string().contains("Damage"));
    }

    #[test]
    fn numeric_errors_name_the_field() {
        let err = FieldTable::parse(ContentKind::Armor, "AC=five").expect_err("not numeric");
        assert_eq!(
            err,
            CompileError::semantic("field 'AC': 'five' is not a number")
        );
    }

    #[test]
    fn accessors_reject_wrong_shape() {
        let table = FieldTable::parse(ContentKind::Armor, "AC=5 Weight=40").expect("parses");
        assert_eq!(table.number("AC"), Ok(5.0));
        assert_eq!(table.optional_number("Move"), Ok(None));
        assert!(table.text("AC").is_err());
        assert!(table.number("Move").is_err());
    }

    #[test]
    fn language_takes_no_fields() {
        assert!(FieldTable::parse(ContentKind::Language, "").is_ok());
        assert!(FieldTable::parse(ContentKind::Language, "Script=Runic").is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("+2"), Ok(2.0));
        assert_eq!(parse_number(" -1.5 "), Ok(-1.5));
        assert!(parse_number("NaN").is_err());
        assert!(parse_whole("-1").is_err());
    }
}

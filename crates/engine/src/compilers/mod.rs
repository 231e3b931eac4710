//! Choice compilers, one per content kind.
//!
//! Each compiler turns a record's typed [`FieldTable`] into a complete
//! [`RecordOutput`]. Compilers never touch a sink: the dispatcher emits the
//! output only after the whole record compiled.

mod armor;
mod class;
mod feature;
mod goody;
mod language;
mod notes;
pub mod patterns;
mod race;
mod skill;
mod spell;
mod weapon;

use std::collections::{BTreeMap, BTreeSet};

use sheetsmith_domain::{
    compile_expression, CompileError, ContentKind, ContentRecord, DerivationRule, FieldTable,
    Formula, MergeOp, NoteTemplate,
};

use crate::infrastructure::settings::CompilerSettings;

/// Names of every record in the content stream, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    names: BTreeMap<ContentKind, BTreeSet<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ContentRecord>) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog.insert(record.kind(), record.name());
        }
        catalog
    }

    pub fn insert(&mut self, kind: ContentKind, name: &str) {
        self.names.entry(kind).or_default().insert(name.to_string());
    }

    pub fn contains(&self, kind: ContentKind, name: &str) -> bool {
        self.names.get(&kind).is_some_and(|names| names.contains(name))
    }

    pub fn names(&self, kind: ContentKind) -> impl Iterator<Item = &str> {
        self.names
            .get(&kind)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    /// Fails with a semantic error naming the undefined reference.
    pub fn require(&self, kind: ContentKind, name: &str) -> Result<(), CompileError> {
        if self.contains(kind, name) {
            Ok(())
        } else {
            Err(CompileError::semantic(format!(
                "undefined {} '{}'",
                kind, name
            )))
        }
    }
}

/// Read-only inputs shared by every compiler.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    pub settings: &'a CompilerSettings,
    pub catalog: &'a Catalog,
}

/// Complete output of one record, built before anything is emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOutput {
    pub sections: Vec<String>,
    pub rules: Vec<DerivationRule>,
    pub notes: Vec<NoteTemplate>,
    pub choices: Vec<ContentRecord>,
}

impl RecordOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(
        &mut self,
        target: impl Into<String>,
        source: impl Into<String>,
        op: MergeOp,
        formula: Formula,
    ) {
        self.rules
            .push(DerivationRule::computed(target, source, op, formula));
    }

    /// Rule copying the source value unchanged.
    pub fn passthrough(&mut self, target: impl Into<String>, source: impl Into<String>, op: MergeOp) {
        self.rules
            .push(DerivationRule::passthrough(target, source, op));
    }

    /// Adds a note and registers its section once.
    pub fn note(&mut self, attribute: impl Into<String>, section: &str, format: impl Into<String>) {
        if !self.sections.iter().any(|s| s == section) {
            self.sections.push(section.to_string());
        }
        self.notes.push(NoteTemplate::new(attribute, section, format));
    }

    pub fn choice(&mut self, kind: ContentKind, name: impl Into<String>, raw_spec: impl Into<String>) {
        self.choices.push(ContentRecord::new(kind, name, raw_spec));
    }
}

/// Compiles one record's fields with the compiler for its kind.
pub fn compile_fields(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    match record.kind() {
        ContentKind::Class => class::compile(record, fields, ctx),
        ContentKind::Race => race::compile(record, fields, ctx),
        ContentKind::Spell => spell::compile(record, fields, ctx),
        ContentKind::Weapon => weapon::compile(record, fields, ctx),
        ContentKind::Armor => armor::compile_armor(record, fields, ctx),
        ContentKind::Shield => armor::compile_shield(record, fields, ctx),
        ContentKind::Skill => skill::compile(record, fields, ctx),
        ContentKind::Feature => feature::compile(record, fields, ctx),
        ContentKind::Language => language::compile(record, fields, ctx),
        ContentKind::Goody => goody::compile(record, fields, ctx),
    }
}

/// `<prefix>Requirements` validation note for a `Require` list.
///
/// The note attribute becomes 1 when the record is selected and any
/// requirement fails.
fn requirements(
    out: &mut RecordOutput,
    requirements: &[String],
    prefix: &str,
    source: &str,
) -> Result<(), CompileError> {
    if requirements.is_empty() {
        return Ok(());
    }
    let conditions = requirements
        .iter()
        .map(|text| compile_expression(text).map_err(|e| e.in_field("Require")))
        .collect::<Result<Vec<_>, _>>()?;
    let description = conditions
        .iter()
        .map(Formula::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    let all_met = conditions
        .into_iter()
        .reduce(Formula::and)
        .unwrap_or_else(|| Formula::number(1.0));

    let attribute = format!("validationNotes.{}Requirements", prefix);
    out.rule(
        attribute.clone(),
        source,
        MergeOp::Set,
        Formula::when(all_met.not(), Formula::number(1.0)),
    );
    out.note(attribute, "validation", format!("Requires {}", description));
    Ok(())
}

/// `languages.<L>` grants, checked against the catalog.
fn grant_languages(
    out: &mut RecordOutput,
    languages: &[String],
    source: &str,
    ctx: &CompileContext<'_>,
) -> Result<(), CompileError> {
    for language in languages {
        ctx.catalog
            .require(ContentKind::Language, language)
            .map_err(|e| e.in_field("Languages"))?;
        out.rule(
            format!("languages.{}", language),
            source,
            MergeOp::Max,
            Formula::number(1.0),
        );
    }
    Ok(())
}

//! Spell compiler.
//!
//! A spell listed for several caster groups (`Level=C3,MU4`) compiles into one
//! variant per group and level. Description placeholders `$D`, `$E` and `$R`
//! take the variant's `Duration`/`Effect`/`Range` override (`C3:1 turn`) when
//! one exists, else the shared unprefixed entry.

use sheetsmith_domain::naming::member;
use sheetsmith_domain::{
    compile_note, parse_group_level, CompileError, ContentKind, ContentRecord, FieldTable, MergeOp,
};

use super::{CompileContext, RecordOutput};

const PLACEHOLDERS: [(&str, &str); 3] = [("$D", "Duration"), ("$E", "Effect"), ("$R", "Range")];

/// Splits `C3:text` into its label and text; entries without a label prefix
/// are shared by every variant.
fn split_override(entry: &str) -> Option<(&str, &str)> {
    let (label, text) = entry.split_once(':')?;
    let digits_at = label.find(|c: char| c.is_ascii_digit())?;
    let is_label = digits_at > 0
        && label[..digits_at].chars().all(|c| c.is_ascii_alphabetic())
        && label[digits_at..].chars().all(|c| c.is_ascii_digit());
    is_label.then_some((label, text))
}

fn pick<'a>(entries: &'a [String], label: &str) -> Option<&'a str> {
    entries
        .iter()
        .find_map(|entry| match split_override(entry) {
            Some((l, text)) if l == label => Some(text),
            _ => None,
        })
        .or_else(|| {
            entries
                .iter()
                .find(|entry| split_override(entry).is_none())
                .map(String::as_str)
        })
}

/// Replaces every placeholder of `description` in one pass, so override
/// text is never scanned for placeholders itself.
fn substitute(description: &str, fields: &FieldTable, label: &str) -> Result<String, CompileError> {
    let mut text = String::with_capacity(description.len());
    let mut rest = description;
    while let Some(at) = rest.find('$') {
        text.push_str(&rest[..at]);
        rest = &rest[at..];
        let Some((placeholder, field)) = PLACEHOLDERS
            .iter()
            .copied()
            .find(|(placeholder, _)| rest.starts_with(*placeholder))
        else {
            text.push('$');
            rest = &rest[1..];
            continue;
        };
        let value = pick(fields.list(field)?, label).ok_or_else(|| {
            CompileError::semantic(format!("{} has no {} entry for {}", placeholder, field, label))
                .in_field("Description")
        })?;
        text.push_str(value);
        rest = &rest[placeholder.len()..];
    }
    text.push_str(rest);
    Ok(text)
}

pub(super) fn compile(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let school = fields.text("School")?;
    let abbreviation = ctx.settings.school_abbreviation(school).ok_or_else(|| {
        CompileError::semantic(format!("unknown school '{}'", school)).in_field("School")
    })?;
    let description = fields.text("Description")?;

    let mut labels: Vec<(String, &str)> = Vec::new();
    for entry in fields.list("Level")? {
        let (group, level) = parse_group_level(entry).map_err(|e| e.in_field("Level"))?;
        if ctx.settings.caster_class(group).is_none() {
            return Err(
                CompileError::semantic(format!("unknown caster group '{}'", group))
                    .in_field("Level"),
            );
        }
        let label = format!("{}{}", group, level);
        if labels.iter().any(|(l, _)| *l == label) {
            return Err(CompileError::semantic(format!("{} is listed twice", label)).in_field("Level"));
        }
        labels.push((label, group));
    }
    if labels.is_empty() {
        return Err(CompileError::semantic("spell has no caster level").in_field("Level"));
    }

    for (_, field) in PLACEHOLDERS {
        for entry in fields.list(field)? {
            if let Some((label, _)) = split_override(entry) {
                if !labels.iter().any(|(l, _)| l == label) {
                    return Err(CompileError::semantic(format!(
                        "override for {} but the spell is not listed at {}",
                        label, label
                    ))
                    .in_field(field));
                }
            }
        }
    }

    let mut out = RecordOutput::new();
    for (label, group) in &labels {
        let text = substitute(description, fields, label)?;

        let compiled = compile_note(&text).map_err(|e| e.in_field("Description"))?;
        let variant = format!("{}({} {})", name, label, abbreviation);
        let attribute = member("spells", &variant);
        let caster_level = member("casterLevels", group);

        for binding in compiled.bindings {
            out.rule(
                format!("{}.{}", attribute, binding.placeholder),
                caster_level.clone(),
                MergeOp::Set,
                binding.formula,
            );
        }
        out.passthrough(member("spellsKnown", label), attribute.clone(), MergeOp::Add);
        out.note(attribute, "magic", compiled.template);
        out.choice(
            ContentKind::Spell,
            variant,
            format!("School={} Level={} Description=\"{}\"", school, label, text),
        );
    }
    Ok(out)
}

//! Goody compiler.
//!
//! A goody is an item line recognized in the character's goodies list
//! (`Ring Of Protection +1`). Its value is computed once into
//! `goodies.<Name>` and then fanned out to every listed attribute.

use sheetsmith_domain::naming::member;
use sheetsmith_domain::{
    attribute_prefix, compile_expression, CompileError, ContentKind, ContentRecord, FieldTable,
    MergeOp,
};

use super::notes::section_notes;
use super::patterns::BonusPattern;
use super::{CompileContext, RecordOutput};

pub(super) fn compile(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let pattern = BonusPattern::custom(fields.text("Pattern")?).map_err(|e| e.in_field("Pattern"))?;
    pattern.ensure_specific().map_err(|e| e.in_field("Pattern"))?;

    let value = compile_expression(fields.text("Value")?).map_err(|e| e.in_field("Value"))?;
    let op = match fields.optional_text("Effect")? {
        Some(effect) => effect.parse::<MergeOp>().map_err(|e| e.in_field("Effect"))?,
        None => MergeOp::Add,
    };

    let attributes = fields.list("Attribute")?;
    if attributes.is_empty() {
        return Err(CompileError::semantic("goody affects no attribute").in_field("Attribute"));
    }
    let total = member("goodies", name);
    let mut out = RecordOutput::new();

    out.rule(total.clone(), "goodiesList", MergeOp::Add, pattern.formula(value));
    for attribute in attributes {
        let attribute = attribute.trim();
        if attribute.is_empty() {
            return Err(CompileError::structural("empty attribute name").in_field("Attribute"));
        }
        out.passthrough(attribute, total.clone(), op);
    }

    section_notes(
        &mut out,
        fields.list("Section")?,
        fields.list("Note")?,
        &format!("{}Goody", attribute_prefix(name)),
        &total,
        ctx,
    )?;

    out.choice(ContentKind::Goody, name, record.raw_spec());
    Ok(out)
}

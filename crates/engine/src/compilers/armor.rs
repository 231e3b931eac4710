//! Armor and shield compilers.
//!
//! Both are selected through a single text attribute (`armor`, `shield`) and
//! contribute only while selected. Armor classes count down, so `AC=4` lowers
//! the total by four.

use sheetsmith_domain::{CompileError, ContentKind, ContentRecord, FieldTable, Formula, MergeOp};

use super::{CompileContext, RecordOutput};

/// `source == 'Name' ? value`
fn while_selected(name: &str, value: Formula) -> Formula {
    Formula::when(Formula::source().equals(Formula::text(name)), value)
}

pub(super) fn compile_armor(
    record: &ContentRecord,
    fields: &FieldTable,
    _ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let selection = ContentKind::Armor.selection_attribute();
    let mut out = RecordOutput::new();

    let ac = fields.number("AC")?;
    if ac < 0.0 {
        return Err(CompileError::semantic("armor class bonus cannot be negative").in_field("AC"));
    }
    out.rule(
        "armorClass",
        selection,
        MergeOp::Add,
        while_selected(name, Formula::number(ac).neg()),
    );
    if let Some(speed) = fields.optional_number("Move")? {
        out.rule("speed", selection, MergeOp::Min, while_selected(name, Formula::number(speed)));
    }
    if let Some(weight) = fields.optional_number("Weight")? {
        out.rule(
            "armorWeight",
            selection,
            MergeOp::Add,
            while_selected(name, Formula::number(weight)),
        );
    }

    out.choice(ContentKind::Armor, name, record.raw_spec());
    Ok(out)
}

pub(super) fn compile_shield(
    record: &ContentRecord,
    fields: &FieldTable,
    _ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let selection = ContentKind::Shield.selection_attribute();
    let mut out = RecordOutput::new();

    let ac = fields.number("AC")?;
    if ac < 0.0 {
        return Err(CompileError::semantic("armor class bonus cannot be negative").in_field("AC"));
    }
    if ac != 0.0 {
        out.rule(
            "armorClass",
            selection,
            MergeOp::Add,
            while_selected(name, Formula::number(ac).neg()),
        );
    }
    if let Some(weight) = fields.optional_number("Weight")? {
        out.rule(
            "armorWeight",
            selection,
            MergeOp::Add,
            while_selected(name, Formula::number(weight)),
        );
    }

    out.choice(ContentKind::Shield, name, record.raw_spec());
    Ok(out)
}

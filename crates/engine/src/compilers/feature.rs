//! Feature compiler.

use sheetsmith_domain::naming::member;
use sheetsmith_domain::{
    attribute_prefix, compile_expression, CompileError, ContentKind, ContentRecord, FieldTable,
    Formula, MergeOp,
};

use super::notes::section_notes;
use super::{CompileContext, RecordOutput};

/// One `Effects` entry: `target += expr`, `target v= expr`, `target ^= expr`
/// or `target = expr`.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Effect {
    pub target: String,
    pub op: MergeOp,
    pub formula: Formula,
}

impl Effect {
    pub fn parse(entry: &str) -> Result<Self, CompileError> {
        let bytes = entry.as_bytes();
        // First `=` that is neither part of `==` nor a comparison
        let at = (0..bytes.len())
            .find(|&i| {
                bytes[i] == b'='
                    && bytes.get(i + 1) != Some(&b'=')
                    && !(i > 0 && matches!(bytes[i - 1], b'!' | b'<' | b'>' | b'='))
            })
            .ok_or_else(|| {
                CompileError::structural(format!("effect '{}' has no assignment", entry))
            })?;

        let head = &entry[..at];
        let (target, op) = match head.as_bytes().last() {
            Some(b'+') => (&head[..head.len() - 1], MergeOp::Add),
            Some(b'^') => (&head[..head.len() - 1], MergeOp::Max),
            Some(b'v') if head[..head.len() - 1].ends_with(char::is_whitespace) => {
                (&head[..head.len() - 1], MergeOp::Min)
            }
            _ => (head, MergeOp::Set),
        };
        let target = target.trim();
        if target.is_empty() {
            return Err(CompileError::structural(format!(
                "effect '{}' has no target",
                entry
            )));
        }

        let formula = compile_expression(&entry[at + 1..])?;
        Ok(Self {
            target: target.to_string(),
            op,
            formula,
        })
    }
}

pub(super) fn compile(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let source = member("features", name);
    let mut out = RecordOutput::new();

    section_notes(
        &mut out,
        fields.list("Section")?,
        fields.list("Note")?,
        &attribute_prefix(name),
        &source,
        ctx,
    )?;

    for entry in fields.list("Effects")? {
        let effect = Effect::parse(entry).map_err(|e| e.in_field("Effects"))?;
        out.rule(effect.target, source.clone(), effect.op, effect.formula);
    }

    out.choice(ContentKind::Feature, name, record.raw_spec());
    Ok(out)
}

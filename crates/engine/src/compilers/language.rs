//! Language compiler.

use sheetsmith_domain::naming::member;
use sheetsmith_domain::{CompileError, ContentKind, ContentRecord, FieldTable, MergeOp};

use super::{CompileContext, RecordOutput};

pub(super) fn compile(
    record: &ContentRecord,
    _fields: &FieldTable,
    _ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let mut out = RecordOutput::new();
    out.passthrough("languageCount", member("languages", name), MergeOp::Add);
    out.choice(ContentKind::Language, name, record.raw_spec());
    Ok(out)
}

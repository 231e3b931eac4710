//! Skill compiler.

use sheetsmith_domain::naming::member;
use sheetsmith_domain::{CompileError, ContentKind, ContentRecord, FieldTable, Formula, MergeOp};

use super::{CompileContext, RecordOutput};

pub(super) fn compile(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let ranks = member("skills", name);
    let modifier = member("skillModifiers", name);
    let mut out = RecordOutput::new();

    out.passthrough(modifier.clone(), ranks, MergeOp::Add);
    if let Some(ability) = fields.optional_text("Ability")? {
        let ability = ability.to_lowercase();
        if !ctx.settings.is_ability(&ability) {
            return Err(
                CompileError::semantic(format!("unknown ability '{}'", ability))
                    .in_field("Ability"),
            );
        }
        out.passthrough(modifier.clone(), format!("{}Modifier", ability), MergeOp::Add);
    }

    for class in fields.list("Class")? {
        ctx.catalog
            .require(ContentKind::Class, class)
            .map_err(|e| e.in_field("Class"))?;
        out.rule(
            member("classSkills", name),
            member("levels", class),
            MergeOp::Max,
            Formula::number(1.0),
        );
    }

    out.note(modifier, "skill", "%V");
    out.choice(ContentKind::Skill, name, record.raw_spec());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilers::Catalog;
    use crate::infrastructure::settings::CompilerSettings;

    fn compile_skill(name: &str, raw: &str) -> Result<RecordOutput, CompileError> {
        let settings = CompilerSettings::default();
        let mut catalog = Catalog::new();
        catalog.insert(ContentKind::Class, "Cleric");
        catalog.insert(ContentKind::Class, "Fighter");
        let ctx = CompileContext {
            settings: &settings,
            catalog: &catalog,
        };
        let record = ContentRecord::new(ContentKind::Skill, name, raw);
        let fields = FieldTable::parse(ContentKind::Skill, raw)?;
        compile(&record, &fields, &ctx)
    }

    #[test]
    fn modifier_sums_ranks_and_ability() {
        let out = compile_skill("Herbalism", "Ability=Wisdom Class=Cleric").expect("compiles");
        let rules: Vec<(&str, &str)> = out
            .rules
            .iter()
            .map(|r| (r.target.as_str(), r.source.as_str()))
            .collect();
        assert_eq!(
            rules,
            vec![
                ("skillModifiers.Herbalism", "skills.Herbalism"),
                ("skillModifiers.Herbalism", "wisdomModifier"),
                ("classSkills.Herbalism", "levels.Cleric"),
            ]
        );
        assert_eq!(out.notes[0].section, "skill");
    }

    #[test]
    fn unknown_references_are_semantic() {
        let err = compile_skill("Climbing", "Ability=Agility").expect_err("no such ability");
        assert!(err.to_string().contains("field 'Ability'"));
        let err = compile_skill("Climbing", "Class=Thief").expect_err("no such class");
        assert!(err.to_string().contains("undefined class 'Thief'"));
    }
}

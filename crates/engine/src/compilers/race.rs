//! Race compiler.

use sheetsmith_domain::naming::member;
use sheetsmith_domain::{
    attribute_prefix, CompileError, ContentKind, ContentRecord, FieldTable, Formula, MergeOp,
};

use super::{grant_languages, requirements, CompileContext, RecordOutput};

pub(super) fn compile(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let selected = member("races", name);
    let mut out = RecordOutput::new();

    out.rule(
        selected.clone(),
        ContentKind::Race.selection_attribute(),
        MergeOp::Set,
        Formula::when(
            Formula::source().equals(Formula::text(name)),
            Formula::number(1.0),
        ),
    );

    // Races have no levels of their own; later entries key on character level
    for feature in fields.leveled("Features")? {
        ctx.catalog
            .require(ContentKind::Feature, &feature.name)
            .map_err(|e| e.in_field("Features"))?;
        let mut condition = feature.condition.clone();
        if feature.level > 1 {
            let reached = Formula::attr("level").ge(Formula::number(f64::from(feature.level)));
            condition = Some(match condition {
                Some(predicate) => predicate.and(reached),
                None => reached,
            });
        }
        let target = member("features", &feature.name);
        match condition {
            Some(condition) => out.rule(
                target,
                selected.clone(),
                MergeOp::Add,
                Formula::when(condition, Formula::number(1.0)),
            ),
            None => out.passthrough(target, selected.clone(), MergeOp::Add),
        }
    }

    requirements(&mut out, fields.list("Require")?, &attribute_prefix(name), &selected)?;
    grant_languages(&mut out, fields.list("Languages")?, &selected, ctx)?;

    out.choice(ContentKind::Race, name, record.raw_spec());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilers::Catalog;
    use crate::infrastructure::settings::CompilerSettings;

    fn compile_race(name: &str, raw: &str) -> Result<RecordOutput, CompileError> {
        let settings = CompilerSettings::default();
        let mut catalog = Catalog::new();
        for feature in ["Infravision", "Detect Secret Doors"] {
            catalog.insert(ContentKind::Feature, feature);
        }
        for language in ["Common", "Elf"] {
            catalog.insert(ContentKind::Language, language);
        }
        let ctx = CompileContext {
            settings: &settings,
            catalog: &catalog,
        };
        let record = ContentRecord::new(ContentKind::Race, name, raw);
        let fields = FieldTable::parse(ContentKind::Race, raw)?;
        compile(&record, &fields, &ctx)
    }

    #[test]
    fn compiles_elf() {
        let out = compile_race(
            "Half-Elf",
            "Require=\"intelligence >= 4\" Features=Infravision,\"3:Detect Secret Doors\" \
             Languages=Common,Elf",
        )
        .expect("compiles");

        let formulas: Vec<(String, Option<String>)> = out
            .rules
            .iter()
            .map(|r| (r.target.clone(), r.formula.as_ref().map(|f| f.to_string())))
            .collect();
        assert_eq!(
            formulas[0],
            (
                "races.Half-Elf".to_string(),
                Some("source == 'Half-Elf' ? 1".to_string())
            )
        );
        assert_eq!(formulas[1], ("features.Infravision".to_string(), None));
        assert_eq!(
            formulas[2],
            (
                "features.Detect Secret Doors".to_string(),
                Some("level >= 3 ? 1".to_string())
            )
        );
        assert!(out
            .notes
            .iter()
            .any(|n| n.attribute == "validationNotes.halfElfRequirements"));
        assert_eq!(out.choices.len(), 1);
    }

    #[test]
    fn unknown_language_is_semantic() {
        let err = compile_race("Gnome", "Languages=Gnome").expect_err("no Gnome language");
        assert!(matches!(err, CompileError::SemanticValidation(_)));
        assert!(err.to_string().contains("field 'Languages'"));
    }
}

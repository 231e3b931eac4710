//! `Section`/`Note` pairs shared by features and goodies.

use sheetsmith_domain::{compile_note, CompileError, MergeOp};

use super::{CompileContext, RecordOutput};

/// Compiles paired `Section` and `Note` lists into `<section>Notes.<key>`
/// attributes sourced from `source`.
///
/// Each note gets a presence rule copying the source value, one rule per
/// `%{...}` interpolation (`<attribute>.<n>`) and its template.
pub(super) fn section_notes(
    out: &mut RecordOutput,
    sections: &[String],
    notes: &[String],
    key: &str,
    source: &str,
    ctx: &CompileContext<'_>,
) -> Result<(), CompileError> {
    if sections.len() != notes.len() {
        return Err(CompileError::structural(format!(
            "{} sections but {} notes",
            sections.len(),
            notes.len()
        )));
    }

    let mut seen: Vec<&str> = Vec::with_capacity(sections.len());
    for (section, note) in sections.iter().zip(notes) {
        if !ctx.settings.is_section(section) {
            return Err(
                CompileError::semantic(format!("unknown section '{}'", section)).in_field("Section"),
            );
        }
        if seen.contains(&section.as_str()) {
            return Err(CompileError::semantic(format!(
                "section '{}' is used twice",
                section
            ))
            .in_field("Section"));
        }
        seen.push(section);

        let compiled = compile_note(note).map_err(|e| e.in_field("Note"))?;
        let attribute = format!("{}Notes.{}", section, key);
        out.passthrough(attribute.clone(), source, MergeOp::Set);
        for binding in compiled.bindings {
            out.rule(
                format!("{}.{}", attribute, binding.placeholder),
                source,
                MergeOp::Set,
                binding.formula,
            );
        }
        out.note(attribute, section, compiled.template);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilers::Catalog;
    use crate::infrastructure::settings::CompilerSettings;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn compiles_pairs_with_bindings() {
        let settings = CompilerSettings::default();
        let catalog = Catalog::new();
        let ctx = CompileContext {
            settings: &settings,
            catalog: &catalog,
        };
        let mut out = RecordOutput::new();
        section_notes(
            &mut out,
            &strings(&["combat", "save"]),
            &strings(&["%V attacks", "+%{floor(source / 2)} vs. poison"]),
            "dwarfResistance",
            "features.Dwarf Resistance",
            &ctx,
        )
        .expect("compiles");

        let targets: Vec<&str> = out.rules.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(
            targets,
            vec![
                "combatNotes.dwarfResistance",
                "saveNotes.dwarfResistance",
                "saveNotes.dwarfResistance.1",
            ]
        );
        assert_eq!(out.notes[1].format, "+%1 vs. poison");
        assert_eq!(out.sections, strings(&["combat", "save"]));
    }

    #[test]
    fn rejects_mismatched_and_unknown_sections() {
        let settings = CompilerSettings::default();
        let catalog = Catalog::new();
        let ctx = CompileContext {
            settings: &settings,
            catalog: &catalog,
        };

        let mut out = RecordOutput::new();
        let err = section_notes(&mut out, &strings(&["combat"]), &[], "x", "features.X", &ctx)
            .expect_err("count mismatch");
        assert!(matches!(err, CompileError::StructuralParse(_)));

        let err = section_notes(
            &mut out,
            &strings(&["lore"]),
            &strings(&["%V"]),
            "x",
            "features.X",
            &ctx,
        )
        .expect_err("unknown section");
        assert!(matches!(err, CompileError::SemanticValidation(_)));
    }
}

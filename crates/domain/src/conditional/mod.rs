//! Conditional-text compiler.
//!
//! Turns inline expressions (`levels.Fighter >= 7 ? 3 : 2`) into [`Formula`]
//! trees, and note strings with embedded `%{...}` interpolations into a
//! template with numbered placeholders plus one formula per placeholder.

mod lexer;
mod parser;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::formula::Formula;

/// Compiles one expression.
///
/// Identifiers that are neither `source`, `null` nor a function call are
/// attribute references; they are never turned into literal text.
pub fn compile_expression(text: &str) -> Result<Formula, CompileError> {
    let tokens = lexer::tokenize(text)?;
    parser::Parser::new(tokens, text).parse()
}

/// A note placeholder bound to the formula that fills it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteBinding {
    pub placeholder: u8,
    pub formula: Formula,
}

/// Output of [`compile_note`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledNote {
    /// Note text with every `%{...}` replaced by `%N`
    pub template: String,
    pub bindings: Vec<NoteBinding>,
}

/// Compiles a note string.
///
/// `%V` and existing `%N` placeholders pass through untouched; each `%{expr}`
/// is compiled and replaced with the next free `%N`. Compiling a template
/// produced by this function returns it unchanged with no bindings.
pub fn compile_note(text: &str) -> Result<CompiledNote, CompileError> {
    let mut next = highest_placeholder(text)
        .checked_add(1)
        .ok_or_else(|| CompileError::structural(format!("too many placeholders in '{}'", text)))?;
    let mut template = String::with_capacity(text.len());
    let mut bindings = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("%{") {
        template.push_str(&rest[..start]);
        let body_start = start + 2;
        let end = find_closing_brace(&rest[body_start..]).ok_or_else(|| {
            CompileError::structural(format!("unterminated '%{{' in note '{}'", text))
        })?;
        let body = rest[body_start..body_start + end].trim();
        if body.is_empty() {
            return Err(CompileError::structural(format!(
                "empty interpolation in note '{}'",
                text
            )));
        }

        let formula = compile_expression(body)?;
        template.push('%');
        template.push_str(&next.to_string());
        bindings.push(NoteBinding {
            placeholder: next,
            formula,
        });
        next = next.checked_add(1).ok_or_else(|| {
            CompileError::structural(format!("too many placeholders in '{}'", text))
        })?;

        rest = &rest[body_start + end + 1..];
    }
    template.push_str(rest);

    Ok(CompiledNote { template, bindings })
}

/// Highest `%N` already present, or 0.
fn highest_placeholder(text: &str) -> u8 {
    let bytes = text.as_bytes();
    let mut highest = 0u8;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if let Ok(n) = text[start..end].parse::<u8>() {
                highest = highest.max(n);
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }
    highest
}

/// Offset of the `}` closing an interpolation, skipping quoted runs.
fn find_closing_brace(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '}') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{BinaryOp, Function, MapScope, Value};

    #[test]
    fn compiles_nested_conditional() {
        let f = compile_expression("levels.Fighter >= 7 ? 3 : source > 0 ? 2 : 1").expect("parses");
        let expected = Formula::if_else(
            Formula::attr("levels.Fighter").ge(Formula::number(7.0)),
            Formula::number(3.0),
            Formula::if_else(
                Formula::source().gt(Formula::number(0.0)),
                Formula::number(2.0),
                Formula::number(1.0),
            ),
        );
        assert_eq!(f, expected);
    }

    #[test]
    fn keeps_arithmetic_nesting() {
        let f = compile_expression("source >= 3 ? floor((source - 1) / 2) * 5").expect("parses");
        assert_eq!(f.to_string(), "source >= 3 ? floor((source - 1) / 2) * 5");
        let scope = MapScope::new().with_source(7.0);
        assert_eq!(f.evaluate(&scope), Ok(Value::Number(15.0)));
    }

    #[test]
    fn unknown_identifiers_are_attributes() {
        let f = compile_expression("wisdom + `features.Two Weapons`").expect("parses");
        assert_eq!(f.referenced_attributes(), vec!["wisdom", "features.Two Weapons"]);
    }

    #[test]
    fn quoted_text_passes_through() {
        let f = compile_expression("race == 'Half-Elf, High'").expect("parses");
        assert_eq!(
            f,
            Formula::binary(
                BinaryOp::Eq,
                Formula::attr("race"),
                Formula::text("Half-Elf, High")
            )
        );
    }

    #[test]
    fn negative_literals_fold() {
        let f = compile_expression("-1 + -(-2)").expect("parses");
        assert_eq!(
            f,
            Formula::number(-1.0) + Formula::number(2.0)
        );
    }

    #[test]
    fn rendering_round_trips() {
        let samples = [
            "steps(source, 0, 1, 1, 2, 2, 4, 3)",
            "(source ? 1) + 2",
            "a ? (b ? c) : d",
            "-(-x) * 2",
            "!(strength >= 9) && race != 'Elf' || $1",
            "max(source - 1, 0) / 2 - (3 - 1)",
            "`features.Armor Proficiency (All)` ? 'yes' : null",
        ];
        for sample in samples {
            let parsed = compile_expression(sample).expect("sample parses");
            let rendered = parsed.to_string();
            assert_eq!(rendered, sample);
            assert_eq!(compile_expression(&rendered), Ok(parsed));
        }
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(matches!(
            compile_expression("floor(1, 2)"),
            Err(CompileError::StructuralParse(_))
        ));
        assert!(matches!(
            compile_expression("Math.floor(2)"),
            Err(CompileError::SemanticValidation(_))
        ));
        assert!(matches!(
            compile_expression("(1 + 2"),
            Err(CompileError::StructuralParse(_))
        ));
        assert!(matches!(
            compile_expression("1 2"),
            Err(CompileError::StructuralParse(_))
        ));
        assert!(matches!(
            compile_expression(""),
            Err(CompileError::StructuralParse(_))
        ));
    }

    #[test]
    fn note_interpolations_become_placeholders() {
        let note = compile_note("%V'/%{source * 10}' range, +%{floor(source / 2)} 'to hit'")
            .expect("compiles");
        assert_eq!(note.template, "%V'/%1' range, +%2 'to hit'");
        assert_eq!(note.bindings.len(), 2);
        assert_eq!(note.bindings[0].placeholder, 1);
        assert_eq!(
            note.bindings[1].formula,
            Formula::call(
                Function::Floor,
                vec![Formula::source() / Formula::number(2.0)]
            )
        );
    }

    #[test]
    fn note_numbering_continues_after_existing_placeholders() {
        let note = compile_note("%1 uses, %{source > 5 ? 2 : 1} per day").expect("compiles");
        assert_eq!(note.template, "%1 uses, %2 per day");
        assert_eq!(note.bindings[0].placeholder, 2);
    }

    #[test]
    fn recompiling_a_note_is_a_no_op() {
        let first = compile_note("+%{source} AC vs. %{'evil'} within 10'").expect("compiles");
        let second = compile_note(&first.template).expect("compiles");
        assert_eq!(second.template, first.template);
        assert!(second.bindings.is_empty());
    }

    #[test]
    fn braces_inside_quotes_do_not_close() {
        let note = compile_note("%{source ? '}' : 'x'}").expect("compiles");
        assert_eq!(note.template, "%1");
        assert_eq!(
            note.bindings[0].formula,
            Formula::if_else(Formula::source(), Formula::text("}"), Formula::text("x"))
        );
    }

    #[test]
    fn unterminated_interpolation_is_structural() {
        let err = compile_note("+%{source AC").expect_err("unterminated");
        assert!(matches!(err, CompileError::StructuralParse(_)));
    }
}

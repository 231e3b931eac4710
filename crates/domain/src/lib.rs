//! Sheetsmith domain: content records, the attribute-string parser and the
//! leaf compilers that turn field values into rule formulas.
//!
//! Nothing in this crate performs I/O or logs; every failure is returned as a
//! [`CompileError`].

pub mod conditional;
pub mod content;
pub mod error;
pub mod formula;
pub mod naming;
pub mod parser;
pub mod progression;
pub mod rules;

pub use conditional::{compile_expression, compile_note, CompiledNote, NoteBinding};
pub use content::{ContentKind, ContentRecord, RecordKey};
pub use error::{CompileError, ErrorCategory, RecordError};
pub use formula::{BinaryOp, EvalError, Formula, Function, MapScope, Scope, UnaryOp, Value};
pub use naming::attribute_prefix;
pub use parser::{FieldTable, FieldValue, LeveledFeature, ParseOptions, SAVE_CATEGORIES};
pub use progression::{
    parse_group_level, AttackProgression, AttackStep, ExperienceTable, HitDieProgression,
    MergePolicy, ProficiencyProgression, Progression, SaveProgression, SpellSlotTable,
};
pub use rules::{DerivationRule, MergeOp, NoteTemplate};

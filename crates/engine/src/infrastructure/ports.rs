//! Port traits for the outbound boundary.
//!
//! The rule-evaluation engine that consumes compiled output lives outside this
//! crate. Everything the compilers produce reaches it through [`RuleSink`],
//! which is passed to the dispatcher explicitly rather than held globally.

use sheetsmith_domain::{ContentKind, DerivationRule, NoteTemplate};

// =============================================================================
// Rule Sink
// =============================================================================

/// Receiver of compiled rules, notes, sections and choices.
///
/// Calls for one record are always preceded by `begin_record`, and a record's
/// output is only emitted once it compiled and passed the ledger check in
/// full.
#[cfg_attr(test, mockall::automock)]
pub trait RuleSink {
    /// Marks the record that subsequent registrations belong to.
    fn begin_record(&mut self, _kind: ContentKind, _name: &str) {}

    fn register_derivation_rule(&mut self, rule: &DerivationRule);

    fn register_choice(&mut self, kind: ContentKind, name: &str, raw_spec: &str);

    fn register_note_template(&mut self, note: &NoteTemplate);

    /// Cosmetic pass-through; sinks may see the same section more than once.
    fn register_sheet_section(&mut self, name: &str);

    /// Drops everything registered under a record.
    fn retract_record(&mut self, _kind: ContentKind, _name: &str) {}
}

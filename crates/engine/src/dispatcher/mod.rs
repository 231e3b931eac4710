//! Dispatcher: routes records to their compiler and emits the output.
//!
//! A record is compiled in full and checked against the merge ledger before
//! the first call reaches the sink, so a failing record leaves nothing
//! behind. Batches never stop at a bad record; failures are collected in the
//! [`CompileReport`].

mod ledger;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use sheetsmith_domain::{CompileError, ContentRecord, FieldTable, RecordError, RecordKey};

use crate::compilers::{compile_fields, Catalog, CompileContext, RecordOutput};
use crate::infrastructure::ports::RuleSink;
use crate::infrastructure::settings::CompilerSettings;

use ledger::Ledger;

/// Outcome of [`Compiler::compile_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileReport {
    pub registered: Vec<RecordKey>,
    pub skipped: Vec<RecordError>,
}

impl CompileReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Compiles content records and registers their rules with a [`RuleSink`].
#[derive(Debug, Clone)]
pub struct Compiler {
    settings: CompilerSettings,
    catalog: Catalog,
    ledger: Ledger,
    registered: BTreeSet<RecordKey>,
}

impl Compiler {
    /// Creates a compiler whose reference checks see every record in
    /// `records`.
    pub fn new(settings: CompilerSettings, records: &[ContentRecord]) -> Self {
        Self {
            settings,
            catalog: Catalog::from_records(records),
            ledger: Ledger::new(),
            registered: BTreeSet::new(),
        }
    }

    pub fn is_registered(&self, key: &RecordKey) -> bool {
        self.registered.contains(key)
    }

    /// Number of distinct rules emitted so far.
    pub fn rule_count(&self) -> usize {
        self.ledger.len()
    }

    /// Compiles a record without registering anything.
    pub fn compile(&self, record: &ContentRecord) -> Result<RecordOutput, RecordError> {
        let fail = |error: CompileError| RecordError::new(record.kind(), record.name(), error);
        let fields = FieldTable::parse_with(
            record.kind(),
            record.raw_spec(),
            &self.settings.parse_options(),
        )
        .map_err(fail)?;
        let ctx = CompileContext {
            settings: &self.settings,
            catalog: &self.catalog,
        };
        compile_fields(record, &fields, &ctx).map_err(fail)
    }

    /// Compiles a record and emits its output.
    ///
    /// Registering the same record twice is an error; use
    /// [`Compiler::recompile`] to replace a record's output.
    pub fn register(
        &mut self,
        record: &ContentRecord,
        sink: &mut dyn RuleSink,
    ) -> Result<(), RecordError> {
        let key = record.key();
        if self.registered.contains(&key) {
            return Err(RecordError::new(
                key.kind,
                key.name,
                CompileError::semantic("record is already registered; use recompile"),
            ));
        }

        self.catalog.insert(key.kind, &key.name);
        let output = self.compile(record)?;
        self.ledger
            .check(&key, &output.rules)
            .map_err(|e| RecordError::new(key.kind, key.name.clone(), e))?;

        self.emit(key, output, sink);
        Ok(())
    }

    /// Replaces a record's output.
    ///
    /// The new output is compiled and checked first; on failure the old
    /// output stays registered.
    pub fn recompile(
        &mut self,
        record: &ContentRecord,
        sink: &mut dyn RuleSink,
    ) -> Result<(), RecordError> {
        let key = record.key();
        self.catalog.insert(key.kind, &key.name);
        let output = self.compile(record)?;
        self.ledger
            .check(&key, &output.rules)
            .map_err(|e| RecordError::new(key.kind, key.name.clone(), e))?;

        let handovers = self.ledger.forget(&key);
        self.registered.remove(&key);
        sink.retract_record(key.kind, &key.name);
        tracing::debug!(
            kind = %key.kind,
            name = %key.name,
            handovers = handovers.len(),
            "Retracted record output"
        );

        for handover in handovers {
            sink.begin_record(handover.owner.kind, &handover.owner.name);
            sink.register_derivation_rule(&handover.rule);
        }

        self.emit(key, output, sink);
        Ok(())
    }

    /// Registers every record, skipping the ones that fail.
    pub fn compile_all(
        &mut self,
        records: &[ContentRecord],
        sink: &mut dyn RuleSink,
    ) -> CompileReport {
        let mut report = CompileReport::default();
        for record in records {
            match self.register(record, sink) {
                Ok(()) => report.registered.push(record.key()),
                Err(error) => {
                    tracing::warn!(
                        kind = %error.kind,
                        name = %error.name,
                        category = %error.category(),
                        error = %error.error,
                        "Skipped content record"
                    );
                    report.skipped.push(error);
                }
            }
        }

        tracing::info!(
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            rules = self.ledger.len(),
            "Compiled content records"
        );
        report
    }

    fn emit(&mut self, key: RecordKey, output: RecordOutput, sink: &mut dyn RuleSink) {
        sink.begin_record(key.kind, &key.name);
        for section in &output.sections {
            sink.register_sheet_section(section);
        }

        let mut collapsed = 0usize;
        for rule in &output.rules {
            match self.ledger.commit(&key, rule) {
                None => sink.register_derivation_rule(rule),
                Some(owner) => {
                    collapsed += 1;
                    tracing::debug!(
                        rule = %rule,
                        owner = %owner,
                        "Collapsed duplicate rule"
                    );
                }
            }
        }
        for note in &output.notes {
            sink.register_note_template(note);
        }
        for choice in &output.choices {
            sink.register_choice(choice.kind(), choice.name(), choice.raw_spec());
        }

        tracing::debug!(
            kind = %key.kind,
            name = %key.name,
            rules = output.rules.len() - collapsed,
            collapsed,
            notes = output.notes.len(),
            "Registered record"
        );
        self.registered.insert(key);
    }
}

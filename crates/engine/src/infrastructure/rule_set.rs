//! In-memory [`RuleSink`] that keeps compiled output grouped per record.

use serde::{Deserialize, Serialize};
use sheetsmith_domain::{ContentKind, ContentRecord, DerivationRule, NoteTemplate, RecordKey};

use super::ports::RuleSink;

/// Everything registered under one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRules {
    /// `None` for output registered before any `begin_record`
    pub record: Option<RecordKey>,
    pub rules: Vec<DerivationRule>,
    pub notes: Vec<NoteTemplate>,
    pub choices: Vec<ContentRecord>,
}

/// Compiled rules held in memory, for tests, previews and JSON export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    sections: Vec<String>,
    groups: Vec<RecordRules>,
    #[serde(skip)]
    current: Option<usize>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn groups(&self) -> &[RecordRules] {
        &self.groups
    }

    pub fn record(&self, kind: ContentKind, name: &str) -> Option<&RecordRules> {
        self.groups.iter().find(|group| {
            group
                .record
                .as_ref()
                .is_some_and(|key| key.kind == kind && key.name == name)
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &DerivationRule> {
        self.groups.iter().flat_map(|group| group.rules.iter())
    }

    pub fn notes(&self) -> impl Iterator<Item = &NoteTemplate> {
        self.groups.iter().flat_map(|group| group.notes.iter())
    }

    pub fn choices(&self, kind: ContentKind) -> impl Iterator<Item = &ContentRecord> {
        self.groups
            .iter()
            .flat_map(|group| group.choices.iter())
            .filter(move |choice| choice.kind() == kind)
    }

    /// All rules contributing to `target`.
    pub fn rules_for(&self, target: &str) -> Vec<&DerivationRule> {
        self.rules().filter(|rule| rule.target == target).collect()
    }

    pub fn note_for(&self, attribute: &str) -> Option<&NoteTemplate> {
        self.notes().find(|note| note.attribute == attribute)
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|group| group.rules.len()).sum()
    }

    pub fn note_count(&self) -> usize {
        self.groups.iter().map(|group| group.notes.len()).sum()
    }

    fn current_group(&mut self) -> &mut RecordRules {
        let index = match self.current {
            Some(index) => index,
            None => {
                self.groups.push(RecordRules::default());
                let index = self.groups.len() - 1;
                self.current = Some(index);
                index
            }
        };
        &mut self.groups[index]
    }
}

impl RuleSink for RuleSet {
    fn begin_record(&mut self, kind: ContentKind, name: &str) {
        let existing = self.groups.iter().position(|group| {
            group
                .record
                .as_ref()
                .is_some_and(|key| key.kind == kind && key.name == name)
        });
        let index = match existing {
            Some(index) => index,
            None => {
                self.groups.push(RecordRules {
                    record: Some(RecordKey::new(kind, name)),
                    ..RecordRules::default()
                });
                self.groups.len() - 1
            }
        };
        self.current = Some(index);
    }

    fn register_derivation_rule(&mut self, rule: &DerivationRule) {
        self.current_group().rules.push(rule.clone());
    }

    fn register_choice(&mut self, kind: ContentKind, name: &str, raw_spec: &str) {
        self.current_group()
            .choices
            .push(ContentRecord::new(kind, name, raw_spec));
    }

    fn register_note_template(&mut self, note: &NoteTemplate) {
        self.current_group().notes.push(note.clone());
    }

    fn register_sheet_section(&mut self, name: &str) {
        if !self.sections.iter().any(|section| section == name) {
            self.sections.push(name.to_string());
        }
    }

    fn retract_record(&mut self, kind: ContentKind, name: &str) {
        self.groups.retain(|group| {
            !group
                .record
                .as_ref()
                .is_some_and(|key| key.kind == kind && key.name == name)
        });
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsmith_domain::MergeOp;

    fn rule(target: &str) -> DerivationRule {
        DerivationRule::passthrough(target, "levels.Fighter", MergeOp::Add)
    }

    #[test]
    fn groups_output_by_record() {
        let mut set = RuleSet::new();
        set.begin_record(ContentKind::Class, "Fighter");
        set.register_derivation_rule(&rule("level"));
        set.register_sheet_section("combat");
        set.begin_record(ContentKind::Language, "Common");
        set.register_choice(ContentKind::Language, "Common", "");
        set.register_sheet_section("combat");

        assert_eq!(set.groups().len(), 2);
        assert_eq!(set.sections().to_vec(), vec!["combat".to_string()]);
        assert_eq!(set.rules_for("level").len(), 1);
        assert_eq!(set.choices(ContentKind::Language).count(), 1);
        assert_eq!(
            set.record(ContentKind::Class, "Fighter").map(|g| g.rules.len()),
            Some(1)
        );
    }

    #[test]
    fn retraction_drops_only_that_record() {
        let mut set = RuleSet::new();
        set.begin_record(ContentKind::Class, "Fighter");
        set.register_derivation_rule(&rule("level"));
        set.begin_record(ContentKind::Class, "Cleric");
        set.register_derivation_rule(&rule("hitDice"));

        set.retract_record(ContentKind::Class, "Fighter");

        assert!(set.record(ContentKind::Class, "Fighter").is_none());
        assert_eq!(set.rule_count(), 1);
        assert_eq!(set.rules_for("hitDice").len(), 1);
    }

    #[test]
    fn output_without_a_record_is_kept() {
        let mut set = RuleSet::new();
        set.register_note_template(&NoteTemplate::new("level", "combat", "%V"));
        assert_eq!(set.note_count(), 1);
        assert_eq!(set.groups()[0].record, None);
    }

    #[test]
    fn serializes_to_json() {
        let mut set = RuleSet::new();
        set.begin_record(ContentKind::Class, "Fighter");
        set.register_derivation_rule(&rule("level"));
        let json = serde_json::to_value(&set).expect("serializes");
        assert_eq!(json["groups"][0]["record"]["name"], "Fighter");
        assert_eq!(json["groups"][0]["rules"][0]["op"], "add");
    }
}

//! Cross-record merge ledger.
//!
//! Tracks every emitted rule by target together with the records that
//! produced it. Identical rules from different records collapse into one
//! entry. A target may carry at most one distinct non-commutative rule, and
//! commutative rules from other records may only join it when those records
//! emit the same non-commutative rule.

use std::collections::BTreeMap;

use sheetsmith_domain::{CompileError, DerivationRule, RecordKey};

#[derive(Debug, Clone)]
struct Entry {
    rule: DerivationRule,
    /// `owners[0]` is the record the rule was emitted under
    owners: Vec<RecordKey>,
}

impl Entry {
    fn other_owner(&self, key: &RecordKey) -> &RecordKey {
        self.owners
            .iter()
            .find(|owner| *owner != key)
            .unwrap_or(&self.owners[0])
    }
}

/// A collapsed rule whose emitting record was forgotten while other records
/// still produce it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Handover {
    pub owner: RecordKey,
    pub rule: DerivationRule,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    targets: BTreeMap<String, Vec<Entry>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a record's rules against the entries of other records.
    ///
    /// A target may carry at most one distinct non-commutative rule, and once
    /// it carries one every record contributing to the target must emit that
    /// same rule. Entries owned only by `key` itself are ignored, so a record
    /// can be checked again before it is recompiled.
    pub fn check(&self, key: &RecordKey, rules: &[DerivationRule]) -> Result<(), CompileError> {
        let mut by_target: BTreeMap<&str, Vec<&DerivationRule>> = BTreeMap::new();
        for rule in rules {
            by_target.entry(rule.target.as_str()).or_default().push(rule);
        }

        for (target, own) in by_target {
            let Some(entries) = self.targets.get(target) else {
                continue;
            };
            let others: Vec<&Entry> = entries
                .iter()
                .filter(|entry| entry.owners.iter().any(|owner| owner != key))
                .collect();
            let Some(first) = others.first() else {
                continue;
            };

            let own_fixed = own.iter().copied().find(|rule| !rule.op.is_commutative());
            let other_fixed = others.iter().find(|entry| !entry.rule.op.is_commutative());
            match (own_fixed, other_fixed) {
                (Some(rule), Some(entry)) if *rule != entry.rule => {
                    return Err(CompileError::semantic(format!(
                        "'{}' conflicts with '{}' from {}",
                        rule, entry.rule, entry.other_owner(key)
                    )));
                }
                (Some(rule), None) => {
                    return Err(CompileError::semantic(format!(
                        "'{}' would override '{}' from {}",
                        rule, first.rule, first.other_owner(key)
                    )));
                }
                (None, Some(entry)) => {
                    return Err(CompileError::semantic(format!(
                        "'{}' mixes with '{}' from {}",
                        own[0], entry.rule, entry.other_owner(key)
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Records a rule for `key`.
    ///
    /// Returns the emitting owner when an identical rule is already recorded,
    /// in which case the rule must not be emitted again.
    pub fn commit(&mut self, key: &RecordKey, rule: &DerivationRule) -> Option<RecordKey> {
        let entries = self.targets.entry(rule.target.clone()).or_default();
        match entries.iter_mut().find(|entry| entry.rule == *rule) {
            Some(entry) => {
                if !entry.owners.contains(key) {
                    entry.owners.push(key.clone());
                }
                Some(entry.owners[0].clone())
            }
            None => {
                entries.push(Entry {
                    rule: rule.clone(),
                    owners: vec![key.clone()],
                });
                None
            }
        }
    }

    /// Drops `key` from every entry.
    ///
    /// Entries with no owner left are removed. Entries `key` emitted but
    /// other records still produce are handed over to the next owner, which
    /// must emit them again once the sink retracted `key`.
    pub fn forget(&mut self, key: &RecordKey) -> Vec<Handover> {
        let mut handovers = Vec::new();
        for entries in self.targets.values_mut() {
            entries.retain_mut(|entry| {
                let Some(at) = entry.owners.iter().position(|owner| owner == key) else {
                    return true;
                };
                entry.owners.remove(at);
                match entry.owners.first() {
                    None => false,
                    Some(next) => {
                        if at == 0 {
                            handovers.push(Handover {
                                owner: next.clone(),
                                rule: entry.rule.clone(),
                            });
                        }
                        true
                    }
                }
            });
        }
        self.targets.retain(|_, entries| !entries.is_empty());
        handovers
    }

    /// Number of distinct rules recorded.
    pub fn len(&self) -> usize {
        self.targets.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsmith_domain::{ContentKind, Formula, MergeOp};

    fn race(name: &str) -> RecordKey {
        RecordKey::new(ContentKind::Race, name)
    }

    fn set(target: &str, value: f64) -> DerivationRule {
        DerivationRule::computed(target, "race", MergeOp::Set, Formula::number(value))
    }

    #[test]
    fn identical_rules_collapse() {
        let mut ledger = Ledger::new();
        let rule = set("infravision", 60.0);
        assert_eq!(ledger.commit(&race("Elf"), &rule), None);
        assert!(ledger.check(&race("Dwarf"), &[rule.clone()]).is_ok());
        assert_eq!(ledger.commit(&race("Dwarf"), &rule), Some(race("Elf")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn distinct_set_rules_conflict() {
        let mut ledger = Ledger::new();
        ledger.commit(&race("Elf"), &set("infravision", 60.0));
        let err = ledger
            .check(&race("Dwarf"), &[set("infravision", 90.0)])
            .expect_err("two set rules");
        assert!(matches!(err, CompileError::SemanticValidation(_)));
        assert!(err.to_string().contains("race 'Elf'"));

        // The owner itself may replace its own rule
        assert!(ledger.check(&race("Elf"), &[set("infravision", 90.0)]).is_ok());
    }

    #[test]
    fn commutative_rules_mix() {
        let mut ledger = Ledger::new();
        let bonus = DerivationRule::computed("speed", "race", MergeOp::Add, Formula::number(3.0));
        let cap = DerivationRule::computed("speed", "armor", MergeOp::Min, Formula::number(9.0));
        ledger.commit(&race("Elf"), &bonus);
        assert!(ledger.check(&race("Dwarf"), &[bonus.clone(), cap.clone()]).is_ok());
        ledger.commit(&race("Dwarf"), &bonus);
        ledger.commit(&race("Dwarf"), &cap);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn set_rules_do_not_mix_with_other_records() {
        let base = set("speed", 12.0);
        let bonus = DerivationRule::computed("speed", "race", MergeOp::Add, Formula::number(3.0));

        let mut ledger = Ledger::new();
        ledger.commit(&race("Elf"), &base);
        let err = ledger
            .check(&race("Dwarf"), &[bonus.clone()])
            .expect_err("add after set");
        assert!(matches!(err, CompileError::SemanticValidation(_)));
        assert!(err.to_string().contains("race 'Elf'"));

        let mut ledger = Ledger::new();
        ledger.commit(&race("Dwarf"), &bonus);
        let err = ledger
            .check(&race("Elf"), &[base.clone()])
            .expect_err("set after add");
        assert!(err.to_string().contains("race 'Dwarf'"));

        // A record may still combine both on its own target
        assert!(ledger.check(&race("Dwarf"), &[base, bonus]).is_ok());
    }

    #[test]
    fn shared_set_and_add_pairs_collapse() {
        let mut ledger = Ledger::new();
        let total = set("save.Wand", 0.0);
        let adjust =
            DerivationRule::passthrough("save.Wand", "saveAdjustment.Wand", MergeOp::Add);
        let fighter = RecordKey::new(ContentKind::Class, "Fighter");
        let cleric = RecordKey::new(ContentKind::Class, "Cleric");
        ledger.commit(&fighter, &total);
        ledger.commit(&fighter, &adjust);

        assert!(ledger.check(&cleric, &[total.clone(), adjust.clone()]).is_ok());
        assert!(ledger.check(&cleric, &[adjust.clone()]).is_err());
        assert!(ledger.check(&cleric, &[total.clone()]).is_ok());
    }

    #[test]
    fn forgetting_hands_collapsed_rules_over() {
        let mut ledger = Ledger::new();
        let shared = set("infravision", 60.0);
        let own = set("races.Elf", 1.0);
        ledger.commit(&race("Elf"), &shared);
        ledger.commit(&race("Elf"), &own);
        ledger.commit(&race("Half-Elf"), &shared);

        let handovers = ledger.forget(&race("Elf"));
        assert_eq!(
            handovers,
            vec![Handover {
                owner: race("Half-Elf"),
                rule: shared.clone(),
            }]
        );
        assert_eq!(ledger.len(), 1);

        // Nothing to hand over when the last owner goes
        assert!(ledger.forget(&race("Half-Elf")).is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn forgetting_a_later_owner_keeps_the_emitter() {
        let mut ledger = Ledger::new();
        let shared = set("infravision", 60.0);
        ledger.commit(&race("Elf"), &shared);
        ledger.commit(&race("Half-Elf"), &shared);
        assert!(ledger.forget(&race("Half-Elf")).is_empty());
        assert_eq!(ledger.commit(&race("Gnome"), &shared), Some(race("Elf")));
    }
}

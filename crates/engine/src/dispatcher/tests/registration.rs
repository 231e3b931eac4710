use mockall::Sequence;
use sheetsmith_domain::{ContentKind, ContentRecord, ErrorCategory, MergeOp, RecordKey};

use super::{cleric, compiler, feature, fighter, language};
use crate::infrastructure::ports::MockRuleSink;
use crate::infrastructure::rule_set::RuleSet;

#[test]
fn failing_record_emits_nothing() {
    let club = ContentRecord::new(ContentKind::Weapon, "Club", "Category=1h Damage=\"d6");
    let mut compiler = compiler(&[club.clone()]);
    // No expectations: any sink call panics
    let mut sink = MockRuleSink::new();

    let err = compiler
        .register(&club, &mut sink)
        .expect_err("unterminated quote");
    assert_eq!(err.category(), ErrorCategory::Structural);
    assert_eq!(err.name, "Club");
    assert!(!compiler.is_registered(&club.key()));
}

#[test]
fn emits_in_protocol_order() {
    let infravision = feature("Infravision", "Section=feature Note=\"Sees in the dark\"");
    let mut compiler = compiler(&[infravision.clone()]);
    let mut sink = MockRuleSink::new();
    let mut seq = Sequence::new();

    sink.expect_begin_record()
        .withf(|kind, name| *kind == ContentKind::Feature && name == "Infravision")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_register_sheet_section()
        .withf(|name| name == "feature")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_register_derivation_rule()
        .withf(|rule| {
            rule.target == "featureNotes.infravision"
                && rule.source == "features.Infravision"
                && rule.op == MergeOp::Set
        })
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_register_note_template()
        .withf(|note| note.format == "Sees in the dark")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    sink.expect_register_choice()
        .withf(|kind, name, _raw| *kind == ContentKind::Feature && name == "Infravision")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    compiler
        .register(&infravision, &mut sink)
        .expect("registers");
    assert!(compiler.is_registered(&infravision.key()));
}

#[test]
fn bad_records_do_not_stop_the_batch() {
    let records = vec![
        language("Common"),
        ContentRecord::new(ContentKind::Weapon, "Pike", "Category=Polearm Damage=d6"),
        language("Elf"),
    ];
    let mut compiler = compiler(&records);
    let mut sink = RuleSet::new();

    let report = compiler.compile_all(&records, &mut sink);

    assert_eq!(
        report.registered,
        vec![
            RecordKey::new(ContentKind::Language, "Common"),
            RecordKey::new(ContentKind::Language, "Elf"),
        ]
    );
    assert!(!report.is_clean());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].kind, ContentKind::Weapon);
    assert_eq!(report.skipped[0].category(), ErrorCategory::Semantic);
    assert!(sink.record(ContentKind::Weapon, "Pike").is_none());
    assert_eq!(sink.groups().len(), 2);
}

#[test]
fn registering_twice_is_rejected() {
    let common = language("Common");
    let mut compiler = compiler(&[common.clone()]);
    let mut sink = RuleSet::new();
    compiler.register(&common, &mut sink).expect("first");

    let err = compiler.register(&common, &mut sink).expect_err("second");
    assert!(err.to_string().contains("recompile"));
    assert_eq!(sink.rule_count(), 1);
}

#[test]
fn conflicting_set_rules_skip_the_later_record() {
    let records = vec![
        feature("Infravision", "Effects=\"infravision = 60\""),
        feature("Dark Sight", "Effects=\"infravision = 90\""),
    ];
    let mut compiler = compiler(&records);
    let mut sink = RuleSet::new();

    let report = compiler.compile_all(&records, &mut sink);

    assert_eq!(report.registered.len(), 1);
    assert_eq!(report.skipped[0].name, "Dark Sight");
    assert_eq!(report.skipped[0].category(), ErrorCategory::Semantic);
    let rules = sink.rules_for("infravision");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].source, "features.Infravision");
}

#[test]
fn set_and_add_from_different_records_never_both_register() {
    let fast = feature("Fleet", "Effects=\"speed = 12\"");
    let quick = feature("Quick Step", "Effects=\"speed += 3\"");

    for (records, kept) in [
        (vec![fast.clone(), quick.clone()], "features.Fleet"),
        (vec![quick.clone(), fast.clone()], "features.Quick Step"),
    ] {
        let mut compiler = compiler(&records);
        let mut sink = RuleSet::new();

        let report = compiler.compile_all(&records, &mut sink);

        assert_eq!(report.registered, vec![records[0].key()]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, records[1].name());
        assert_eq!(report.skipped[0].category(), ErrorCategory::Semantic);
        let rules = sink.rules_for("speed");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].source, kept);
    }
}

#[test]
fn identical_rules_from_different_classes_collapse() {
    let records = vec![fighter(), cleric()];
    let mut compiler = compiler(&records);
    let mut sink = RuleSet::new();

    let report = compiler.compile_all(&records, &mut sink);
    assert!(report.is_clean());

    let totals = sink.rules_for("save.Breath");
    assert_eq!(totals.len(), 2);
    let cleric_targets: Vec<&str> = sink
        .record(ContentKind::Class, "Cleric")
        .map(|group| group.rules.iter().map(|r| r.target.as_str()).collect())
        .unwrap_or_default();
    assert!(!cleric_targets.contains(&"save.Breath"));
    assert!(cleric_targets.contains(&"classSave.Breath"));
    assert_eq!(compiler.rule_count(), sink.rule_count());
}

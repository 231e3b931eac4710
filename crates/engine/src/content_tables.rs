//! Bundled sample content.
//!
//! A small table of every content kind, used by the runner and end-to-end
//! tests. Names referenced by one record (features, languages, classes) are
//! all defined here.

use sheetsmith_domain::{ContentKind, ContentRecord};

const CLASSES: &[(&str, &str)] = &[
    (
        "Fighter",
        r#"Require="strength >= 9" Experience=0,2,4,8,18,35,70,125,250,500 HitDie=d10,9,3 Attack=0,1,1,- WeaponProficiency=4,3,-2 Breath=17,1.5,2 Death=14,1.5,2 Petrification=15,1.5,2 Spell=17,1.5,2 Wand=16,1.5,2 Features="1:Armor Proficiency","7:Multiple Attacks" Languages=Common"#,
    ),
    (
        "Cleric",
        r#"Require="wisdom >= 9" Experience=0,1.5,3,6,13,27.5,55,110,225,450 HitDie=d8,9,2 Attack=0,2,3,- WeaponProficiency=2,4,-3 Breath=16,1,3 Death=10,1,3 Petrification=13,1,3 Spell=15,1,3 Wand=14,1,3 Features="1:Turn Undead","wisdom >= 13 ? 1:Bonus Spells" Languages=Common SpellSlots=C1:1=1;2=2;4=3,C2:3=1;5=2"#,
    ),
    (
        "Magic-User",
        r#"Require="intelligence >= 9" Experience=0,2.5,5,10,22.5,40,60,90,135,250 HitDie=d4,11,1 Attack=0,1,5,- WeaponProficiency=1,6,-5 Breath=15,2,5 Death=14,2,5 Petrification=13,2,5 Spell=12,2,5 Wand=11,2,5 Features="1:Spell Book" Languages=Common SpellSlots=MU1:1=1;2=2;4=3,MU2:3=1;5=2"#,
    ),
];

const RACES: &[(&str, &str)] = &[
    (
        "Dwarf",
        r#"Require="constitution >= 9" Features=Infravision,"Dwarf Resistance" Languages=Common,Dwarf,Gnome"#,
    ),
    (
        "Elf",
        r#"Require="intelligence >= 8","constitution >= 7" Features=Infravision,"Detect Secret Doors" Languages=Common,Elf,Gnome"#,
    ),
    ("Human", "Languages=Common"),
];

const FEATURES: &[(&str, &str)] = &[
    (
        "Armor Proficiency",
        r#"Section=combat Note="May wear any armor and shield" Type=Class"#,
    ),
    (
        "Multiple Attacks",
        r#"Section=combat Note="3 attacks every 2 rounds" Type=Class"#,
    ),
    (
        "Turn Undead",
        r#"Section=magic Note="Turns undead as a level %{levels.Cleric} cleric" Type=Class"#,
    ),
    (
        "Bonus Spells",
        r#"Section=magic Note="Extra spells for high wisdom" Type=Class"#,
    ),
    (
        "Spell Book",
        r#"Section=magic Note="Records %{intelligence >= 13 ? 'all' : 'most'} spells studied" Type=Class"#,
    ),
    (
        "Infravision",
        r#"Section=feature Note="60' vision in the dark" Effects="infravision ^= 60" Type=Racial"#,
    ),
    (
        "Dwarf Resistance",
        r#"Section=save Note="+%{floor(constitution / 3.5)} vs. magic and poison" Effects="saveAdjustment.Spell += floor(constitution / 3.5)","saveAdjustment.Wand += floor(constitution / 3.5)" Type=Racial"#,
    ),
    (
        "Detect Secret Doors",
        r#"Section=feature Note="Finds secret doors on 1-2 in 6" Type=Racial"#,
    ),
];

const SPELLS: &[(&str, &str)] = &[
    (
        "Cure Light Wounds",
        r#"School=Necromancy Level=C1 Description="Touched creature regains 1d6+1 hit points""#,
    ),
    (
        "Light",
        r#"School=Alteration Level=C1,MU1 Description="$R radius light for $D" Duration="C1:%{source + 6} turns","MU1:%{source} turns" Range="20'""#,
    ),
    (
        "Magic Missile",
        r#"School=Evocation Level=MU1 Description="%{floor((source + 1) / 2)} missiles of 1d4+1 each within $R" Range="%{source * 10 + 60}'""#,
    ),
];

const WEAPONS: &[(&str, &str)] = &[
    ("Dagger", "Category=Li Damage=d4"),
    ("Punching Dagger", "Category=Li Damage=d4"),
    ("Long Sword", "Category=1h Damage=d8"),
    ("Long Bow", "Category=R Damage=d6 Range=70"),
    ("Unarmed", "Category=Un Damage=d2"),
];

const ARMOR: &[(&str, &str)] = &[
    ("Leather", "AC=2 Move=12 Weight=15"),
    ("Chain Mail", "AC=4 Move=9 Weight=30"),
    ("Plate Mail", "AC=6 Move=6 Weight=45"),
];

const SHIELDS: &[(&str, &str)] = &[
    ("Small Shield", "AC=1 Weight=5"),
    ("Large Shield", "AC=2 Weight=10"),
];

const SKILLS: &[(&str, &str)] = &[
    ("Climbing", "Ability=Strength Class=Fighter"),
    ("Herbalism", "Ability=Wisdom Class=Cleric,Magic-User"),
];

const LANGUAGES: &[&str] = &["Common", "Dwarf", "Elf", "Gnome"];

const GOODIES: &[(&str, &str)] = &[
    (
        "Ring Of Protection",
        r#"Pattern="ring of protection ([-+]\d+)" Value="-$1" Attribute=armorClass,saveAdjustment.Breath,saveAdjustment.Death,saveAdjustment.Petrification,saveAdjustment.Spell,saveAdjustment.Wand Section=combat Note="Protected by a ring""#,
    ),
    (
        "Armor Class",
        r#"Pattern="([-+]\d+) armor class" Value="-$1" Attribute=armorClass"#,
    ),
    (
        "Gauntlets Of Ogre Power",
        r#"Pattern="^gauntlets of ogre power$" Effect=max Value=18 Attribute=strength Section=ability Note="Strength raised to 18""#,
    ),
];

fn records(
    kind: ContentKind,
    table: &'static [(&'static str, &'static str)],
) -> impl Iterator<Item = ContentRecord> {
    table
        .iter()
        .map(move |(name, raw)| ContentRecord::new(kind, *name, *raw))
}

/// Every bundled record, grouped by kind.
pub fn sample_records() -> Vec<ContentRecord> {
    let mut all = Vec::new();
    all.extend(records(ContentKind::Class, CLASSES));
    all.extend(records(ContentKind::Race, RACES));
    all.extend(records(ContentKind::Feature, FEATURES));
    all.extend(records(ContentKind::Spell, SPELLS));
    all.extend(records(ContentKind::Weapon, WEAPONS));
    all.extend(records(ContentKind::Armor, ARMOR));
    all.extend(records(ContentKind::Shield, SHIELDS));
    all.extend(records(ContentKind::Skill, SKILLS));
    all.extend(
        LANGUAGES
            .iter()
            .map(|name| ContentRecord::new(ContentKind::Language, *name, "")),
    );
    all.extend(records(ContentKind::Goody, GOODIES));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Compiler;
    use crate::infrastructure::rule_set::RuleSet;
    use crate::infrastructure::settings::CompilerSettings;
    use sheetsmith_domain::{MapScope, MergeOp, Value};

    fn compile_samples() -> RuleSet {
        let records = sample_records();
        let mut compiler = Compiler::new(CompilerSettings::default(), &records);
        let mut sink = RuleSet::new();
        let report = compiler.compile_all(&records, &mut sink);
        assert!(report.is_clean(), "skipped: {:?}", report.skipped);
        assert_eq!(report.registered.len(), records.len());
        sink
    }

    #[test]
    fn every_sample_record_compiles() {
        let sink = compile_samples();
        for kind in ContentKind::ALL {
            let expected = sample_records().iter().filter(|r| r.kind() == kind).count();
            let choices = sink.choices(kind).count();
            if kind == ContentKind::Spell {
                // Light fans out to two variants
                assert_eq!(choices, expected + 1);
            } else {
                assert_eq!(choices, expected, "{}", kind);
            }
        }
    }

    #[test]
    fn fighter_levels_follow_experience() {
        let sink = compile_samples();
        let rules = sink.rules_for("levels.Fighter");
        assert_eq!(rules.len(), 1);
        let formula = rules[0].formula.as_ref().expect("steps formula");
        for (xp, level) in [(0.0, 1.0), (1999.0, 1.0), (2000.0, 2.0), (35000.0, 6.0)] {
            let scope = MapScope::new().with_source(xp);
            assert_eq!(formula.evaluate(&scope), Ok(Value::Number(level)), "{} xp", xp);
        }
    }

    #[test]
    fn spell_variants_and_sections() {
        let sink = compile_samples();
        let names: Vec<&str> = sink
            .choices(ContentKind::Spell)
            .map(|choice| choice.name())
            .collect();
        assert!(names.contains(&"Light(C1 Alte)"));
        assert!(names.contains(&"Light(MU1 Alte)"));
        assert!(names.contains(&"Magic Missile(MU1 Evoc)"));
        assert!(sink.sections().contains(&"magic".to_string()));

        let note = sink
            .note_for("spells.Magic Missile(MU1 Evoc)")
            .expect("magic missile note");
        assert_eq!(note.format, "%1 missiles of 1d4+1 each within %2'");
    }

    #[test]
    fn shared_save_rules_are_emitted_once() {
        let sink = compile_samples();
        let totals = sink.rules_for("save.Wand");
        // One shared set and one shared add across three classes
        assert_eq!(totals.len(), 2);
        let adjustments: Vec<MergeOp> = sink
            .rules_for("saveAdjustment.Wand")
            .iter()
            .map(|rule| rule.op)
            .collect();
        assert_eq!(adjustments, vec![MergeOp::Add, MergeOp::Add]);
    }

    #[test]
    fn output_serializes() {
        let sink = compile_samples();
        let json = serde_json::to_string(&sink).expect("serializes");
        let back: RuleSet = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back.rule_count(), sink.rule_count());
    }
}

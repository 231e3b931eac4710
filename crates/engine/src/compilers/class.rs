//! Class compiler.

use sheetsmith_domain::naming::member;
use sheetsmith_domain::{
    attribute_prefix, CompileError, ContentKind, ContentRecord, FieldTable, Formula,
    LeveledFeature, MergeOp, Progression, SAVE_CATEGORIES,
};

use super::{grant_languages, requirements, CompileContext, RecordOutput};

pub(super) fn compile(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let levels = member("levels", name);
    let mut out = RecordOutput::new();

    // Experience
    let experience = fields.experience("Experience")?;
    out.rule(
        levels.clone(),
        member("experiencePoints", name),
        experience.merge_policy().op(),
        experience.formula(),
    );
    out.rule(
        member("experienceNeeded", name),
        levels.clone(),
        experience.merge_policy().op(),
        experience.next_formula(),
    );
    out.passthrough("level", levels.clone(), MergeOp::Add);

    // Combat
    let attack = fields.attack("Attack")?;
    out.rule("baseAttack", levels.clone(), attack.merge_policy().op(), attack.formula());

    let hit_die = fields.hit_die("HitDie")?;
    out.rule("hitDice", levels.clone(), hit_die.merge_policy().op(), hit_die.formula());
    if hit_die.per_level != 0.0 {
        out.rule(
            "hitPointBonus",
            levels.clone(),
            hit_die.merge_policy().op(),
            hit_die.bonus_formula(),
        );
    }

    if let Some(proficiency) = fields.proficiency("WeaponProficiency")? {
        let op = proficiency.merge_policy().op();
        out.rule("weaponProficiencyCount", levels.clone(), op, proficiency.formula());
        out.rule(
            "weaponNonProficiencyPenalty",
            levels.clone(),
            op,
            proficiency.penalty_formula(),
        );
    }

    // Saves: the class value merges take-lowest across classes, then the
    // adjustments from race, features and goodies are added on top
    for category in SAVE_CATEGORIES {
        let save = fields.save(category)?;
        let class_save = member("classSave", category);
        let total = member("save", category);
        out.rule(class_save.clone(), levels.clone(), save.merge_policy().op(), save.formula());
        out.passthrough(total.clone(), class_save, MergeOp::Set);
        out.passthrough(total, member("saveAdjustment", category), MergeOp::Add);
    }

    for feature in fields.leveled("Features")? {
        ctx.catalog
            .require(ContentKind::Feature, &feature.name)
            .map_err(|e| e.in_field("Features"))?;
        out.rule(
            member("features", &feature.name),
            levels.clone(),
            MergeOp::Add,
            feature_grant(feature),
        );
    }

    let prefix = attribute_prefix(name);
    requirements(&mut out, fields.list("Require")?, &prefix, &levels)?;
    grant_languages(&mut out, fields.list("Languages")?, &levels, ctx)?;

    let mut groups: Vec<&str> = Vec::new();
    for table in fields.spell_slots("SpellSlots")? {
        match ctx.settings.caster_class(&table.group) {
            Some(class) if class == name => {}
            Some(class) => {
                return Err(CompileError::semantic(format!(
                    "caster group '{}' belongs to {}",
                    table.group, class
                ))
                .in_field("SpellSlots"))
            }
            None => {
                return Err(CompileError::semantic(format!(
                    "unknown caster group '{}'",
                    table.group
                ))
                .in_field("SpellSlots"))
            }
        }
        out.rule(
            member("spellSlots", &table.label()),
            levels.clone(),
            table.merge_policy().op(),
            table.formula(),
        );
        if !groups.contains(&table.group.as_str()) {
            groups.push(&table.group);
        }
    }
    for group in groups {
        out.passthrough(member("casterLevels", group), levels.clone(), MergeOp::Max);
    }

    out.choice(ContentKind::Class, name, record.raw_spec());
    Ok(out)
}

/// `source >= L ? 1`, gated by the entry's predicate when it has one.
pub(super) fn feature_grant(feature: &LeveledFeature) -> Formula {
    let reached = Formula::source().ge(Formula::number(f64::from(feature.level)));
    let condition = match &feature.condition {
        Some(predicate) => predicate.clone().and(reached),
        None => reached,
    };
    Formula::when(condition, Formula::number(1.0))
}

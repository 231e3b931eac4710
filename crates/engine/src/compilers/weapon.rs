//! Weapon compiler.

use std::sync::OnceLock;

use regex_lite::Regex;
use sheetsmith_domain::naming::member;
use sheetsmith_domain::{
    BinaryOp, CompileError, ContentKind, ContentRecord, FieldTable, Formula, MergeOp,
};

use super::patterns::BonusPattern;
use super::{CompileContext, RecordOutput};

static DAMAGE_REGEX: OnceLock<Regex> = OnceLock::new();

fn check_damage(damage: &str) -> Result<(), CompileError> {
    let re = DAMAGE_REGEX.get_or_init(|| {
        Regex::new(r"^(\d*)d(\d+)([+-]\d+)?$").expect("DAMAGE_REGEX pattern is invalid")
    });
    if re.is_match(damage) {
        Ok(())
    } else {
        Err(CompileError::semantic(format!("'{}' is not a damage roll", damage)).in_field("Damage"))
    }
}

pub(super) fn compile(
    record: &ContentRecord,
    fields: &FieldTable,
    ctx: &CompileContext<'_>,
) -> Result<RecordOutput, CompileError> {
    let name = record.name();
    let category = fields.text("Category")?;
    if !ctx.settings.weapon_categories.iter().any(|c| c == category) {
        return Err(
            CompileError::semantic(format!("unknown category '{}'", category)).in_field("Category"),
        );
    }
    let damage = fields.text("Damage")?;
    check_damage(damage)?;
    let range = fields.optional_number("Range")?;

    let pattern = BonusPattern::weapon(name)?;
    pattern.ensure_specific()?;
    for other in ctx.catalog.names(ContentKind::Weapon) {
        pattern.ensure_distinct(name, other)?;
    }

    let selected = member("weapons", name);
    let attack = member("weaponAttack", name);
    let damage_attr = member("weaponDamage", name);
    let range_attr = member("weaponRange", name);
    let bonus = member("weaponBonus", name);
    let ability = if ctx.settings.is_ranged(category) {
        &ctx.settings.ranged_ability
    } else {
        &ctx.settings.melee_ability
    };
    let mut out = RecordOutput::new();

    out.rule(
        attack.clone(),
        selected.clone(),
        MergeOp::Set,
        Formula::when(
            Formula::source(),
            Formula::sum([
                Formula::attr("baseAttack"),
                Formula::attr(format!("{}Modifier", ability)),
                Formula::attr(bonus.clone()),
            ]),
        ),
    );
    out.rule(
        damage_attr.clone(),
        selected.clone(),
        MergeOp::Set,
        Formula::when(Formula::source(), Formula::text(damage)),
    );
    if let Some(range) = range {
        out.rule(
            range_attr.clone(),
            selected.clone(),
            MergeOp::Set,
            Formula::when(Formula::source(), Formula::number(range)),
        );
    }

    // `+N name` in the goodies list; `$1` for the prefix form, `$2` otherwise
    let captured = Formula::binary(BinaryOp::Or, Formula::capture(1), Formula::capture(2));
    out.rule(bonus, "goodiesList", MergeOp::Add, pattern.formula(captured));

    let mut format = String::from("%1 %2");
    out.passthrough(format!("{}.1", selected), attack, MergeOp::Set);
    out.passthrough(format!("{}.2", selected), damage_attr, MergeOp::Set);
    if range.is_some() {
        format.push_str(" R%3'");
        out.passthrough(format!("{}.3", selected), range_attr, MergeOp::Set);
    }
    out.note(selected, "combat", format);

    out.choice(ContentKind::Weapon, name, record.raw_spec());
    Ok(out)
}

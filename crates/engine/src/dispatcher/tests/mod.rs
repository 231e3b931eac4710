//! Dispatcher scenario tests.
//!
//! - `registration`: sink protocol, failure isolation and ledger checks
//! - `recompile`: retraction and handover of collapsed rules

mod registration;

use sheetsmith_domain::{ContentKind, ContentRecord};

use super::Compiler;
use crate::infrastructure::settings::CompilerSettings;

const SAVES: &str = "Breath=16,1,3 Death=10,1,3 Petrification=13,1,3 Spell=15,1,3 Wand=14,1,3";

fn class(name: &str, progression: &str) -> ContentRecord {
    ContentRecord::new(
        ContentKind::Class,
        name,
        format!("{} {}", progression, SAVES),
    )
}

fn fighter() -> ContentRecord {
    class("Fighter", "Experience=0,2,4 HitDie=d10,9,3 Attack=0,1,1,-")
}

fn cleric() -> ContentRecord {
    class("Cleric", "Experience=0,1.5,3 HitDie=d8,9,2 Attack=0,2,3,-")
}

fn feature(name: &str, raw: &str) -> ContentRecord {
    ContentRecord::new(ContentKind::Feature, name, raw)
}

fn language(name: &str) -> ContentRecord {
    ContentRecord::new(ContentKind::Language, name, "")
}

fn compiler(records: &[ContentRecord]) -> Compiler {
    Compiler::new(CompilerSettings::default(), records)
}

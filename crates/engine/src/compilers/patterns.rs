//! Patterns matched against the character's goodies list.
//!
//! Equipment bonuses (`+2 dagger`, `(dagger +2)`) and goodies are recognized
//! by case-insensitive patterns evaluated one line at a time. A pattern that
//! also matches another item's text would credit the bonus twice, so every
//! generated pattern is checked before it is emitted.

use std::sync::OnceLock;

use regex_lite::Regex;
use sheetsmith_domain::{CompileError, Formula};

static FLAGS_REGEX: OnceLock<Regex> = OnceLock::new();

/// Text that no item-specific pattern may match.
const OVER_BROAD_PROBES: [&str; 3] = ["", "x", "+1"];

/// A compiled goodies-list pattern.
#[derive(Debug, Clone)]
pub struct BonusPattern {
    regex: Regex,
}

impl BonusPattern {
    /// `+N name` or `(name +N)` on a line of its own, capturing the signed
    /// bonus as `$1` (prefix form) or `$2` (suffix form).
    pub fn weapon(name: &str) -> Result<Self, CompileError> {
        let name = regex_lite::escape(&name.trim().to_lowercase());
        if name.is_empty() {
            return Err(CompileError::structural("equipment name is empty"));
        }
        let pattern = format!(
            r"(?im)(?:^|\()\s*(?:([-+]\d+)\s+{name}|{name}\s+([-+]\d+))\s*(?:$|\))"
        );
        Self::compile(&pattern)
    }

    /// Author-supplied pattern, always matched case-insensitively per line.
    pub fn custom(pattern: &str) -> Result<Self, CompileError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(CompileError::structural("pattern is empty"));
        }
        let flags = FLAGS_REGEX.get_or_init(|| {
            Regex::new(r"^\(\?[a-zA-Z]+\)").expect("FLAGS_REGEX pattern is invalid")
        });
        let body = flags.replace(pattern, "");
        Self::compile(&format!("(?im){}", body))
    }

    fn compile(pattern: &str) -> Result<Self, CompileError> {
        let regex = Regex::new(pattern)
            .map_err(|e| CompileError::structural(format!("invalid pattern: {}", e)))?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// `matches(source, pattern, value)` for a rule sourced from the goodies
    /// list.
    pub fn formula(&self, value: Formula) -> Formula {
        Formula::matches(Formula::source(), self.as_str(), value)
    }

    /// Rejects patterns that match text naming no item at all.
    pub fn ensure_specific(&self) -> Result<(), CompileError> {
        match OVER_BROAD_PROBES.iter().find(|probe| self.is_match(probe)) {
            Some(probe) => Err(CompileError::aliasing(format!(
                "pattern '{}' matches '{}'",
                self.as_str(),
                probe
            ))),
            None => Ok(()),
        }
    }

    /// Rejects the pattern when it matches an item named `other`, bare or
    /// carrying a bonus.
    pub fn ensure_distinct(&self, own: &str, other: &str) -> Result<(), CompileError> {
        if own.eq_ignore_ascii_case(other) {
            return Ok(());
        }
        let probes = [
            other.to_string(),
            format!("+1 {}", other),
            format!("({} +1)", other),
            format!("{} +1", other),
        ];
        match probes.iter().find(|probe| self.is_match(probe)) {
            Some(probe) => Err(CompileError::aliasing(format!(
                "pattern for '{}' also matches '{}'",
                own, probe
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weapon_pattern_matches_both_forms() {
        let dagger = BonusPattern::weapon("Dagger").expect("valid");
        assert!(dagger.is_match("+2 dagger"));
        assert!(dagger.is_match("(Dagger +2)"));
        assert!(dagger.is_match("rope\n-1 dagger\nlantern"));
        assert!(!dagger.is_match("punching dagger +2"));
        assert!(!dagger.is_match("dagger"));
    }

    #[test]
    fn weapon_bonus_needs_a_sign_and_the_full_name() {
        let sword = BonusPattern::weapon("Long Sword").expect("valid");
        assert!(sword.is_match("+3 long sword"));
        assert!(sword.is_match("(long sword -1)"));
        assert!(!sword.is_match("+3 short sword"));
        assert!(!sword.is_match("3 long sword"));
    }

    #[test]
    fn names_are_escaped() {
        let pattern = BonusPattern::weapon("Sling (Staff)").expect("valid");
        assert!(pattern.is_match("+1 sling (staff)"));
        assert!(!pattern.is_match("+1 sling xstaffx"));
    }

    #[test]
    fn over_broad_patterns_are_aliasing_hazards() {
        let any = BonusPattern::custom(".*").expect("valid regex");
        let err = any.ensure_specific().expect_err("matches everything");
        assert!(matches!(err, CompileError::AliasingHazard(_)));

        let ring = BonusPattern::custom(r"ring of protection ([-+]\d+)").expect("valid regex");
        assert!(ring.ensure_specific().is_ok());
        assert!(ring.is_match("Ring Of Protection +1"));
    }

    #[test]
    fn overlapping_weapon_names_are_aliasing_hazards() {
        let dagger = BonusPattern::weapon("Dagger").expect("valid");
        assert!(dagger.ensure_distinct("Dagger", "Punching Dagger").is_ok());

        let sword = BonusPattern::weapon("Sword").expect("valid");
        let err = sword
            .ensure_distinct("Sword", "Sword +1")
            .expect_err("the other name looks like a bonus");
        assert!(matches!(err, CompileError::AliasingHazard(_)));
    }

    #[test]
    fn invalid_custom_pattern_is_structural() {
        let err = BonusPattern::custom("ring (").expect_err("unbalanced group");
        assert!(matches!(err, CompileError::StructuralParse(_)));
    }

    #[test]
    fn existing_flags_are_replaced() {
        let pattern = BonusPattern::custom("(?i)^cloak$").expect("valid regex");
        assert_eq!(pattern.as_str(), "(?im)^cloak$");
        assert!(pattern.is_match("boots\nCloak"));
    }
}

//! Canonical attribute names derived from record names.

/// Converts a record name into the lowerCamelCase prefix used for its
/// attributes, dropping punctuation.
///
/// `Magic-User` becomes `magicUser`, `Punching Dagger` becomes
/// `punchingDagger`.
pub fn attribute_prefix(name: &str) -> String {
    let mut prefix = String::with_capacity(name.len());
    for word in name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if prefix.is_empty() {
            prefix.extend(first.to_lowercase());
        } else {
            prefix.extend(first.to_uppercase());
        }
        prefix.push_str(chars.as_str());
    }
    prefix
}

/// `<group>.<member>` attribute name, e.g. `levels.Fighter`.
pub fn member(group: &str, member: &str) -> String {
    format!("{}.{}", group, member)
}

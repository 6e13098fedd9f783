//! Rust identifier escaping for schema names.

/// Rust keywords that cannot be used as identifiers.
const RUST_KEYWORDS: &[&str] = &[
    // Strict keywords
    "as", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop",
    "match", "mod", "move", "mut", "pub", "ref", "return", "self", "Self",
    "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while",
    // Reserved keywords
    "abstract", "async", "await", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual",
    "yield",
];

/// Escape a schema name into a valid Rust identifier.
///
/// Non-identifier characters fold to `_`, a leading digit gets a `_`
/// prefix, and keywords get a trailing `_`.
pub fn escape_ident(name: &str) -> String {
    let mut ident = String::with_capacity(name.len());

    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if i == 0 && c.is_ascii_digit() {
                ident.push('_');
            }
            ident.push(c);
        } else {
            ident.push('_');
        }
    }

    if ident.is_empty() {
        ident.push('_');
    }
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }

    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass_through() {
        assert_eq!(escape_ident("ammoCount"), "ammoCount");
        assert_eq!(escape_ident("WeaponParams"), "WeaponParams");
    }

    #[test]
    fn test_keywords_get_suffix() {
        assert_eq!(escape_ident("type"), "type_");
        assert_eq!(escape_ident("ref"), "ref_");
        assert_eq!(escape_ident("Self"), "Self_");
    }

    #[test]
    fn test_invalid_characters_fold() {
        assert_eq!(escape_ident("EntityClass.Weapon"), "EntityClass_Weapon");
        assert_eq!(escape_ident("3dModel"), "_3dModel");
        assert_eq!(escape_ident(""), "_");
    }
}

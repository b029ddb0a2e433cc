//! Identifier validation.
//!
//! Identifiers in this dialect are emitted unquoted: the system does not
//! escape, so a malformed name must be rejected at schema-setup time rather
//! than silently concatenated into SQL later.

use crate::error::{Result, VaultError};

// Not exhaustive; enough to catch the identifiers most likely to collide
// with emitted SQL syntax if ever passed through unescaped.
const RESERVED_WORDS: &[&str] = &[
    "select", "insert", "update", "delete", "drop", "create", "alter", "table",
    "from", "where", "join", "inner", "left", "right", "on", "and", "or", "not",
    "in", "is", "null", "like", "between", "order", "by", "group", "having",
    "limit", "offset", "as", "distinct", "union", "values", "set", "into",
];

/// Validates a single identifier (table name, column name, alias).
///
/// Must be non-empty, ASCII alphanumeric/underscore only, not starting with a
/// digit, and not a reserved word (case-insensitive).
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VaultError::schema("identifier cannot be empty"));
    }
    let first = name.chars().next().unwrap();
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(VaultError::schema(format!(
            "identifier '{}' must start with a letter or underscore",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(VaultError::schema(format!(
            "identifier '{}' must contain only ASCII letters, digits or underscore",
            name
        )));
    }
    if RESERVED_WORDS.contains(&name.to_lowercase().as_str()) {
        return Err(VaultError::schema(format!(
            "identifier '{}' is a reserved word",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("role_id").is_ok());
        assert!(validate_identifier("_private").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_rejects_leading_digit() {
        assert!(validate_identifier("1name").is_err());
    }

    #[test]
    fn test_rejects_whitespace_and_punctuation() {
        assert!(validate_identifier("user name").is_err());
        assert!(validate_identifier("users;drop").is_err());
        assert!(validate_identifier("`users`").is_err());
    }

    #[test]
    fn test_rejects_reserved_word_case_insensitive() {
        assert!(validate_identifier("SELECT").is_err());
        assert!(validate_identifier("Where").is_err());
    }
}

//! Name mapping (component B): a bidirectional map between database column
//! names and caller-visible logical names.

use crate::error::{Result, VaultError};

/// A rule is a partial function column-name -> logical-name. `None` means
/// "I don't know", not "there is no logical name".
pub trait NameRule: Send + Sync {
    fn logical_name_of(&self, column: &str) -> Option<String>;
}

/// Maps every column to its own name, unchanged. The common default rule.
pub struct IdentityRule;

impl NameRule for IdentityRule {
    fn logical_name_of(&self, column: &str) -> Option<String> {
        Some(column.to_string())
    }
}

/// Strips a fixed prefix (e.g. `users_name` -> `name` for table `users`),
/// only matching columns that actually carry the prefix.
pub struct PrefixStripRule {
    prefix: String,
}

impl PrefixStripRule {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl NameRule for PrefixStripRule {
    fn logical_name_of(&self, column: &str) -> Option<String> {
        column.strip_prefix(&self.prefix).map(|s| s.to_string())
    }
}

/// Bidirectional column-name <-> logical-name map.
///
/// Resolution order for forward lookup: direct mappings first, then rules in
/// the order they were added; first definite hit wins.
#[derive(Default)]
pub struct NameMapping {
    direct: Vec<(String, String)>,
    rules: Vec<Box<dyn NameRule>>,
}

impl NameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Box<dyn NameRule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn add_direct_mapping(&mut self, column: impl Into<String>, logical: impl Into<String>) -> &mut Self {
        self.direct.push((column.into(), logical.into()));
        self
    }

    /// Forward lookup: column name -> logical name.
    pub fn logical_name_of(&self, column: &str) -> Result<String> {
        for (c, l) in &self.direct {
            if c.eq_ignore_ascii_case(column) {
                return Ok(l.clone());
            }
        }
        for rule in &self.rules {
            if let Some(logical) = rule.logical_name_of(column) {
                return Ok(logical);
            }
        }
        Err(VaultError::name_mapping(format!(
            "NoLogicalForColumn: no rule produced a logical name for column '{}'",
            column
        )))
    }

    /// Reverse lookup: logical name -> column name, linear over the given
    /// table's known column names (the caller passes the table's current
    /// db-column-name list so this module need not depend on `schema`).
    pub fn column_name_of(&self, logical: &str, known_columns: &[String]) -> Result<String> {
        for column in known_columns {
            if let Ok(candidate) = self.logical_name_of(column) {
                if candidate.eq_ignore_ascii_case(logical) {
                    return Ok(column.clone());
                }
            }
        }
        Err(VaultError::name_mapping(format!(
            "NoColumnForLogical: no known column maps to logical name '{}'",
            logical
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_mapping_wins_over_rules() {
        let mut mapping = NameMapping::new();
        mapping.add_rule(Box::new(IdentityRule));
        mapping.add_direct_mapping("role_id", "roleId");
        assert_eq!(mapping.logical_name_of("role_id").unwrap(), "roleId");
    }

    #[test]
    fn test_rules_tried_in_insertion_order() {
        let mut mapping = NameMapping::new();
        mapping.add_rule(Box::new(PrefixStripRule::new("users_")));
        mapping.add_rule(Box::new(IdentityRule));
        assert_eq!(mapping.logical_name_of("users_name").unwrap(), "name");
        assert_eq!(mapping.logical_name_of("id").unwrap(), "id");
    }

    #[test]
    fn test_missing_logical_is_error() {
        let mapping = NameMapping::new();
        assert!(mapping.logical_name_of("anything").is_err());
    }

    #[test]
    fn test_reverse_lookup_is_inverse_of_forward() {
        let mut mapping = NameMapping::new();
        mapping.add_rule(Box::new(IdentityRule));
        let known = vec!["id".to_string(), "name".to_string(), "role_id".to_string()];
        for column in &known {
            let logical = mapping.logical_name_of(column).unwrap();
            assert_eq!(mapping.column_name_of(&logical, &known).unwrap(), *column);
        }
    }

    #[test]
    fn test_reverse_lookup_missing_is_error() {
        let mapping = NameMapping::new();
        assert!(mapping.column_name_of("nope", &[]).is_err());
    }
}

//! TableReference (component C).

use super::column::Column;

/// An authoritative foreign-key relation: `referencing_column` (on this
/// table) points at `referenced_column` (on the other table). Immutable once
/// constructed.
#[derive(Debug, Clone)]
pub struct TableReference {
    referencing_column: Column,
    referenced_column: Column,
}

impl TableReference {
    /// Only ever constructed for two columns that belong to distinct
    /// tables; the schema reflection layer is responsible for confirming
    /// this against the server before calling here.
    pub fn new(referencing_column: Column, referenced_column: Column) -> Self {
        debug_assert!(
            !referencing_column
                .table_name()
                .eq_ignore_ascii_case(referenced_column.table_name()),
            "a table reference must link two distinct tables"
        );
        Self {
            referencing_column,
            referenced_column,
        }
    }

    pub fn referencing_column(&self) -> &Column {
        &self.referencing_column
    }

    pub fn referenced_column(&self) -> &Column {
        &self.referenced_column
    }

    pub fn referencing_table(&self) -> &str {
        self.referencing_column.table_name()
    }

    pub fn referenced_table(&self) -> &str {
        self.referenced_column.table_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ColumnDefault;
    use crate::value::DataType;

    fn col(table: &str, index: usize, name: &str) -> Column {
        Column::new(table, index, name, name, DataType::Int, false, false, false, ColumnDefault::None).unwrap()
    }

    #[test]
    fn test_reference_exposes_both_tables() {
        let r = TableReference::new(col("users", 1, "role_id"), col("roles", 0, "id"));
        assert_eq!(r.referencing_table(), "users");
        assert_eq!(r.referenced_table(), "roles");
    }
}

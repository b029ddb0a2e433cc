//! A materialised result row: an ordered list of `{column, value}` pairs,
//! indexable by position or by logical name.

use crate::schema::Column;
use crate::value::Value;

/// One materialised result row. Columns retain their full schema identity
/// (table, datatype, logical name) so callers can look entries up either
/// way.
#[derive(Debug, Clone, Default)]
pub struct Row {
    entries: Vec<(Column, Value)>,
}

impl Row {
    pub fn new(entries: Vec<(Column, Value)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn at(&self, position: usize) -> Option<&Value> {
        self.entries.get(position).map(|(_, v)| v)
    }

    pub fn by_logical_name(&self, logical: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c.logical_name().eq_ignore_ascii_case(logical))
            .map(|(_, v)| v)
    }

    pub fn by_db_name(&self, table: &str, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c.table_name().eq_ignore_ascii_case(table) && c.db_name().eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.entries.iter().map(|(c, _)| c)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(Column, Value)] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDefault;
    use crate::value::DataType;

    fn row() -> Row {
        Row::new(vec![
            (
                Column::new("users", 0, "id", "id", DataType::Int, false, true, true, ColumnDefault::None).unwrap(),
                Value::Int(1),
            ),
            (
                Column::new("users", 1, "name", "name", DataType::String, false, false, false, ColumnDefault::None)
                    .unwrap(),
                Value::String("alice".to_string()),
            ),
        ])
    }

    #[test]
    fn test_index_by_position() {
        assert_eq!(row().at(1), Some(&Value::String("alice".to_string())));
    }

    #[test]
    fn test_index_by_logical_name() {
        assert_eq!(row().by_logical_name("name"), Some(&Value::String("alice".to_string())));
    }

    #[test]
    fn test_index_by_db_name_is_table_qualified() {
        assert_eq!(row().by_db_name("users", "id"), Some(&Value::Int(1)));
        assert_eq!(row().by_db_name("roles", "id"), None);
    }
}

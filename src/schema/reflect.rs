//! Default, server-backed [`ColumnInitialiser`] and [`TableReferenceReader`]
//! implementations: `DESCRIBE <table>` for columns, `INFORMATION_SCHEMA
//! .KEY_COLUMN_USAGE` for foreign keys, run through a [`ConnectionPool`].

use std::sync::Arc;

use crate::error::{Result, VaultError};
use crate::mapping::NameMapping;
use crate::pool::ConnectionPool;
use crate::value::DataType;

use super::column::{Column, ColumnDefault};
use super::reference::TableReference;
use super::table::{ColumnInitialiser, TableReferenceReader};

/// Reflects columns via `DESCRIBE` and foreign keys via
/// `INFORMATION_SCHEMA.KEY_COLUMN_USAGE`, running both through the pool's
/// `borrow` so reflection queries share the same connections as ordinary
/// statements.
pub struct ServerSchemaReader {
    pool: Arc<ConnectionPool>,
}

impl ServerSchemaReader {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

/// Maps a MySQL column type string (as reported by `DESCRIBE`) to the
/// crate's datatype tags. Unrecognised types fall back to `String` rather
/// than failing reflection outright.
fn parse_mysql_type(raw: &str) -> DataType {
    let lowered = raw.to_ascii_lowercase();
    if lowered.starts_with("tinyint(1)") {
        DataType::Bool
    } else if lowered.starts_with("bigint") {
        DataType::Long
    } else if lowered.starts_with("int")
        || lowered.starts_with("tinyint")
        || lowered.starts_with("smallint")
        || lowered.starts_with("mediumint")
    {
        DataType::Int
    } else if lowered.starts_with("double") || lowered.starts_with("float") || lowered.starts_with("decimal") {
        DataType::Double
    } else if lowered.starts_with("datetime") || lowered.starts_with("timestamp") {
        DataType::DateTime
    } else if lowered.starts_with("date") {
        DataType::Date
    } else if lowered.starts_with("time") {
        DataType::Time
    } else {
        DataType::String
    }
}

fn parse_default(raw: Option<String>, extra: &str, datatype: DataType) -> Result<ColumnDefault> {
    if extra.to_ascii_lowercase().contains("auto_increment") {
        return Ok(ColumnDefault::None);
    }
    match raw {
        None => Ok(ColumnDefault::None),
        Some(text) if text.eq_ignore_ascii_case("CURRENT_TIMESTAMP") => Ok(ColumnDefault::CurrentTimestamp),
        Some(text) => {
            let value = crate::value::Value::String(text).cast_to(datatype)?;
            Ok(ColumnDefault::Value(value))
        }
    }
}

impl ColumnInitialiser for ServerSchemaReader {
    fn init_columns(&self, database_name: &str, table_name: &str, mapping: &NameMapping) -> Result<Vec<Column>> {
        let sql = format!("DESCRIBE {}.{}", database_name, table_name);
        let rows = self.pool.borrow(|conn| conn.query_raw(&sql, Vec::new()))?;

        let mut columns = Vec::with_capacity(rows.len());
        for (index, mut row) in rows.into_iter().enumerate() {
            let field: String = row
                .take("Field")
                .ok_or_else(|| VaultError::table_init_failed("DESCRIBE row missing Field column"))?;
            let type_str: String = row
                .take("Type")
                .ok_or_else(|| VaultError::table_init_failed("DESCRIBE row missing Type column"))?;
            let null_str: String = row
                .take("Null")
                .ok_or_else(|| VaultError::table_init_failed("DESCRIBE row missing Null column"))?;
            let key_str: String = row.take("Key").unwrap_or_default();
            let default_raw: Option<String> = row.take("Default").unwrap_or(None);
            let extra: String = row.take("Extra").unwrap_or_default();

            let datatype = parse_mysql_type(&type_str);
            let nullable = null_str.eq_ignore_ascii_case("YES");
            let primary = key_str.eq_ignore_ascii_case("PRI");
            let auto_increment = extra.to_ascii_lowercase().contains("auto_increment");
            let default = parse_default(default_raw, &extra, datatype)?;
            let logical_name = mapping.logical_name_of(&field).unwrap_or_else(|_| field.clone());

            columns.push(Column::new(
                table_name,
                index,
                field,
                logical_name,
                datatype,
                nullable,
                primary,
                auto_increment,
                default,
            )?);
        }

        if columns.is_empty() {
            return Err(VaultError::table_init_failed(format!(
                "table '{}' has no columns (does it exist?)",
                table_name
            )));
        }
        Ok(columns)
    }
}

impl TableReferenceReader for ServerSchemaReader {
    fn read_references(
        &self,
        database_name: &str,
        this_table: &str,
        this_columns: &[Column],
        other_table: &str,
        other_columns: &[Column],
    ) -> Result<Vec<TableReference>> {
        let sql = "SELECT column_name, referenced_column_name FROM information_schema.key_column_usage \
                    WHERE table_schema = ? AND table_name = ? AND referenced_table_name = ?";
        let params = vec![
            crate::value::to_driver_value(&crate::value::Value::String(database_name.to_string())),
            crate::value::to_driver_value(&crate::value::Value::String(this_table.to_string())),
            crate::value::to_driver_value(&crate::value::Value::String(other_table.to_string())),
        ];
        let rows = self.pool.borrow(|conn| conn.query_raw(sql, params))?;

        let mut refs = Vec::new();
        for mut row in rows {
            let column_name: String = row
                .take("column_name")
                .ok_or_else(|| VaultError::table_init_failed("KEY_COLUMN_USAGE row missing column_name"))?;
            let referenced_column_name: String = row
                .take("referenced_column_name")
                .ok_or_else(|| VaultError::table_init_failed("KEY_COLUMN_USAGE row missing referenced_column_name"))?;

            let referencing = this_columns
                .iter()
                .find(|c| c.db_name().eq_ignore_ascii_case(&column_name))
                .ok_or_else(|| {
                    VaultError::schema(format!(
                        "NoSuchColumn: foreign key references unknown column '{}.{}'",
                        this_table, column_name
                    ))
                })?;
            let referenced = other_columns
                .iter()
                .find(|c| c.db_name().eq_ignore_ascii_case(&referenced_column_name))
                .ok_or_else(|| {
                    VaultError::schema(format!(
                        "NoSuchColumn: foreign key references unknown column '{}.{}'",
                        other_table, referenced_column_name
                    ))
                })?;
            refs.push(TableReference::new(referencing.clone(), referenced.clone()));
        }
        Ok(refs)
    }
}

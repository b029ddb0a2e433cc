//! ValueAssignment: the column/value pairs behind `SET` and `INSERT` clauses.

use crate::error::{Result, VaultError};
use crate::schema::{Column, Table};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum AssignmentSource {
    Value(Value),
    Column(Column),
}

#[derive(Debug, Clone, Default)]
pub struct ValueAssignment {
    entries: Vec<(Column, AssignmentSource)>,
    drop_nulls: bool,
}

impl ValueAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled, `set()` silently omits entries whose value is null
    /// instead of appending them.
    pub fn drop_nulls(mut self, drop_nulls: bool) -> Self {
        self.drop_nulls = drop_nulls;
        self
    }

    pub fn set(mut self, column: Column, value: Value) -> Self {
        if self.drop_nulls && value.is_null() {
            return self;
        }
        self.entries.push((column, AssignmentSource::Value(value)));
        self
    }

    pub fn set_from_column(mut self, target: Column, source: Column) -> Self {
        self.entries.push((target, AssignmentSource::Column(source)));
        self
    }

    pub fn entries(&self) -> &[(Column, AssignmentSource)] {
        &self.entries
    }

    /// Retains only entries whose target column belongs to `table`,
    /// optionally dropping auto-increment columns.
    pub fn filter_to_table(&self, table: &str, drop_auto_increment: bool) -> Self {
        self.filter_to_tables(&[table], drop_auto_increment)
    }

    pub fn filter_to_tables(&self, tables: &[&str], drop_auto_increment: bool) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(column, _)| {
                tables.iter().any(|t| t.eq_ignore_ascii_case(column.table_name()))
                    && !(drop_auto_increment && column.auto_increment())
            })
            .cloned()
            .collect();
        Self { entries, drop_nulls: self.drop_nulls }
    }

    /// Every column of `table` with `required_in_insert()` must have a
    /// non-null assignment present.
    pub fn contains_required_columns(&self, table: &Table, column_init: &dyn crate::schema::ColumnInitialiser) -> Result<bool> {
        for column in table.columns(column_init)? {
            if !column.required_in_insert() {
                continue;
            }
            let present = self.entries.iter().any(|(target, source)| {
                target.same_identity(column)
                    && match source {
                        AssignmentSource::Value(v) => !v.is_null(),
                        AssignmentSource::Column(_) => true,
                    }
            });
            if !present {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Renders one source. `Value` sources are validated against `target`'s
    /// declared datatype via [`crate::value::bind_to_column`] before being
    /// appended to `values`, so a value with no conversion path to its
    /// column raises `ValueBindFailed` at bind time rather than later being
    /// rejected by the driver.
    fn render_source(target: &Column, source: &AssignmentSource, values: &mut Vec<Value>) -> Result<String> {
        match source {
            AssignmentSource::Value(v) => {
                let bound = crate::value::bind_to_column(v, target.datatype(), values.len())?;
                values.push(bound);
                Ok("?".to_string())
            }
            AssignmentSource::Column(c) => Ok(c.db_name().to_string()),
        }
    }

    /// `" SET a=?, b=source_col, ..."`. MySQL disallows qualifying the target
    /// column in the `SET` position, so targets are emitted bare.
    pub fn to_sql_set(&self) -> Result<(String, Vec<Value>)> {
        let mut parts = Vec::with_capacity(self.entries.len());
        let mut values = Vec::new();
        for (target, source) in &self.entries {
            let source_sql = Self::render_source(target, source, &mut values)?;
            parts.push(format!("{}={}", target.db_name(), source_sql));
        }
        Ok((format!(" SET {}", parts.join(", ")), values))
    }

    /// `"INSERT INTO <table> (a, b, ...) VALUES (?, ?, ...)"`. Caller must
    /// have already filtered `self` to `table` and verified
    /// `contains_required_columns`.
    pub fn to_sql_insert(&self, table: &str) -> Result<(String, Vec<Value>)> {
        if self.entries.is_empty() {
            return Err(VaultError::clause(format!("IncompleteInsert: no assignments target table '{}'", table)));
        }
        let mut columns = Vec::with_capacity(self.entries.len());
        let mut placeholders = Vec::with_capacity(self.entries.len());
        let mut values = Vec::new();
        for (target, source) in &self.entries {
            columns.push(target.db_name().to_string());
            placeholders.push(Self::render_source(target, source, &mut values)?);
        }
        Ok((
            format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders.join(", ")),
            values,
        ))
    }
}

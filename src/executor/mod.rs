//! Query executor (component F): select/insert/update/delete composed from
//! the clause algebra, run against an externally-managed connection or a
//! temporary one borrowed from the pool.

mod config;

pub use config::{ExecutorConfig, ExecutorConfigBuilder};

use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

use crate::clause::{Clause, Condition, Join, OrderBy, Selection, ValueAssignment};
use crate::error::{ErrorContext, Result, VaultError};
use crate::pool::{Connection, ConnectionPool};
use crate::row::Row;
use crate::schema::{Column, ColumnDefault, ColumnInitialiser, Table, TableReferenceReader};
use crate::value::{from_driver_value, to_driver_value, DataType, Value};

/// Everything the executor needs to reflect schema on demand. Bundled so
/// callers configure it once rather than threading two trait objects through
/// every call.
pub struct SchemaCapabilities {
    pub column_init: Arc<dyn ColumnInitialiser>,
    pub ref_reader: Arc<dyn TableReferenceReader>,
}

pub struct QueryExecutor {
    pool: Arc<ConnectionPool>,
    schema: SchemaCapabilities,
    config: ExecutorConfig,
}

impl QueryExecutor {
    pub fn new(pool: Arc<ConnectionPool>, schema: SchemaCapabilities, config: ExecutorConfig) -> Self {
        Self { pool, schema, config }
    }

    fn column_init(&self) -> &dyn ColumnInitialiser {
        self.schema.column_init.as_ref()
    }

    /// Runs `f` against `conn` if given, else a temporary connection
    /// borrowed from the pool for the duration of the call. Wraps the call
    /// in the retry policy and slow-query logging.
    fn run<F, R>(&self, conn: Option<&mut Connection>, mut f: F) -> Result<R>
    where
        F: FnMut(&mut Connection) -> Result<R>,
    {
        match conn {
            Some(c) => self.with_retry(|| f(c)),
            None => self.with_retry(|| self.pool.borrow(|c| f(c))),
        }
    }

    fn with_retry<F, R>(&self, mut op: F) -> Result<R>
    where
        F: FnMut() -> Result<R>,
    {
        let mut attempt = 0u32;
        loop {
            let start = Instant::now();
            match op() {
                Ok(value) => {
                    let elapsed = start.elapsed();
                    if elapsed >= self.config.slow_query_threshold() {
                        warn!(?elapsed, "slow query");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries() => {
                    let delay = self.config.delay_for_attempt(attempt);
                    attempt += 1;
                    debug!(attempt, ?delay, %err, "retrying after retryable failure");
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Heuristic datatype for a result column with no matching schema
    /// column: inferred from the raw driver value's own variant.
    fn infer_datatype(raw: &mysql::Value) -> DataType {
        use mysql::Value as MV;
        match raw {
            MV::Int(_) | MV::UInt(_) => DataType::Long,
            MV::Float(_) | MV::Double(_) => DataType::Double,
            MV::Date(..) => DataType::DateTime,
            MV::Time(..) => DataType::Time,
            MV::Bytes(_) | MV::NULL => DataType::String,
        }
    }

    fn resolve_column(&self, tables: &[&Table], result_table: &str, result_name: &str) -> Option<Column> {
        let qualified = tables.iter().find(|t| {
            !result_table.is_empty() && t.table_name().eq_ignore_ascii_case(result_table)
        });
        if let Some(table) = qualified {
            if let Ok(columns) = table.columns(self.column_init()) {
                if let Some(c) = columns.iter().find(|c| c.db_name().eq_ignore_ascii_case(result_name)) {
                    return Some(c.clone());
                }
            }
        }
        tables.iter().find_map(|t| {
            t.columns(self.column_init())
                .ok()?
                .iter()
                .find(|c| c.db_name().eq_ignore_ascii_case(result_name))
                .cloned()
        })
    }

    fn map_rows(&self, tables: &[&Table], raw_rows: Vec<mysql::Row>) -> Result<Vec<Row>> {
        raw_rows.into_iter().map(|r| self.map_row(tables, r)).collect()
    }

    fn map_row(&self, tables: &[&Table], raw: mysql::Row) -> Result<Row> {
        let columns_meta = raw.columns_ref().to_vec();
        let mut entries = Vec::with_capacity(columns_meta.len());
        for (index, meta) in columns_meta.iter().enumerate() {
            let result_table = meta.table_str().into_owned();
            let result_name = meta.name_str().into_owned();
            let raw_value = raw.as_ref(index).cloned().unwrap_or(mysql::Value::NULL);

            match self.resolve_column(tables, &result_table, &result_name) {
                Some(column) => {
                    let value = from_driver_value(raw_value, column.datatype())?;
                    entries.push((column, value));
                }
                None => {
                    let datatype = Self::infer_datatype(&raw_value);
                    let value = from_driver_value(raw_value, datatype)?;
                    let table_name = if result_table.is_empty() { "unknown".to_string() } else { result_table };
                    let synthetic = Column::new(
                        table_name, index, result_name.clone(), result_name, datatype, true, false, false,
                        ColumnDefault::None,
                    )?;
                    entries.push((synthetic, value));
                }
            }
        }
        Ok(Row::new(entries))
    }

    fn build_select_sql(
        &self,
        selection: &Selection,
        from: &Table,
        joins: &[Join],
        where_: &Condition,
        order: &OrderBy,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<(String, Vec<Value>)> {
        let (mut sql, mut values) = selection.render()?;
        sql.push_str(&format!(" FROM {}", from.table_name()));
        for join in joins {
            let (join_sql, join_values) = join.render()?;
            sql.push_str(&join_sql);
            values.extend(join_values);
        }
        let (where_sql, where_values) = where_.render()?;
        if !where_sql.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_sql));
            values.extend(where_values);
        }
        let (order_sql, _) = order.render()?;
        sql.push_str(&order_sql);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok((sql, values))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn select(
        &self,
        selection: &Selection,
        tables: &[&Table],
        from: &Table,
        joins: &[Join],
        where_: &Condition,
        order: &OrderBy,
        limit: Option<u64>,
        offset: Option<u64>,
        conn: Option<&mut Connection>,
    ) -> Result<Vec<Row>> {
        let (sql, values) = self.build_select_sql(selection, from, joins, where_, order, limit, offset)?;
        let driver_values: Vec<mysql::Value> = values.iter().map(to_driver_value).collect();
        let context = ErrorContext::new().with_sql(&sql).with_tables(vec![from.table_name().to_string()]);
        let raw_rows = self.run(conn, |c| {
            c.query_raw(&sql, driver_values.clone())
                .map_err(|e| e.with_context(context.clone()))
        })?;
        self.map_rows(tables, raw_rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn select_single(
        &self,
        selection: &Selection,
        tables: &[&Table],
        from: &Table,
        joins: &[Join],
        where_: &Condition,
        order: &OrderBy,
        conn: Option<&mut Connection>,
    ) -> Result<Option<Row>> {
        let mut rows = self.select(selection, tables, from, joins, where_, order, Some(1), None, conn)?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    pub fn select_single_value(
        &self,
        column: &Column,
        from: &Table,
        where_: &Condition,
        conn: Option<&mut Connection>,
    ) -> Result<Option<Value>> {
        let selection = Selection::Columns(vec![column.clone()]);
        let row = self.select_single(&selection, &[from], from, &[], where_, &OrderBy::default(), conn)?;
        Ok(row.and_then(|r| r.at(0).cloned()))
    }

    pub fn select_index(&self, from: &Table, primary_value: Value, conn: Option<&mut Connection>) -> Result<Option<Row>> {
        let primary = from.primary_column(self.column_init())?.clone();
        let where_ = Condition::comparison(primary, crate::clause::ComparisonOperator::Eq, primary_value);
        self.select_single(&Selection::All, &[from], from, &[], &where_, &OrderBy::default(), conn)
    }

    pub fn indices_where(&self, from: &Table, where_: &Condition, conn: Option<&mut Connection>) -> Result<Vec<Value>> {
        let primary = from.primary_column(self.column_init())?.clone();
        let selection = Selection::Columns(vec![primary]);
        let rows = self.select(&selection, &[from], from, &[], where_, &OrderBy::default(), None, None, conn)?;
        Ok(rows.iter().filter_map(|r| r.at(0).cloned()).collect())
    }

    pub fn row_exists(&self, from: &Table, where_: &Condition, conn: Option<&mut Connection>) -> Result<bool> {
        let rows = self.select(&Selection::None, &[from], from, &[], where_, &OrderBy::default(), Some(1), None, conn)?;
        Ok(!rows.is_empty())
    }

    pub fn insert(&self, assignment: &ValueAssignment, into: &Table, conn: Option<&mut Connection>) -> Result<Option<u64>> {
        let filtered = assignment.filter_to_table(into.table_name(), true);
        if !filtered.contains_required_columns(into, self.column_init())? {
            return Err(VaultError::clause(format!(
                "IncompleteInsert: missing required column(s) for table '{}'",
                into.table_name()
            )));
        }
        let (sql, values) = filtered.to_sql_insert(into.table_name())?;
        let driver_values: Vec<mysql::Value> = values.iter().map(to_driver_value).collect();
        let returns_generated_key = into.columns(self.column_init())?.iter().any(|c| c.auto_increment());
        let context = ErrorContext::new().with_sql(&sql).with_tables(vec![into.table_name().to_string()]);
        self.run(conn, |c| {
            c.execute_returning_generated_key(&sql, driver_values.clone(), returns_generated_key)
                .map_err(|e| e.with_context(context.clone()))
        })
    }

    pub fn update(
        &self,
        table: &Table,
        joins: &[Join],
        set: &ValueAssignment,
        where_: &Condition,
        conn: Option<&mut Connection>,
    ) -> Result<u64> {
        let filtered = set.filter_to_table(table.table_name(), true);
        if filtered.entries().is_empty() {
            return Ok(0);
        }
        let (set_sql, set_values) = filtered.to_sql_set()?;
        let mut sql = format!("UPDATE {}", table.table_name());
        let mut values = Vec::new();
        for join in joins {
            let (join_sql, join_values) = join.render()?;
            sql.push_str(&join_sql);
            values.extend(join_values);
        }
        sql.push_str(&set_sql);
        values.extend(set_values);
        let (where_sql, where_values) = where_.render()?;
        if !where_sql.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_sql));
            values.extend(where_values);
        }
        let driver_values: Vec<mysql::Value> = values.iter().map(to_driver_value).collect();
        let context = ErrorContext::new().with_sql(&sql).with_tables(vec![table.table_name().to_string()]);
        self.run(conn, |c| {
            c.execute_returning_generated_key(&sql, driver_values.clone(), false)
                .map_err(|e| e.with_context(context.clone()))?;
            Ok(c.affected_rows())
        })
    }

    pub fn delete(
        &self,
        from: &Table,
        joins: &[Join],
        where_: &Condition,
        delete_from_joined: bool,
        conn: Option<&mut Connection>,
    ) -> Result<u64> {
        let mut delete_target = from.table_name().to_string();
        if delete_from_joined {
            for join in joins {
                delete_target.push_str(&format!(", {}", join.joined_table()));
            }
        }
        let mut sql = format!("DELETE {} FROM {}", delete_target, from.table_name());
        let mut values = Vec::new();
        for join in joins {
            let (join_sql, join_values) = join.render()?;
            sql.push_str(&join_sql);
            values.extend(join_values);
        }
        let (where_sql, where_values) = where_.render()?;
        if !where_sql.is_empty() {
            sql.push_str(&format!(" WHERE {}", where_sql));
            values.extend(where_values);
        }
        let driver_values: Vec<mysql::Value> = values.iter().map(to_driver_value).collect();
        let context = ErrorContext::new().with_sql(&sql).with_tables(vec![from.table_name().to_string()]);
        self.run(conn, |c| {
            c.execute_returning_generated_key(&sql, driver_values.clone(), false)
                .map_err(|e| e.with_context(context.clone()))?;
            Ok(c.affected_rows())
        })
    }

    /// Checks existence by `lookup` (typically primary key or a unique
    /// combination), then updates or inserts — both over one borrowed
    /// connection.
    pub fn insert_or_update(&self, table: &Table, assignment: &ValueAssignment, lookup: &Condition) -> Result<Option<u64>> {
        self.with_retry(|| {
            self.pool.borrow(|conn| {
                let (lookup_sql, lookup_values) = lookup.render()?;
                let exists_sql = format!(
                    "SELECT NULL FROM {}{} LIMIT 1",
                    table.table_name(),
                    if lookup_sql.is_empty() { String::new() } else { format!(" WHERE {}", lookup_sql) }
                );
                let exists_driver_values: Vec<mysql::Value> = lookup_values.iter().map(to_driver_value).collect();
                let exists = !conn.query_raw(&exists_sql, exists_driver_values)?.is_empty();

                let filtered = assignment.filter_to_table(table.table_name(), true);
                if exists {
                    let (set_sql, set_values) = filtered.to_sql_set()?;
                    let sql = format!(
                        "UPDATE {}{}{}",
                        table.table_name(),
                        set_sql,
                        if lookup_sql.is_empty() { String::new() } else { format!(" WHERE {}", lookup_sql) }
                    );
                    let mut values = set_values;
                    values.extend(lookup_values);
                    let driver_values: Vec<mysql::Value> = values.iter().map(to_driver_value).collect();
                    conn.execute_returning_generated_key(&sql, driver_values, false)
                } else {
                    if !filtered.contains_required_columns(table, self.column_init())? {
                        return Err(VaultError::clause(format!(
                            "IncompleteInsert: missing required column(s) for table '{}'",
                            table.table_name()
                        )));
                    }
                    let (sql, values) = filtered.to_sql_insert(table.table_name())?;
                    let driver_values: Vec<mysql::Value> = values.iter().map(to_driver_value).collect();
                    let returns_generated_key = table.columns(self.column_init())?.iter().any(|c| c.auto_increment());
                    conn.execute_returning_generated_key(&sql, driver_values, returns_generated_key)
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{ComparisonOperator, Selection};
    use crate::pool::{DatabaseSettings, PoolConfig};
    use crate::schema::test_support::FakeColumnInitialiser;
    use std::time::Duration;

    fn executor() -> (QueryExecutor, Table, Table) {
        let (users, roles, column_init) = FakeColumnInitialiser::users_and_roles();
        let settings = Arc::new(DatabaseSettings::builder().build().unwrap());
        let pool = ConnectionPool::new(settings, "app", PoolConfig::default());
        let schema = SchemaCapabilities {
            column_init: Arc::new(column_init),
            ref_reader: Arc::new(crate::schema::test_support::FakeTableReferenceReader),
        };
        let executor = QueryExecutor::new(pool, schema, ExecutorConfig::default());
        (executor, users, roles)
    }

    #[test]
    fn test_build_select_sql_with_limit_and_offset() {
        let (executor, users, _roles) = executor();
        let id = users.find_column_by_db_name(executor.column_init(), "id").unwrap().clone();
        let where_ = Condition::comparison(id, ComparisonOperator::Gt, Value::Int(0));
        let (sql, values) = executor
            .build_select_sql(&Selection::All, &users, &[], &where_, &OrderBy::default(), Some(10), Some(5))
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE users.id > ? LIMIT 10 OFFSET 5");
        assert_eq!(values, vec![Value::Int(0)]);
    }

    #[test]
    fn test_resolve_column_matches_by_table_and_name() {
        let (executor, users, roles) = executor();
        let resolved = executor.resolve_column(&[&users, &roles], "users", "name");
        assert_eq!(resolved.unwrap().db_name(), "name");
    }

    #[test]
    fn test_resolve_column_falls_back_to_name_only_without_table_qualifier() {
        let (executor, users, roles) = executor();
        let resolved = executor.resolve_column(&[&users, &roles], "", "name");
        assert_eq!(resolved.unwrap().db_name(), "name");
    }

    #[test]
    fn test_resolve_column_none_when_unknown() {
        let (executor, users, roles) = executor();
        assert!(executor.resolve_column(&[&users, &roles], "users", "nonexistent").is_none());
    }

    #[test]
    fn test_insert_rejects_incomplete_assignment() {
        let (executor, users, _roles) = executor();
        let assignment = ValueAssignment::new();
        let err = executor.insert(&assignment, &users, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_executor_config_slow_threshold_is_honoured_in_with_retry() {
        let (executor, ..) = executor();
        let started = Instant::now();
        let result: Result<u32> = executor.with_retry(|| Ok(7));
        assert_eq!(result.unwrap(), 7);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_update_with_empty_filtered_set_performs_no_query() {
        let (executor, users, roles) = executor();
        let set = ValueAssignment::new();
        let where_ = Condition::is_null(roles.find_column_by_db_name(executor.column_init(), "name").unwrap().clone());
        let affected = executor.update(&users, &[], &set, &where_, None).unwrap();
        assert_eq!(affected, 0);
    }
}

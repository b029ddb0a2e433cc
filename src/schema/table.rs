//! Table (component C): on-demand schema reflection.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::{Result, VaultError};
use crate::identifier::validate_identifier;
use crate::mapping::NameMapping;

use super::column::Column;
use super::reference::TableReference;

/// Populates a table's column list by reflecting the live schema. Injectable
/// so tests can supply a fake without a running server.
pub trait ColumnInitialiser: Send + Sync {
    fn init_columns(&self, database_name: &str, table_name: &str, mapping: &NameMapping) -> Result<Vec<Column>>;
}

/// Populates the foreign-key references between two tables. Injectable for
/// the same reason as [`ColumnInitialiser`].
pub trait TableReferenceReader: Send + Sync {
    fn read_references(
        &self,
        database_name: &str,
        this_table: &str,
        this_columns: &[Column],
        other_table: &str,
        other_columns: &[Column],
    ) -> Result<Vec<TableReference>>;
}

/// A process-wide table handle whose column list and reference map are
/// populated lazily, at most once, via the injected capabilities above.
///
/// Concurrent readers either observe "not yet initialised" (and race to
/// perform the one initialisation, `OnceCell` serialises this for them) or
/// "fully initialised" — never a partial state.
pub struct Table {
    database_name: String,
    table_name: String,
    mapping: NameMapping,
    columns: OnceCell<Vec<Column>>,
    references: Mutex<HashMap<String, Vec<TableReference>>>,
}

impl Table {
    /// Validates `database_name` and `table_name` as identifiers before
    /// construction; a malformed name is rejected here rather than
    /// discovered later when it is concatenated into SQL unescaped.
    pub fn new(database_name: impl Into<String>, table_name: impl Into<String>, mapping: NameMapping) -> Result<Self> {
        let database_name = database_name.into();
        let table_name = table_name.into();
        validate_identifier(&database_name)?;
        validate_identifier(&table_name)?;
        Ok(Self {
            database_name,
            table_name,
            mapping,
            columns: OnceCell::new(),
            references: Mutex::new(HashMap::new()),
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn mapping(&self) -> &NameMapping {
        &self.mapping
    }

    /// `<table>.<column>`, since columns never hold this themselves.
    pub fn qualify(&self, column_db_name: &str) -> String {
        format!("{}.{}", self.table_name, column_db_name)
    }

    /// First call invokes `initialiser`; subsequent calls are free. Memoised
    /// via `OnceCell`, so initialisation runs at most once even under
    /// concurrent access.
    pub fn columns(&self, initialiser: &dyn ColumnInitialiser) -> Result<&[Column]> {
        self.columns
            .get_or_try_init(|| initialiser.init_columns(&self.database_name, &self.table_name, &self.mapping))
            .map(|v| v.as_slice())
    }

    pub fn primary_column(&self, initialiser: &dyn ColumnInitialiser) -> Result<&Column> {
        self.columns(initialiser)?
            .iter()
            .find(|c| c.primary())
            .ok_or_else(|| VaultError::schema(format!("NoPrimaryColumn: table '{}' has no primary column", self.table_name)))
    }

    pub fn find_column_by_db_name(&self, initialiser: &dyn ColumnInitialiser, name: &str) -> Result<&Column> {
        self.columns(initialiser)?
            .iter()
            .find(|c| c.db_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| VaultError::schema(format!("NoSuchColumn: '{}' on table '{}'", name, self.table_name)))
    }

    pub fn find_column_by_logical_name(&self, initialiser: &dyn ColumnInitialiser, name: &str) -> Result<&Column> {
        self.columns(initialiser)?
            .iter()
            .find(|c| c.logical_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| VaultError::schema(format!("NoSuchColumn: logical name '{}' on table '{}'", name, self.table_name)))
    }

    /// Memoised per (this, other) by the other table's name. Populated by
    /// the injected [`TableReferenceReader`].
    pub fn references_to(
        &self,
        column_init: &dyn ColumnInitialiser,
        reader: &dyn TableReferenceReader,
        other: &Table,
    ) -> Result<Vec<TableReference>> {
        {
            let cache = self.references.lock();
            if let Some(existing) = cache.get(other.table_name()) {
                return Ok(existing.clone());
            }
        }
        let this_columns = self.columns(column_init)?.to_vec();
        let other_columns = other.columns(column_init)?.to_vec();
        let refs = reader.read_references(
            &self.database_name,
            &self.table_name,
            &this_columns,
            other.table_name(),
            &other_columns,
        )?;
        let mut cache = self.references.lock();
        cache
            .entry(other.table_name().to_string())
            .or_insert_with(|| refs.clone());
        Ok(refs)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::schema::column::ColumnDefault;
    use crate::value::DataType;

    /// An in-memory fake used by tests across the crate so Table/NameMapping/
    /// Selection/Condition behaviour can be exercised without a live server.
    pub struct FakeColumnInitialiser {
        pub columns: HashMap<String, Vec<Column>>,
    }

    impl FakeColumnInitialiser {
        pub fn users_and_roles() -> (Table, Table, Self) {
            let mut mapping_users = NameMapping::new();
            mapping_users.add_rule(Box::new(crate::mapping::IdentityRule));
            let users = Table::new("app", "users", mapping_users).unwrap();

            let mut mapping_roles = NameMapping::new();
            mapping_roles.add_rule(Box::new(crate::mapping::IdentityRule));
            let roles = Table::new("app", "roles", mapping_roles).unwrap();

            let mut columns = HashMap::new();
            columns.insert(
                "users".to_string(),
                vec![
                    Column::new("users", 0, "id", "id", DataType::Int, false, true, true, ColumnDefault::None).unwrap(),
                    Column::new("users", 1, "name", "name", DataType::String, false, false, false, ColumnDefault::None)
                        .unwrap(),
                    Column::new("users", 2, "role_id", "role_id", DataType::Int, true, false, false, ColumnDefault::None)
                        .unwrap(),
                ],
            );
            columns.insert(
                "roles".to_string(),
                vec![
                    Column::new("roles", 0, "id", "id", DataType::Int, false, true, true, ColumnDefault::None).unwrap(),
                    Column::new("roles", 1, "name", "name", DataType::String, false, false, false, ColumnDefault::None)
                        .unwrap(),
                ],
            );
            (users, roles, Self { columns })
        }
    }

    impl ColumnInitialiser for FakeColumnInitialiser {
        fn init_columns(&self, _database_name: &str, table_name: &str, _mapping: &NameMapping) -> Result<Vec<Column>> {
            self.columns
                .get(table_name)
                .cloned()
                .ok_or_else(|| VaultError::table_init_failed(format!("no fake columns for '{}'", table_name)))
        }
    }

    pub struct FakeTableReferenceReader;

    impl TableReferenceReader for FakeTableReferenceReader {
        fn read_references(
            &self,
            _database_name: &str,
            _this_table: &str,
            this_columns: &[Column],
            other_table: &str,
            other_columns: &[Column],
        ) -> Result<Vec<TableReference>> {
            let mut refs = Vec::new();
            for c in this_columns {
                if c.db_name().eq_ignore_ascii_case(&format!("{}_id", other_table.trim_end_matches('s')))
                    || (other_table == "roles" && c.db_name() == "role_id")
                {
                    if let Some(pk) = other_columns.iter().find(|o| o.primary()) {
                        refs.push(TableReference::new(c.clone(), pk.clone()));
                    }
                }
            }
            Ok(refs)
        }
    }
}

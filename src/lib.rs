//! An embeddable relational-database access layer for MySQL/MariaDB: a
//! clause algebra for building SQL fragments, on-demand schema reflection,
//! an adaptive connection pool, and a query executor composed from both.
//!
//! # Architecture
//!
//! ```text
//! QueryExecutor (select/insert/update/delete)
//!        |
//!   Clause algebra (Condition, Selection, Join, OrderBy, ValueAssignment)
//!        |
//!   Schema reflection (Table, Column, TableReference)
//!        |
//!   ConnectionPool (adaptive capacity, idle reaper)
//!        |
//!      mysql (native driver)
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vault_db::{
//!     ConnectionPool, DatabaseSettings, PoolConfig, QueryExecutor, ExecutorConfig,
//!     SchemaCapabilities, ServerSchemaReader, Table, NameMapping, IdentityRule,
//! };
//!
//! # fn run() -> vault_db::Result<()> {
//! let settings = Arc::new(DatabaseSettings::builder()
//!     .connection_target("localhost:3306")
//!     .user("app")
//!     .password("secret")
//!     .build()?);
//! let pool = ConnectionPool::new(settings, "app_db", PoolConfig::from_halving(16, 5, Duration::from_secs(300)));
//! let reader = Arc::new(ServerSchemaReader::new(pool.clone()));
//! let schema = SchemaCapabilities { column_init: reader.clone(), ref_reader: reader.clone() };
//! let executor = QueryExecutor::new(pool, schema, ExecutorConfig::default());
//!
//! let mut mapping = NameMapping::new();
//! mapping.add_rule(Box::new(IdentityRule));
//! let users = Table::new("app_db", "users", mapping)?;
//! let id = users.find_column_by_db_name(&*reader, "id")?.clone();
//! let _ = executor.row_exists(&users, &vault_db::Condition::is_null(id), None)?;
//! # Ok(())
//! # }
//! ```

mod clause;
mod error;
mod executor;
mod identifier;
mod mapping;
mod pool;
mod row;
mod schema;
mod value;

pub use clause::{
    AssignmentSource, Clause, Combiner, ComparisonOperator, Condition, Direction, Join, JoinKind, Operand, OrderBy,
    OrderByEntry, Selection, ValueAssignment,
};
pub use error::{classify_driver_error, ErrorContext, Result, VaultError};
pub use executor::{ExecutorConfig, ExecutorConfigBuilder, QueryExecutor, SchemaCapabilities};
pub use identifier::validate_identifier;
pub use mapping::{IdentityRule, NameMapping, NameRule, PrefixStripRule};
pub use pool::{CapacitySchedule, Connection, ConnectionPool, DatabaseSettings, DatabaseSettingsBuilder, PoolConfig};
pub use row::Row;
pub use schema::{Column, ColumnDefault, ColumnInitialiser, ServerSchemaReader, Table, TableReference, TableReferenceReader};
pub use value::{from_driver_value, to_driver_value, ConversionReliability, DataType, Value};

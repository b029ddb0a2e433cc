//! End-to-end executor scenarios against a live MySQL/MariaDB server.
//!
//! Requires `VAULT_TEST_DATABASE_URL` (e.g. `mysql://root@localhost:3306/`)
//! and a database named `vault_db_test` with the two tables created by
//! `setup()`. Skipped unless run with `--ignored`.

use std::sync::Arc;
use std::time::Duration;

use vault_db::{
    ColumnInitialiser, ComparisonOperator, Condition, ConnectionPool, DatabaseSettings, ExecutorConfig, IdentityRule,
    Join, JoinKind, NameMapping, OrderBy, PoolConfig, QueryExecutor, Row, SchemaCapabilities, Selection,
    ServerSchemaReader, Table, TableReferenceReader, ValueAssignment, Value,
};

const DB_NAME: &str = "vault_db_test";

fn database_url() -> Option<String> {
    std::env::var("VAULT_TEST_DATABASE_URL").ok()
}

fn executor() -> (QueryExecutor, Arc<ServerSchemaReader>) {
    let url = database_url().expect("VAULT_TEST_DATABASE_URL must be set to run this test");
    let settings = Arc::new(DatabaseSettings::builder().connection_target(url).user("root").build().unwrap());
    let pool = ConnectionPool::new(settings, DB_NAME, PoolConfig::from_halving(16, 5, Duration::from_secs(300)));
    let reader = Arc::new(ServerSchemaReader::new(pool.clone()));
    let schema = SchemaCapabilities { column_init: reader.clone(), ref_reader: reader.clone() };
    (QueryExecutor::new(pool, schema, ExecutorConfig::default()), reader)
}

fn users_table() -> Table {
    let mut mapping = NameMapping::new();
    mapping.add_rule(Box::new(IdentityRule));
    Table::new(DB_NAME, "users", mapping).unwrap()
}

fn roles_table() -> Table {
    let mut mapping = NameMapping::new();
    mapping.add_rule(Box::new(IdentityRule));
    Table::new(DB_NAME, "roles", mapping).unwrap()
}

/// Resets the fixture schema. Run once per test to keep scenarios
/// independent of each other's leftover rows.
fn setup(executor: &QueryExecutor, reader: &ServerSchemaReader) {
    let pool_conn = &mut vault_db::Connection::new(
        Arc::new(DatabaseSettings::builder().connection_target(database_url().unwrap()).user("root").build().unwrap()),
        DB_NAME,
    );
    pool_conn.open().unwrap();
    pool_conn.execute("DROP TABLE IF EXISTS users").unwrap();
    pool_conn.execute("DROP TABLE IF EXISTS roles").unwrap();
    pool_conn
        .execute("CREATE TABLE roles (id INT PRIMARY KEY AUTO_INCREMENT, name VARCHAR(64) NOT NULL)")
        .unwrap();
    pool_conn
        .execute(
            "CREATE TABLE users (id INT PRIMARY KEY AUTO_INCREMENT, name VARCHAR(64) NOT NULL, role_id INT NULL, \
             FOREIGN KEY (role_id) REFERENCES roles(id))",
        )
        .unwrap();
    pool_conn
        .execute("INSERT INTO roles (id, name) VALUES (1, 'admin'), (2, 'guest')")
        .unwrap();
    pool_conn
        .execute("INSERT INTO users (name, role_id) VALUES ('alice', 1), ('carol', 2)")
        .unwrap();
    let _ = reader.init_columns(DB_NAME, "users", &NameMapping::new());
    let _ = executor;
}

#[test]
#[ignore]
fn s1_single_table_eq_select() {
    if database_url().is_none() {
        return;
    }
    let (executor, reader) = executor();
    setup(&executor, &reader);
    let users = users_table();
    let name = users.find_column_by_db_name(&*reader, "name").unwrap().clone();
    let where_ = Condition::comparison(name, ComparisonOperator::Eq, Value::String("alice".to_string()));
    let rows: Vec<Row> = executor
        .select(&Selection::All, &[&users], &users, &[], &where_, &OrderBy::default(), None, None, None)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].by_db_name("users", "name"), Some(&Value::String("alice".to_string())));
}

#[test]
#[ignore]
fn s2_join_by_reference() {
    if database_url().is_none() {
        return;
    }
    let (executor, reader) = executor();
    setup(&executor, &reader);
    let users = users_table();
    let roles = roles_table();
    let join = Join::from_tables(JoinKind::Inner, &users, &roles, &*reader, &*reader).unwrap();
    let role_name = roles.find_column_by_db_name(&*reader, "name").unwrap().clone();
    let where_ = Condition::comparison(role_name, ComparisonOperator::Eq, Value::String("admin".to_string()));
    let rows = executor
        .select(
            &Selection::All,
            &[&users, &roles],
            &users,
            std::slice::from_ref(&join),
            &where_,
            &OrderBy::default(),
            None,
            None,
            None,
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].by_db_name("users", "name"), Some(&Value::String("alice".to_string())));
}

#[test]
#[ignore]
fn s3_in_with_three_values() {
    if database_url().is_none() {
        return;
    }
    let (executor, reader) = executor();
    setup(&executor, &reader);
    let users = users_table();
    let name = users.find_column_by_db_name(&*reader, "name").unwrap().clone();
    let where_ = Condition::in_list(
        name,
        vec![
            Value::String("alice".to_string()).into(),
            Value::String("bob".to_string()).into(),
            Value::String("carol".to_string()).into(),
        ],
    );
    let rows = executor
        .select(&Selection::All, &[&users], &users, &[], &where_, &OrderBy::default(), None, None, None)
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
#[ignore]
fn s4_insert_with_auto_increment_key() {
    if database_url().is_none() {
        return;
    }
    let (executor, reader) = executor();
    setup(&executor, &reader);
    let users = users_table();
    let name = users.find_column_by_db_name(&*reader, "name").unwrap().clone();
    let role_id = users.find_column_by_db_name(&*reader, "role_id").unwrap().clone();
    let assignment = ValueAssignment::new()
        .set(name, Value::String("bob".to_string()))
        .set(role_id, Value::Int(2));
    let new_id = executor.insert(&assignment, &users, None).unwrap();
    assert!(new_id.is_some());
}

#[test]
#[ignore]
fn s5_delete_with_join_deletes_from_both_tables() {
    if database_url().is_none() {
        return;
    }
    let (executor, reader) = executor();
    setup(&executor, &reader);
    let users = users_table();
    let roles = roles_table();
    let join = Join::from_tables(JoinKind::Inner, &users, &roles, &*reader, &*reader).unwrap();
    let role_name = roles.find_column_by_db_name(&*reader, "name").unwrap().clone();
    let where_ = Condition::comparison(role_name, ComparisonOperator::Eq, Value::String("guest".to_string()));
    let affected = executor
        .delete(&users, std::slice::from_ref(&join), &where_, true, None)
        .unwrap();
    assert!(affected >= 1);
}

#[test]
#[ignore]
fn s6_pool_capacity_schedule() {
    if database_url().is_none() {
        return;
    }
    let url = database_url().unwrap();
    let settings = Arc::new(DatabaseSettings::builder().connection_target(url).user("root").build().unwrap());
    let pool = ConnectionPool::new(settings, DB_NAME, PoolConfig::from_halving(4, 3, Duration::from_secs(1)));
    pool.borrow(|c| c.execute("SELECT 1")).unwrap();
    assert_eq!(pool.open_count(), 1);
    pool.borrow(|c| c.execute("SELECT 1")).unwrap();
    assert!(pool.open_count() <= 2);
}

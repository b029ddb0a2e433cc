//! Connection (component E): owns at most one native MySQL handle.

use mysql::prelude::Queryable;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{classify_driver_error, ErrorContext, Result, VaultError};

use super::settings::DatabaseSettings;

/// A single DB connection. `open()`/`close()` are idempotent; `execute` and
/// `query_raw` run statements over whatever handle is currently open.
pub struct Connection {
    settings: Arc<DatabaseSettings>,
    database_name: String,
    native: Option<mysql::Conn>,
}

impl Connection {
    pub fn new(settings: Arc<DatabaseSettings>, database_name: impl Into<String>) -> Self {
        Self {
            settings,
            database_name: database_name.into(),
            native: None,
        }
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn is_open(&self) -> bool {
        self.native.is_some()
    }

    fn build_opts(&self) -> Result<mysql::Opts> {
        let (host, port) = self.settings.host_and_port()?;
        let mut builder = mysql::OptsBuilder::new()
            .ip_or_hostname(Some(host))
            .tcp_port(port)
            .user(Some(self.settings.user().to_string()))
            .db_name(Some(self.database_name.clone()));
        if let Some(password) = self.settings.password() {
            builder = builder.pass(Some(password.to_string()));
        }
        Ok(mysql::Opts::from(builder))
    }

    /// Creates or replaces the native handle.
    pub fn open(&mut self) -> Result<()> {
        let opts = self.build_opts()?;
        let conn = mysql::Conn::new(opts).map_err(|e| {
            classify_driver_error(&e, ErrorContext::new().with_sql(format!("CONNECT {}", self.database_name)))
        })?;
        debug!(database = %self.database_name, "connection opened");
        self.native = Some(conn);
        Ok(())
    }

    /// Idempotent: does nothing if already closed.
    pub fn close(&mut self) {
        if self.native.take().is_some() {
            debug!(database = %self.database_name, "connection closed");
        }
    }

    /// Before reuse: is the handle still usable? If not, reopen transparently.
    pub fn ensure_open(&mut self) -> Result<()> {
        let healthy = match &mut self.native {
            Some(conn) => conn.query_drop("SELECT 1").is_ok(),
            None => false,
        };
        if !healthy {
            if self.native.is_some() {
                warn!(database = %self.database_name, "connection failed validity probe, reopening");
            }
            self.native = None;
            self.open()?;
        }
        Ok(())
    }

    fn native_mut(&mut self) -> Result<&mut mysql::Conn> {
        self.native
            .as_mut()
            .ok_or_else(|| VaultError::database_unavailable("connection is not open"))
    }

    /// Hot when open (`USE <name>`); a cheap field update otherwise.
    pub fn switch_database(&mut self, name: &str) -> Result<()> {
        if let Some(conn) = self.native.as_mut() {
            conn.query_drop(format!("USE {}", name))
                .map_err(|e| classify_driver_error(&e, ErrorContext::new().with_sql(format!("USE {}", name))))?;
        }
        self.database_name = name.to_string();
        Ok(())
    }

    pub fn execute(&mut self, sql: &str) -> Result<()> {
        let context = ErrorContext::new().with_sql(sql);
        self.native_mut()?
            .query_drop(sql)
            .map_err(|e| classify_driver_error(&e, context))
    }

    pub fn query_raw(&mut self, sql: &str, params: Vec<mysql::Value>) -> Result<Vec<mysql::Row>> {
        let context = ErrorContext::new().with_sql(sql);
        self.native_mut()?
            .exec(sql, mysql::Params::Positional(params))
            .map_err(|e| classify_driver_error(&e, context))
    }

    /// Executes a statement with no result rows, optionally returning the
    /// generated auto-increment key.
    pub fn execute_returning_generated_key(
        &mut self,
        sql: &str,
        params: Vec<mysql::Value>,
        return_generated_keys: bool,
    ) -> Result<Option<u64>> {
        let context = ErrorContext::new().with_sql(sql);
        let conn = self.native_mut()?;
        conn.exec_drop(sql, mysql::Params::Positional(params))
            .map_err(|e| classify_driver_error(&e, context))?;
        if return_generated_keys {
            let id = conn.last_insert_id();
            Ok(if id == 0 { None } else { Some(id) })
        } else {
            Ok(None)
        }
    }

    pub fn affected_rows(&self) -> u64 {
        self.native.as_ref().map(|c| c.affected_rows()).unwrap_or(0)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_connection_is_closed() {
        let settings = Arc::new(DatabaseSettings::builder().build().unwrap());
        let conn = Connection::new(settings, "app");
        assert!(!conn.is_open());
    }

    #[test]
    fn test_switch_database_updates_name_even_when_closed() {
        let settings = Arc::new(DatabaseSettings::builder().build().unwrap());
        let mut conn = Connection::new(settings, "app");
        conn.switch_database("other").unwrap();
        assert_eq!(conn.database_name(), "other");
    }
}

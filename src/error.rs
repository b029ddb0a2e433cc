//! Error taxonomy and debug rendering.

use thiserror::Error;

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Forensic context attached to errors raised at the executor boundary.
///
/// Rendering is a pure function over this struct: no I/O, never panics.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub sql: Option<String>,
    pub tables: Vec<String>,
    pub selection: Option<String>,
    pub where_clause: Option<String>,
    pub assignment: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    pub fn with_where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    pub fn with_assignment(mut self, assignment: impl Into<String>) -> Self {
        self.assignment = Some(assignment.into());
        self
    }

    /// Renders a multi-line debug string mirroring the attempted statement.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "sql: {}\n",
            self.sql.as_deref().unwrap_or("PARSING FAILED")
        ));
        out.push_str(&format!("tables: {}\n", self.tables.join(", ")));
        if let Some(s) = &self.selection {
            out.push_str(&format!("selection: {}\n", s));
        }
        if let Some(w) = &self.where_clause {
            out.push_str(&format!("where: {}\n", w));
        }
        if let Some(a) = &self.assignment {
            out.push_str(&format!("assignment: {}\n", a));
        }
        out
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Unified error taxonomy for this crate.
#[derive(Error, Debug, Clone)]
pub enum VaultError {
    /// A clause could not be serialised (null column, bad operator arity, etc).
    #[error("ClauseParseError: '{message}'\n{context}")]
    ClauseParseError { message: String, context: ErrorContext },

    /// `NoLogicalForColumn` / `NoColumnForLogical`.
    #[error("NameMappingError: '{message}'")]
    NameMappingError { message: String },

    /// `NoSuchColumn`, `NoPrimaryColumn`, `NoSuchReferenceBetween`.
    #[error("SchemaError: '{message}'\n{context}")]
    SchemaError { message: String, context: ErrorContext },

    /// A value could not be cast to any SQL-compatible datatype, or the
    /// driver rejected the bound value.
    #[error("ValueBindFailed: '{message}' (placeholder #{placeholder_index})\n{context}")]
    ValueBindFailed {
        placeholder_index: usize,
        message: String,
        context: ErrorContext,
    },

    /// Connection open/validate failed.
    #[error("DatabaseUnavailable: '{message}'\n{context}")]
    DatabaseUnavailable { message: String, context: ErrorContext },

    /// The driver returned a SQL error during execution.
    #[error("QueryFailed: '{message}'\n{context}")]
    QueryFailed { message: String, context: ErrorContext },

    /// Schema reflection failed; the table remains un-initialised.
    #[error("TableInitialisationFailed: '{message}'\n{context}")]
    TableInitialisationFailed { message: String, context: ErrorContext },
}

impl VaultError {
    pub fn clause(message: impl Into<String>) -> Self {
        VaultError::ClauseParseError {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn clause_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        VaultError::ClauseParseError {
            message: message.into(),
            context,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        VaultError::SchemaError {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn name_mapping(message: impl Into<String>) -> Self {
        VaultError::NameMappingError { message: message.into() }
    }

    pub fn database_unavailable(message: impl Into<String>) -> Self {
        VaultError::DatabaseUnavailable {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn query_failed(message: impl Into<String>, context: ErrorContext) -> Self {
        VaultError::QueryFailed {
            message: message.into(),
            context,
        }
    }

    pub fn table_init_failed(message: impl Into<String>) -> Self {
        VaultError::TableInitialisationFailed {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Attaches a context to any variant that carries one, replacing a default/empty one.
    pub fn with_context(self, context: ErrorContext) -> Self {
        match self {
            VaultError::ClauseParseError { message, .. } => {
                VaultError::ClauseParseError { message, context }
            }
            VaultError::SchemaError { message, .. } => VaultError::SchemaError { message, context },
            VaultError::ValueBindFailed { placeholder_index, message, .. } => {
                VaultError::ValueBindFailed { placeholder_index, message, context }
            }
            VaultError::DatabaseUnavailable { message, .. } => {
                VaultError::DatabaseUnavailable { message, context }
            }
            VaultError::QueryFailed { message, .. } => VaultError::QueryFailed { message, context },
            VaultError::TableInitialisationFailed { message, .. } => {
                VaultError::TableInitialisationFailed { message, context }
            }
            other => other,
        }
    }

    /// True for failures a caller may reasonably retry (connection-level,
    /// lock-wait/deadlock). Classified from the wrapped driver error message
    /// since the `mysql` crate's own error enum is not `Clone`.
    pub fn is_retryable(&self) -> bool {
        match self {
            VaultError::DatabaseUnavailable { .. } => true,
            VaultError::QueryFailed { message, .. } => {
                let m = message.to_lowercase();
                m.contains("deadlock") || m.contains("lock wait timeout") || m.contains("try restarting transaction")
            }
            _ => false,
        }
    }

    /// True for duplicate-key and foreign-key constraint violations.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            VaultError::QueryFailed { message, .. } => {
                let m = message.to_lowercase();
                m.contains("duplicate entry") || m.contains("foreign key constraint")
            }
            _ => false,
        }
    }
}

/// Classifies a raw `mysql` driver error into this crate's taxonomy, attaching
/// the given context. Distinguishes connection-level failures (retryable,
/// pool discards the entry) from in-session query failures by MySQL error
/// number where the driver exposes one.
pub fn classify_driver_error(err: &mysql::Error, context: ErrorContext) -> VaultError {
    use mysql::Error as E;
    match err {
        E::IoError(_) | E::TlsError(_) | E::DriverError(_) => {
            VaultError::DatabaseUnavailable { message: err.to_string(), context }
        }
        E::MySqlError(db_err) => {
            // Connection-loss server error numbers: CR_SERVER_GONE_ERROR(2006),
            // CR_SERVER_LOST(2013), ER_CON_COUNT_ERROR(1040).
            if matches!(db_err.code, 2006 | 2013 | 1040) {
                VaultError::DatabaseUnavailable { message: err.to_string(), context }
            } else {
                VaultError::QueryFailed { message: err.to_string(), context }
            }
        }
        _ => VaultError::QueryFailed { message: err.to_string(), context },
    }
}

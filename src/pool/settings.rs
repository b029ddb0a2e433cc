//! `DatabaseSettings`: immutable, injected-once connection configuration.
//! Deliberately not a process-wide mutable singleton.

use crate::error::{Result, VaultError};

/// DSN prefix, credentials and optional driver class. Built once via
/// [`DatabaseSettingsBuilder`] and passed by reference into the
/// connection-pool constructor; nothing here is ever mutated afterwards.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    connection_target: String,
    user: String,
    password: Option<String>,
    driver_class: Option<String>,
}

impl DatabaseSettings {
    pub fn builder() -> DatabaseSettingsBuilder {
        DatabaseSettingsBuilder::default()
    }

    pub fn connection_target(&self) -> &str {
        &self.connection_target
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn driver_class(&self) -> Option<&str> {
        self.driver_class.as_deref()
    }

    /// Splits `connection_target` into `(host, port)`, accepting both the
    /// legacy `jdbc:mysql://host:port/` form and a bare `mysql://host:port/`.
    pub fn host_and_port(&self) -> Result<(String, u16)> {
        let without_scheme = self
            .connection_target
            .trim_start_matches("jdbc:mysql://")
            .trim_start_matches("mysql://");
        let host_port = without_scheme.trim_end_matches('/');
        let (host, port) = match host_port.split_once(':') {
            Some((h, p)) => (
                h.to_string(),
                p.parse::<u16>()
                    .map_err(|_| VaultError::database_unavailable(format!("invalid port in DSN '{}'", self.connection_target)))?,
            ),
            None => (host_port.to_string(), 3306),
        };
        if host.is_empty() {
            return Err(VaultError::database_unavailable(format!(
                "DSN '{}' has no host",
                self.connection_target
            )));
        }
        Ok((host, port))
    }
}

/// Fluent, validating builder for [`DatabaseSettings`].
#[derive(Default)]
pub struct DatabaseSettingsBuilder {
    connection_target: Option<String>,
    user: Option<String>,
    password: Option<String>,
    driver_class: Option<String>,
}

impl DatabaseSettingsBuilder {
    pub fn connection_target(mut self, target: impl Into<String>) -> Self {
        self.connection_target = Some(target.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn driver_class(mut self, driver_class: impl Into<String>) -> Self {
        self.driver_class = Some(driver_class.into());
        self
    }

    pub fn build(self) -> Result<DatabaseSettings> {
        let connection_target = self
            .connection_target
            .unwrap_or_else(|| "jdbc:mysql://localhost:3306/".to_string());
        if connection_target.trim().is_empty() {
            return Err(VaultError::database_unavailable("connection_target cannot be empty"));
        }
        Ok(DatabaseSettings {
            connection_target,
            user: self.user.unwrap_or_else(|| "root".to_string()),
            password: self.password,
            driver_class: self.driver_class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DatabaseSettings::builder().build().unwrap();
        assert_eq!(settings.connection_target(), "jdbc:mysql://localhost:3306/");
        assert_eq!(settings.user(), "root");
        assert_eq!(settings.password(), None);
    }

    #[test]
    fn test_rejects_empty_target() {
        assert!(DatabaseSettings::builder().connection_target("").build().is_err());
    }

    #[test]
    fn test_host_and_port_parses_jdbc_prefix() {
        let settings = DatabaseSettings::builder()
            .connection_target("jdbc:mysql://db.internal:3307/")
            .build()
            .unwrap();
        assert_eq!(settings.host_and_port().unwrap(), ("db.internal".to_string(), 3307));
    }

    #[test]
    fn test_host_and_port_defaults_port() {
        let settings = DatabaseSettings::builder()
            .connection_target("mysql://localhost/")
            .build()
            .unwrap();
        assert_eq!(settings.host_and_port().unwrap(), ("localhost".to_string(), 3306));
    }
}

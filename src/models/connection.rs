//! Connection-related data models.
//!
//! This module defines the resolved database connection parameters and the
//! supported backend types.

use crate::error::{AppError, AppResult};
use serde::Serialize;
use url::Url;

/// Scheme used for every connection string built from resolved parameters.
pub const CONNECTION_SCHEME: &str = "postgres";

/// Port used when none is configured.
pub const DEFAULT_DB_PORT: &str = "5432";

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Local runs and tests only
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Positional bind placeholder for the n-th (1-based) parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${}", n),
            Self::SQLite => format!("?{}", n),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Resolved database connection parameters.
///
/// `host` keeps the `host:port` form produced by resolution; the connection
/// string is assembled from it verbatim.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub username: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// Host name without the `:port` suffix.
    pub fn host_name(&self) -> &str {
        match self.host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => &self.host,
        }
    }

    /// Check that every field needed for a meaningful connection attempt is set.
    pub fn validate(&self) -> AppResult<()> {
        let missing: Vec<&str> = [
            ("host", self.host_name()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("database", self.database.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::configuration(format!(
                "Missing database connection settings: {}",
                missing.join(", ")
            )))
        }
    }

    /// Build the connection string `postgres://<user>:<password>@<host>/<database>`.
    ///
    /// Credentials are percent-encoded, so plain values come out unchanged.
    pub fn connection_string(&self) -> AppResult<String> {
        self.validate()?;

        let base = format!("{}://{}/{}", CONNECTION_SCHEME, self.host, self.database);
        let mut url = Url::parse(&base).map_err(|e| {
            AppError::configuration(format!("Invalid database host '{}': {}", self.host, e))
        })?;
        url.set_username(&self.username)
            .and_then(|_| url.set_password(Some(&self.password)))
            .map_err(|_| {
                AppError::configuration(format!(
                    "Database host '{}' cannot carry credentials",
                    self.host
                ))
            })?;

        Ok(url.to_string())
    }

    /// Get a display-safe version of the connection string (password masked).
    pub fn masked_connection_string(&self) -> String {
        format!(
            "{}://{}:****@{}/{}",
            CONNECTION_SCHEME, self.username, self.host, self.database
        )
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

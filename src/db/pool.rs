//! Connection pool management.
//!
//! This module provides connection pooling using database-specific pools
//! (PgPool, SqlitePool) to ensure full type support.

use crate::error::{AppError, AppResult};
use crate::models::DatabaseType;
use sqlx::{
    PgPool, SqlitePool, postgres::PgPoolOptions, sqlite::SqliteConnectOptions,
    sqlite::SqlitePoolOptions,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection pool settings.
#[derive(Debug, Clone, Default)]
pub struct PoolSettings {
    /// Default: 10 for PostgreSQL, 1 for SQLite
    pub max_connections: Option<u32>,
    /// Default: 1
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Time allowed to establish a connection, in seconds (default: 10)
    pub connect_timeout_secs: Option<u64>,
}

impl PoolSettings {
    /// Get max_connections with default value based on database type.
    pub fn max_connections_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_connections.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    pub fn connect_timeout_or_default(&self) -> u64 {
        self.connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    /// Validate pool settings and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
        }
        if let Some(min) = self.min_connections {
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Database-specific connection pool.
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl DbPool {
    /// Open a pool for the given connection string.
    ///
    /// The pool is established eagerly so that bad credentials or an unreachable
    /// server surface here as a typed error.
    pub async fn connect(connection_string: &str, settings: &PoolSettings) -> AppResult<Self> {
        settings.validate().map_err(AppError::configuration)?;

        let db_type = DatabaseType::from_connection_string(connection_string).ok_or_else(|| {
            AppError::configuration(
                "Unsupported connection string scheme (expected postgres:// or sqlite:)",
            )
        })?;
        let is_sqlite = db_type == DatabaseType::SQLite;
        let acquire_timeout = Duration::from_secs(settings.connect_timeout_or_default());
        let idle_timeout = Some(Duration::from_secs(settings.idle_timeout_or_default()));
        let max_connections = settings.max_connections_or_default(is_sqlite);
        let min_connections = settings.min_connections_or_default().min(max_connections);

        debug!(
            db_type = %db_type,
            max_connections,
            min_connections,
            "Creating connection pool"
        );

        let pool = match db_type {
            DatabaseType::PostgreSQL => {
                let pool = PgPoolOptions::new()
                    .min_connections(min_connections)
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(idle_timeout)
                    .connect(connection_string)
                    .await
                    .map_err(|e| {
                        AppError::connection(
                            format!("Failed to connect: {}", e),
                            connection_suggestion(db_type, &e),
                        )
                    })?;
                DbPool::Postgres(pool)
            }
            DatabaseType::SQLite => {
                let options = SqliteConnectOptions::from_str(connection_string)
                    .map_err(|e| {
                        AppError::connection(
                            format!("Invalid SQLite connection string: {}", e),
                            "Check the connection URL format: sqlite:path/to/db.sqlite",
                        )
                    })?
                    .read_only(true);

                let pool = SqlitePoolOptions::new()
                    .min_connections(min_connections)
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(idle_timeout)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        AppError::connection(
                            format!("Failed to connect: {}", e),
                            connection_suggestion(db_type, &e),
                        )
                    })?;
                DbPool::SQLite(pool)
            }
        };

        info!(db_type = %db_type, "Connection pool established");
        Ok(pool)
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::Postgres(pool) => pool.close().await,
            DbPool::SQLite(pool) => pool.close().await,
        }
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbPool::Postgres(_) => DatabaseType::PostgreSQL,
            DbPool::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Get the server version from the connected database.
    pub async fn server_version(&self) -> Option<String> {
        let result = match self {
            DbPool::Postgres(pool) => {
                sqlx::query_scalar::<_, String>("SELECT version()")
                    .fetch_one(pool)
                    .await
            }
            DbPool::SQLite(pool) => {
                sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
                    .fetch_one(pool)
                    .await
            }
        };

        match result {
            Ok(version) => {
                debug!(version = %version, "Got server version");
                Some(version)
            }
            Err(e) => {
                warn!(error = %e, "Failed to get server version");
                None
            }
        }
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify DB_USERNAME and DB_PASSWORD".to_string();
    }

    if error_str.contains("does not exist") {
        return "Check that DB_DATABASE names an existing database".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::PostgreSQL => {
            "Verify DB_HOST, DB_PORT and the ENVIRONMENT setting".to_string()
        }
        DatabaseType::SQLite => {
            "Verify the file path exists and is accessible: sqlite:path/to/db.sqlite".to_string()
        }
    }
}

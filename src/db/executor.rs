//! Query execution engine.
//!
//! This module runs read queries with:
//! - Positional bind parameters
//! - Query timeouts
//! - Row decoding into JSON maps
//!
//! # Architecture
//!
//! The executor dispatches to database-specific submodules (`postgres`,
//! `sqlite`) that share one interface adapted to each type system.

use crate::db::pool::{DbPool, PoolSettings};
use crate::db::statement;
use crate::db::types::RowToJson;
use crate::error::{AppError, AppResult};
use crate::models::{
    ConnectionConfig, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, QueryParam, QueryResult,
};
use futures_util::TryStreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_QUERY_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            query_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Run a read query.
    ///
    /// `columns` names the output columns in order; when empty they are taken
    /// from the first returned row. `limit` is only used to flag whether the
    /// bound in the SQL text was hit.
    pub async fn fetch(
        &self,
        pool: &DbPool,
        sql: &str,
        params: &[QueryParam],
        columns: &[String],
        limit: Option<u32>,
    ) -> AppResult<QueryResult> {
        let start = Instant::now();

        debug!(
            sql = %sql,
            params = params.len(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let (names, rows) = match pool {
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, params, self.query_timeout).await?;
                decode_rows(&rows)
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, params, self.query_timeout).await?;
                decode_rows(&rows)
            }
        };

        let columns = if columns.is_empty() {
            names
        } else {
            columns.to_vec()
        };
        let execution_time_ms = start.elapsed().as_millis() as u64;

        info!(
            rows = rows.len(),
            elapsed_ms = execution_time_ms,
            limit = ?limit,
            "Query completed"
        );

        Ok(QueryResult::new(columns, rows, limit, execution_time_ms))
    }

    /// Read the named columns of `<schema>.<table>` over an open pool.
    ///
    /// `Some(n)` appends `limit n`; `None` reads every row.
    pub async fn read_columns(
        &self,
        pool: &DbPool,
        schema: &str,
        table: &str,
        columns: &[String],
        limit: Option<u32>,
    ) -> AppResult<QueryResult> {
        let stmt = statement::select(schema, table, columns, &[], limit, pool.db_type())?;
        self.fetch(pool, &stmt.sql, &stmt.params, columns, limit).await
    }

    /// Connect with `config`, read the first 1000 rows of the named columns, and
    /// close the pool again.
    pub async fn read_columns_with_config(
        &self,
        config: &ConnectionConfig,
        settings: &PoolSettings,
        schema: &str,
        table: &str,
        columns: &[String],
    ) -> AppResult<QueryResult> {
        let connection_string = config.connection_string()?;
        let pool = DbPool::connect(&connection_string, settings).await?;
        info!(target_db = %config.masked_connection_string(), "Connection established");

        let result = self
            .read_columns(&pool, schema, table, columns, Some(DEFAULT_ROW_LIMIT))
            .await;
        pool.close().await;
        result
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

type DecodedRows = (Vec<String>, Vec<serde_json::Map<String, serde_json::Value>>);

fn decode_rows<R: RowToJson>(rows: &[R]) -> DecodedRows {
    let names = rows.first().map(|r| r.column_names()).unwrap_or_default();
    let json_rows = rows.iter().map(|r| r.to_json_map()).collect();
    (names, json_rows)
}

fn timeout_error(operation: &str, timeout: Duration) -> AppError {
    AppError::timeout(operation, timeout.as_secs())
}

/// Map a query failure, reporting pool exhaustion against the pool's own acquire timeout.
fn query_error(err: sqlx::Error, acquire_timeout: Duration) -> AppError {
    match err {
        sqlx::Error::PoolTimedOut => timeout_error("connection pool acquire", acquire_timeout),
        other => AppError::from(other),
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::PgPool;
    use sqlx::postgres::{PgArguments, PgRow};

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> AppResult<Vec<PgRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        let rows_future = query.fetch(pool).try_collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(result) => {
                result.map_err(|e| query_error(e, pool.options().get_acquire_timeout()))
            }
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
        match param {
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::Date(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;
    use sqlx::sqlite::{SqliteArguments, SqliteRow};

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        params: &[QueryParam],
        query_timeout: Duration,
    ) -> AppResult<Vec<SqliteRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        let rows_future = query.fetch(pool).try_collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(result) => {
                result.map_err(|e| query_error(e, pool.options().get_acquire_timeout()))
            }
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
        match param {
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::Date(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
        }
    }
}

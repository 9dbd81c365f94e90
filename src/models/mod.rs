//! Data models for the perovskite web service.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod dataset;
pub mod query;

// Re-export commonly used types
pub use connection::{CONNECTION_SCHEME, ConnectionConfig, DEFAULT_DB_PORT, DatabaseType};
pub use dataset::{DEFAULT_DATASET, DatasetDescriptor, DatasetRegistry};
pub use query::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, QueryParam, QueryResult, RecordFilter,
    SelectRequest,
};

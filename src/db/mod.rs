//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - SQL text construction for dataset reads
//! - Query execution with timeouts
//! - Type mappings from database columns to JSON
//! - Dataset-level reads used by the website

pub mod executor;
pub mod pool;
pub mod records;
pub mod statement;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{DbPool, PoolSettings};
pub use records::{RecordStore, normalize_doi, parse_id_list};

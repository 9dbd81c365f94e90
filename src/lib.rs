//! Perovskite database website library.
//!
//! This library provides the read-only data access layer of the perovskite
//! solar cell database and the HTTP surface that serves pages, protocol
//! documents and CSV exports on top of it.

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod models;
pub mod server;
pub mod templates;
pub mod web;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use web::{AppState, build_router};

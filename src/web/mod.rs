//! HTTP surface of the website.
//!
//! Informational pages, protocol document downloads, the health check, the
//! JSON data API and CSV exports are all assembled into one axum `Router`.

pub mod api;
pub mod downloads;
pub mod files;
pub mod filters;
pub mod health;
pub mod pages;

use crate::db::RecordStore;
use crate::error::{AppError, AppResult};
use crate::models::DatasetRegistry;
use crate::templates::Templates;
use axum::Router;
use axum::routing::get;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct AppState {
    /// `None` when no database could be reached at startup
    pub store: Option<RecordStore>,
    pub templates: Templates,
    pub datasets: DatasetRegistry,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(
        store: Option<RecordStore>,
        templates: Templates,
        datasets: DatasetRegistry,
        static_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            templates,
            datasets,
            static_dir: static_dir.into(),
        }
    }

    /// The record store, or `DatabaseUnavailable` when the service runs without one.
    pub fn store(&self) -> AppResult<&RecordStore> {
        self.store.as_ref().ok_or_else(|| {
            AppError::database_unavailable("no database connection was established at startup")
        })
    }

    pub fn files_dir(&self) -> PathBuf {
        self.static_dir.join("files")
    }
}

/// Build the complete application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .merge(pages::router())
        .merge(files::router())
        .route("/healthz", get(health::health))
        .nest("/api", api::router())
        .nest("/download", downloads::router())
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

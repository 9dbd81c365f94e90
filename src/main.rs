//! Perovskite database website - main entry point.
//!
//! Serves the informational pages, protocol downloads and CSV exports of the
//! perovskite solar cell database.

use clap::Parser;
use perovskite_web::config::{Config, ProcessEnv};
use perovskite_web::db::{DbPool, QueryExecutor, RecordStore};
use perovskite_web::models::DatasetRegistry;
use perovskite_web::server::HttpServer;
use perovskite_web::templates::Templates;
use perovskite_web::web::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

/// Connect to the configured database. Failures are logged and the site runs without data routes.
async fn connect_store(config: &Config, datasets: &DatasetRegistry) -> Option<RecordStore> {
    let target = match config.database_target(&ProcessEnv) {
        Ok(target) => target,
        Err(e) => {
            warn!(error = %e, "Database settings could not be resolved; data routes disabled");
            return None;
        }
    };
    info!(target_db = %target.masked(), "Connecting to database");

    let connected = match target.connection_string() {
        Ok(url) => DbPool::connect(&url, &config.pool_settings()).await,
        Err(e) => Err(e),
    };

    match connected {
        Ok(pool) => {
            if let Some(version) = pool.server_version().await {
                info!(version = %version, "Database ready");
            }
            let executor = QueryExecutor::with_timeout(config.query_timeout);
            Some(RecordStore::new(pool, executor, datasets.clone()))
        }
        Err(e) => {
            warn!(
                error = %e,
                suggestion = e.suggestion().unwrap_or_default(),
                "Database connection failed; data routes disabled"
            );
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config = Config::parse();
    init_tracing(&config);

    info!(
        environment = %config.environment,
        "Starting perovskite-web v{}",
        env!("CARGO_PKG_VERSION")
    );

    let datasets = config.dataset_registry()?;
    info!(count = datasets.len(), "Datasets registered");

    let store = connect_store(&config, &datasets).await;
    let templates = Templates::new(&config.template_dir, config.dashboard_url.clone());
    let state = Arc::new(AppState::new(
        store,
        templates,
        datasets,
        config.static_dir.clone(),
    ));

    let server = HttpServer::new(state, config.host.clone(), config.port);
    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

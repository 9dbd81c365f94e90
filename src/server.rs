//! HTTP server lifecycle: bind, serve, and shut down gracefully.

use crate::error::{AppError, AppResult};
use crate::web::{AppState, build_router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Time allowed for in-flight requests after the first shutdown signal.
pub const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpServer {
    state: Arc<AppState>,
    host: String,
    port: u16,
}

impl HttpServer {
    pub fn new(state: Arc<AppState>, host: impl Into<String>, port: u16) -> Self {
        Self {
            state,
            host: host.into(),
            port,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Serve until SIGINT or SIGTERM, then close the database pool.
    pub async fn run(&self) -> AppResult<()> {
        let bind_addr = self.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            AppError::configuration(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        info!(addr = %bind_addr, "Listening");

        let app = build_router(self.state.clone());

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Either the server drains on its own, or the grace period / a second signal cuts it off
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(AppError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for requests to finish (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        if let Some(store) = &self.state.store {
            info!("Closing database connections");
            store.close().await;
        }

        Ok(())
    }
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

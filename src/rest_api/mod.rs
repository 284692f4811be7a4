//! HTTP endpoints
//!
//! A thin layer over the coordinator: decode the request, run one intent,
//! encode the outcome. Each request runs on its own task; when a client goes
//! away hyper drops the handler future and the in-flight store call with it.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::coordinator::DatabaseCoordinator;
use crate::error::Result;

pub use error::{status_for, ApiError};
pub use handlers::{
    CreateDatabaseRequest, DeleteDatabaseResponse, ListDatabasesResponse, ListQuery,
    ResourceQuery,
};

/// Shared application state
pub struct AppState {
    pub coordinator: Arc<DatabaseCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<DatabaseCoordinator>) -> Self {
        Self { coordinator }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/api/databases", get(handlers::list_databases))
        .route("/api/databases/get", get(handlers::get_database))
        .route("/api/databases/create", post(handlers::create_database))
        .route(
            "/api/databases/delete",
            delete(handlers::delete_database).post(handlers::delete_database),
        )
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz));

    #[cfg(feature = "metrics")]
    let router = router.route("/metrics", get(handlers::metrics));

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serve the API on `addr` until SIGINT/SIGTERM, then drain in-flight
/// requests.
pub async fn run_server(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("REST API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("REST API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

//! HTTP transport: a thin axum router over [`LedgerService`].

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::application::{AppError, ErrorKind, LedgerService};
use crate::config::ServerConfig;
use crate::domain::{Account, TransferView};

/// Service handle shared by all request handlers.
pub type SharedService = Arc<LedgerService>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, self.to_string()),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ErrorKind::Storage => {
                error!(error = ?self, "request failed in store");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json("OK")
}

/// GET /transfers
async fn list_transfers(
    State(service): State<SharedService>,
) -> Result<Json<Vec<TransferView>>, AppError> {
    Ok(Json(service.list_transfers().await?))
}

/// GET /transfers/:id
async fn get_transfer(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<Json<TransferView>, AppError> {
    Ok(Json(service.get_transfer(&id).await?))
}

/// POST /accounts
///
/// The body is taken raw so that any decoding failure, including a missing
/// content type, is reported as a plain bad request.
async fn create_account(
    State(service): State<SharedService>,
    body: Bytes,
) -> Result<Json<Account>, AppError> {
    Ok(Json(service.provision_account_json(&body).await?))
}

/// Build the application router.
pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/transfers", get(list_transfers))
        .route("/transfers/:id", get(get_transfer))
        .route("/accounts", post(create_account))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Connect to the configured database and serve until Ctrl+C.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let service = LedgerService::connect(&config.database)
        .await
        .with_context(|| {
            format!(
                "Failed to open database '{}' (run `init` first)",
                config.database
            )
        })?
        .with_store_timeout(config.store_timeout);
    let service = Arc::new(service);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!(
        addr = %listener.local_addr()?,
        database = %config.database,
        store_timeout = ?config.store_timeout,
        "server listening"
    );

    axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    service.close().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

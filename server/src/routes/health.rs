//! Liveness and readiness endpoints.
//!
//! `/health` never touches the database; the engine's reachability probe
//! pings it. `/health/ready` also checks PostgreSQL.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use curtain_engine::CollectionKey;
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Collections the office application syncs
    pub collections: Vec<&'static str>,
}

/// Readiness response.
#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(ready_check))
        .route("/", get(root))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        collections: CollectionKey::ALL.iter().map(|k| k.as_str()).collect(),
    })
}

async fn ready_check(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Database not reachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "unavailable",
                    database: "unreachable",
                }),
            )
        }
    }
}

async fn root() -> &'static str {
    "Curtain Document Store"
}

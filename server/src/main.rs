//! Curtain Server - document store for the theatre office.
//!
//! Serves the remote side of record sync: collections of flat JSON
//! documents over HTTP, persisted in PostgreSQL. The engine's
//! `HttpRemoteStore` is its client.

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod routes;

use crate::config::Config;
use crate::db::Pool;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Handler state: the document database and the server configuration.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<Config>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "curtain_server=debug,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// The document API with request tracing and permissive CORS for the
/// browser client.
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET is not set, accepting anonymous requests");
    }

    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Document table migrated");

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Curtain document store listening");

    let state = AppState {
        pool,
        config: Arc::new(config),
    };
    axum::serve(listener, app(state)).await?;

    Ok(())
}

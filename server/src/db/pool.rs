//! PostgreSQL pool for the document store.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Pool shared by every handler through `AppState`.
pub type Pool = PgPool;

/// Connect to the document database, capped at `max_connections`
/// (`DB_MAX_CONNECTIONS`).
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<Pool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    tracing::debug!(max_connections, "Connected to document database");
    Ok(pool)
}

/// Bring the `documents` table up to date with the embedded migrations.
pub async fn run_migrations(pool: &Pool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

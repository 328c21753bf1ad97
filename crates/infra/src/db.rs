//! Database wiring: connection pool and schema.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Catalog schema, applied idempotently at start-up.
pub const SCHEMA: &str = include_str!("../migrations/0001_catalog.sql");

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("catalog schema applied");
    Ok(())
}

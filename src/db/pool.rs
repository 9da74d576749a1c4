use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;

pub async fn create_pool(config: &DatabaseConfig, url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(url)
        .await?;

    health_check(&pool).await?;
    info!(max_connections = config.max_connections, "Database pool ready");

    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> anyhow::Result<bool> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;

    Ok(true)
}

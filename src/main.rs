//! Prepares a ledger database: loads settings, connects, applies the schema.
//!
//! The services are a library surface; a host application constructs them
//! over its own pool together with its invoicing collaborators.

use ledger_core::config::Settings;
use ledger_core::error::Result;
use ledger_core::observability::{init_logging, init_metrics, LogConfig};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;

    init_logging(&LogConfig::from(&settings.logging))?;
    info!("Configuration loaded");

    if settings.metrics.enabled {
        init_metrics()?;
        info!("Prometheus recorder installed");
    }

    // Connect to PostgreSQL
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout_secs))
        .connect(&settings.database.url)
        .await?;

    info!("Database connection established");

    if settings.database.run_migrations {
        info!("Running database migrations...");
        let migrator = sqlx::migrate!("./migrations");
        migrator.run(&pool).await?;
        info!(migrations = migrator.iter().count(), "Migrations applied successfully");
    }

    info!("Ledger database ready");

    pool.close().await;

    Ok(())
}

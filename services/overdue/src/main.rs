use anyhow::Result;
use common::database::{DatabaseConfig, init_pool};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod database;
mod sweeper;

use database::Database;
use sweeper::OverdueSweeper;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting overdue sweep service");

    // Default to the top of every hour
    let schedule = env::var("OVERDUE_SWEEP_SCHEDULE").unwrap_or_else(|_| "0 0 * * * *".to_string());

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    common::schema::apply(&pool).await?;

    let sweeper = OverdueSweeper::new(Database::new(pool));

    // Catch up on anything that fell due while the service was down
    if let Err(e) = sweeper.sweep().await {
        error!("Initial overdue sweep failed: {}", e);
    }

    let mut scheduler = sweeper.start(&schedule).await?;

    // Keep the service running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down overdue sweep service");
    scheduler.shutdown().await?;

    Ok(())
}

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod error;
mod extractors;
mod middleware;
mod models;
mod repositories;
mod routes;
mod settings;
mod state;
#[cfg(test)]
mod test_support;

use auth::{JwtConfig, JwtService};
use common::database::{DatabaseConfig, init_pool};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    bootstrap::AdminBootstrap,
    repositories::{BookRepository, BorrowRepository, ReviewRepository, UserRepository},
    settings::ServerConfig,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting library API service");

    let server_config = ServerConfig::load()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    common::schema::apply(&pool).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    // Initialize repositories
    let user_repository = UserRepository::new(pool.clone());
    let book_repository = BookRepository::new(pool.clone());
    let borrow_repository = BorrowRepository::new(pool.clone(), server_config.loan_period());
    let review_repository = ReviewRepository::new(pool.clone());

    if let Some(admin) = AdminBootstrap::from_env() {
        admin
            .ensure_admin(&user_repository)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to provision admin account: {}", e))?;
    }

    let app_state = AppState {
        db_pool: pool,
        jwt_service,
        user_repository,
        book_repository,
        borrow_repository,
        review_repository,
    };

    // Start the web server
    let app = routes::create_router(app_state).layer(TraceLayer::new_for_http());

    let address = server_config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Library API listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Library API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod extract;
mod middleware;
mod models;
mod pagination;
mod repositories;
mod routes;
mod state;

use auth::{
    AuthService,
    bootstrap::{AdminConfig, ensure_admin},
    confirmation::{ConfirmationCodeService, ConfirmationConfig},
    jwt::{JwtConfig, JwtService},
    mailer::MailerConfig,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use tokio::net::TcpListener;

use crate::{config::ApiConfig, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let api_config = ApiConfig::from_env()?;
    let jwt_config = JwtConfig::from_env()?;
    let confirmation_config = ConfirmationConfig::from_env()?;
    let mailer = MailerConfig::from_env()?.build()?;
    let admin_config = AdminConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let users = UserRepository::new(pool.clone());
    if let Some(admin_config) = &admin_config {
        ensure_admin(&users, admin_config).await?;
    }

    let auth_service = AuthService::new(
        users,
        ConfirmationCodeService::new(confirmation_config, mailer),
        JwtService::new(jwt_config),
        RateLimiter::new(RateLimiterConfig::default()),
    );

    let bind_address = api_config.bind_address.clone();
    let app_state = AppState::new(pool, api_config, auth_service);

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&bind_address).await?;
    info!("API service listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

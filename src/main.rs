//! # C-Secur360 Server
//!
//! Multi-tenant workplace safety backend.
//!
//! This is the application entry point that initializes:
//! - Configuration loading
//! - Tracing/logging subsystem
//! - Database connection pool and migrations
//! - Optional Redis connection
//! - HTTP server

use anyhow::Result;
use tracing::info;

use csecur360::config::Settings;
use csecur360::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Settings first: the log format depends on the environment
    let settings = Settings::load()?;
    csecur360::telemetry::init_tracing(settings.is_production());

    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        redis = settings.redis.enabled,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}

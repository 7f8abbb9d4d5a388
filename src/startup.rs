//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::application::services::{AccessControl, AuditService};
use crate::config::Settings;
use crate::infrastructure::cache::{self, PermissionCacheService};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{PgAuditRepository, PgRoleRepository};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging, RateLimiter};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// `None` when Redis is disabled
    pub redis: Option<ConnectionManager>,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub rate_limiter: RateLimiter,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: PgPool, redis: Option<ConnectionManager>, settings: Settings) -> Self {
        let snowflake = Arc::new(SnowflakeGenerator::new(
            u64::from(settings.snowflake.machine_id),
            0,
        ));
        Self {
            db,
            rate_limiter: RateLimiter::new(redis.clone()),
            redis,
            snowflake,
            settings: Arc::new(settings),
        }
    }

    /// Permission resolution, cached in Redis when available
    pub fn access_control(&self) -> Arc<AccessControl<PgRoleRepository>> {
        let cache = self
            .redis
            .clone()
            .map(|redis| PermissionCacheService::new(redis, self.settings.redis.permission_ttl_secs));
        Arc::new(AccessControl::new(
            Arc::new(PgRoleRepository::new(self.db.clone())),
            cache,
        ))
    }

    pub fn audit(&self) -> AuditService<PgAuditRepository> {
        AuditService::new(
            Arc::new(PgAuditRepository::new(self.db.clone())),
            self.snowflake.clone(),
        )
    }
}

/// Build the full router with cross-cutting layers
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(CompressionLayer::new())
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.database)
            .await
            .context("failed to connect to PostgreSQL")?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Database migrations applied");
        }

        let redis = if settings.redis.enabled {
            Some(
                cache::create_redis_client(&settings.redis)
                    .await
                    .context("failed to connect to Redis")?,
            )
        } else {
            tracing::info!("Redis disabled, using in-process rate limits and no permission cache");
            None
        };

        handlers::health::init_server_start();

        let addr = settings.server_addr();
        let state = AppState::new(db, redis, settings);
        let router = build_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

//! Cache Module
//!
//! Redis connection management and caching utilities.
//!
//! Redis is optional. When `redis.enabled` is false no connection is made,
//! permissions are read from the database on every check and rate limits are
//! kept in process.

mod permission_cache;

pub use permission_cache::PermissionCacheService;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key builders.
///
/// Use these to keep key naming consistent across the application.
pub mod keys {
    /// Prefix for effective permission bits (e.g., "perms:tenant_id:user_id")
    pub const PERMISSIONS: &str = "perms:";

    /// Prefix for rate limiting counters (e.g., "ratelimit:scope:client:window")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Generates a permission cache key
    #[inline]
    pub fn permissions(tenant_id: i64, user_id: i64) -> String {
        format!("{}{}:{}", PERMISSIONS, tenant_id, user_id)
    }

    /// Generates a fixed-window rate limit key
    #[inline]
    pub fn rate_limit(scope: &str, client: &str, window: u64) -> String {
        format!("{}{}:{}:{}", RATE_LIMIT, scope, client, window)
    }

}

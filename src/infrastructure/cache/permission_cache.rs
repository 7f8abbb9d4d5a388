//! Permission Cache Service
//!
//! Redis-based caching for effective permissions per (tenant, user).

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::keys;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Permission cache service
#[derive(Clone)]
pub struct PermissionCacheService {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl PermissionCacheService {
    /// Create a new permission cache service
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    /// Cached effective permission bits, if present.
    pub async fn get(&self, tenant_id: i64, user_id: i64) -> Result<Option<i64>, AppError> {
        let key = keys::permissions(tenant_id, user_id);

        let mut conn = self.redis.clone();
        let value: Option<i64> = conn.get(&key).await?;

        match value {
            Some(_) => metrics::record_permission_cache("hit"),
            None => metrics::record_permission_cache("miss"),
        }
        Ok(value)
    }

    /// Cache effective permission bits.
    pub async fn set(&self, tenant_id: i64, user_id: i64, permissions: i64) -> Result<(), AppError> {
        let key = keys::permissions(tenant_id, user_id);

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, permissions, self.ttl_secs).await?;

        Ok(())
    }

    /// Drop the cached entry (e.g., when role assignments change).
    pub async fn invalidate(&self, tenant_id: i64, user_id: i64) -> Result<bool, AppError> {
        let key = keys::permissions(tenant_id, user_id);

        let mut conn = self.redis.clone();
        let deleted: i64 = conn.del(&key).await?;

        Ok(deleted > 0)
    }
}

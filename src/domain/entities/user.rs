//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A person who signs in to a tenant.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - tenant_id: BIGINT NOT NULL REFERENCES tenants(id)
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - password_hash: VARCHAR(255) NOT NULL (Argon2id)
/// - full_name: VARCHAR(200) NOT NULL
/// - employee_number: VARCHAR(50) NULL
/// - hourly_rate_cents: BIGINT NOT NULL DEFAULT 0
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Owning tenant
    pub tenant_id: i64,

    /// Login email, unique across the platform
    pub email: String,

    /// Argon2 hash (never serialized)
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: String,

    /// Payroll identifier
    pub employee_number: Option<String>,

    /// Default billing rate applied to new timesheet entries
    pub hourly_rate_cents: i64,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for User data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user inside a tenant.
    async fn find_by_id(&self, tenant_id: i64, id: i64) -> Result<Option<User>, AppError>;

    /// Find a user by login email (platform-wide, used at login).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// List the users of a tenant.
    async fn list_by_tenant(&self, tenant_id: i64) -> Result<Vec<User>, AppError>;

    /// Create a new user.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Check if an email is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Number of active users of a tenant (seat usage).
    async fn count_active(&self, tenant_id: i64) -> Result<i64, AppError>;
}

//! Tenant entity and repository trait.
//!
//! Maps to the `tenants` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Province;
use crate::shared::error::AppError;

/// Subscription plan of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantPlan {
    #[default]
    Starter,
    Professional,
    Enterprise,
}

impl TenantPlan {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "professional" => Self::Professional,
            "enterprise" => Self::Enterprise,
            _ => Self::Starter,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    /// Seat limit applied when a tenant is created without an explicit one.
    pub fn default_max_users(&self) -> i32 {
        match self {
            Self::Starter => 10,
            Self::Professional => 50,
            Self::Enterprise => 1000,
        }
    }
}

/// A customer organization.
///
/// Maps to the `tenants` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(200) NOT NULL
/// - slug: VARCHAR(64) NOT NULL UNIQUE
/// - province: CHAR(2) NOT NULL
/// - plan: VARCHAR(20) NOT NULL
/// - max_users: INTEGER NOT NULL
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Province whose regulations and taxes apply by default
    pub province: Province,
    pub plan: TenantPlan,
    pub max_users: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for Tenant data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Find a tenant by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Tenant>, AppError>;

    /// Check whether a slug is taken.
    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;

    /// Create a new tenant.
    async fn create(&self, tenant: &Tenant) -> Result<Tenant, AppError>;
}

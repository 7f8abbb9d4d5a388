//! Role assignment entity and repository trait.
//!
//! Maps to the `role_assignments` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Role;
use crate::shared::error::AppError;

/// Grants a role to a user, optionally adjusted by explicit allow/deny bits.
///
/// Maps to the `role_assignments` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - tenant_id: BIGINT NULL REFERENCES tenants(id) (NULL = global)
/// - role: VARCHAR(20) NOT NULL
/// - allow_bits: BIGINT NOT NULL DEFAULT 0
/// - deny_bits: BIGINT NOT NULL DEFAULT 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: i64,
    pub user_id: i64,
    /// Tenant the role applies to; `None` only for global super admins
    pub tenant_id: Option<i64>,
    pub role: Role,
    /// Extra permission bits granted on top of the role
    pub allow: i64,
    /// Permission bits removed from the role
    pub deny: i64,
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// Whether this assignment applies to the given tenant.
    pub fn applies_to(&self, tenant_id: i64) -> bool {
        self.tenant_id == Some(tenant_id)
    }

    /// Whether this is a platform-wide super admin grant.
    pub fn is_global_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin && self.tenant_id.is_none()
    }
}

/// Repository trait for role assignments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// All assignments of a user, global ones included.
    async fn find_for_user(&self, user_id: i64) -> Result<Vec<RoleAssignment>, AppError>;

    /// Replace the user's assignments in one tenant.
    async fn replace_for_user(
        &self,
        user_id: i64,
        tenant_id: i64,
        assignments: Vec<RoleAssignment>,
    ) -> Result<Vec<RoleAssignment>, AppError>;
}

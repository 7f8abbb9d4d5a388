//! Role Assignment Repository Implementation
//!
//! PostgreSQL implementation of the RoleRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Role, RoleAssignment, RoleRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct RoleAssignmentRow {
    id: i64,
    user_id: i64,
    tenant_id: Option<i64>,
    role: String,
    allow_bits: i64,
    deny_bits: i64,
    created_at: DateTime<Utc>,
}

impl RoleAssignmentRow {
    fn into_assignment(self) -> Result<RoleAssignment, AppError> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            AppError::Internal(format!("unknown role '{}' on assignment {}", self.role, self.id))
        })?;
        Ok(RoleAssignment {
            id: self.id,
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            role,
            allow: self.allow_bits,
            deny: self.deny_bits,
            created_at: self.created_at,
        })
    }
}

/// PostgreSQL role assignment repository.
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn find_for_user(&self, user_id: i64) -> Result<Vec<RoleAssignment>, AppError> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT id, user_id, tenant_id, role, allow_bits, deny_bits, created_at
            FROM role_assignments
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RoleAssignmentRow::into_assignment).collect()
    }

    /// Runs in one transaction so a failed insert keeps the old grants.
    async fn replace_for_user(
        &self,
        user_id: i64,
        tenant_id: i64,
        assignments: Vec<RoleAssignment>,
    ) -> Result<Vec<RoleAssignment>, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_assignments WHERE user_id = $1 AND tenant_id = $2")
            .bind(user_id)
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;

        let mut saved = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let row = sqlx::query_as::<_, RoleAssignmentRow>(
                r#"
                INSERT INTO role_assignments (id, user_id, tenant_id, role, allow_bits, deny_bits)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, user_id, tenant_id, role, allow_bits, deny_bits, created_at
                "#,
            )
            .bind(assignment.id)
            .bind(user_id)
            .bind(tenant_id)
            .bind(assignment.role.as_str())
            .bind(assignment.allow)
            .bind(assignment.deny)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row.into_assignment()?);
        }

        tx.commit().await?;
        Ok(saved)
    }
}

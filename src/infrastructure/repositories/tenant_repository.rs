//! Tenant Repository Implementation
//!
//! PostgreSQL implementation of the TenantRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Province, Tenant, TenantPlan, TenantRepository};
use crate::shared::error::AppError;

/// Database row representation of the tenants table.
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: i64,
    name: String,
    slug: String,
    province: String,
    plan: String,
    max_users: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self) -> Result<Tenant, AppError> {
        let province = Province::parse(&self.province)
            .map_err(|e| AppError::Internal(format!("tenant {}: {}", self.id, e)))?;
        Ok(Tenant {
            id: self.id,
            name: self.name,
            slug: self.slug,
            province,
            plan: TenantPlan::from_str(&self.plan),
            max_users: self.max_users,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// PostgreSQL tenant repository implementation.
#[derive(Clone)]
pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PgTenantRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, slug, province, plan, max_users, is_active, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TenantRow::into_tenant).transpose()
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tenants WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, tenant: &Tenant) -> Result<Tenant, AppError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            INSERT INTO tenants (id, name, slug, province, plan, max_users, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, slug, province, plan, max_users, is_active, created_at, updated_at
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(tenant.province.code())
        .bind(tenant.plan.as_str())
        .bind(tenant.max_users)
        .bind(tenant.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Tenant slug already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

        row.into_tenant()
    }
}

//! Audit Log Repository Implementation
//!
//! PostgreSQL implementation of the AuditRepository trait. Insert only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{AuditEntry, AuditFilter, AuditRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: i64,
    tenant_id: i64,
    actor_id: Option<i64>,
    action: String,
    entity_type: String,
    entity_id: Option<i64>,
    metadata: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self) -> AuditEntry {
        AuditEntry {
            id: self.id,
            tenant_id: self.tenant_id,
            actor_id: self.actor_id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            metadata: self.metadata,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL audit log repository.
#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, tenant_id, actor_id, action, entity_type, entity_id,
                metadata, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.tenant_id)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.metadata)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, tenant_id: i64, filter: AuditFilter) -> Result<Vec<AuditEntry>, AppError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, tenant_id, actor_id, action, entity_type, entity_id,
                   metadata, ip_address, user_agent, created_at
            FROM audit_log
            WHERE tenant_id = $1
              AND ($2::BIGINT IS NULL OR actor_id = $2)
              AND ($3::VARCHAR IS NULL OR entity_type = $3)
              AND ($4::BIGINT IS NULL OR entity_id = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
              AND ($6::TIMESTAMPTZ IS NULL OR created_at < $6)
            ORDER BY created_at DESC, id DESC
            LIMIT $7
            "#,
        )
        .bind(tenant_id)
        .bind(filter.actor_id)
        .bind(filter.entity_type)
        .bind(filter.entity_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditRow::into_entry).collect())
    }
}

//! Audit log entry and repository trait.
//!
//! Maps to the `audit_log` table. Rows are append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// One recorded mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub tenant_id: i64,
    /// User who performed the action (None for system actions)
    pub actor_id: Option<i64>,
    /// Dotted action name, e.g. `ast.approve`
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub metadata: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing filter for the audit log.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_id: Option<i64>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
}

/// Repository trait for the audit log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError>;

    /// Newest first.
    async fn list(&self, tenant_id: i64, filter: AuditFilter) -> Result<Vec<AuditEntry>, AppError>;
}

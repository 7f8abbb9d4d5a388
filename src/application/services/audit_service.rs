//! Audit Service
//!
//! Appends audit entries after successful mutations and serves the tenant's
//! audit trail.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::access_control::AccessControl;
use super::actor::Actor;
use crate::domain::{AuditEntry, AuditFilter, AuditRepository, Permissions, RoleRepository};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Maximum page size of an audit listing
pub const MAX_AUDIT_LIMIT: i64 = 200;

/// Audit trail writer and reader
pub struct AuditService<A>
where
    A: AuditRepository,
{
    audit_repo: Arc<A>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<A> Clone for AuditService<A>
where
    A: AuditRepository,
{
    fn clone(&self) -> Self {
        Self {
            audit_repo: self.audit_repo.clone(),
            id_generator: self.id_generator.clone(),
        }
    }
}

impl<A> AuditService<A>
where
    A: AuditRepository,
{
    pub fn new(audit_repo: Arc<A>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            audit_repo,
            id_generator,
        }
    }

    /// Append an entry. A write failure is logged and never surfaces.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        metadata: Value,
    ) {
        let entry = AuditEntry {
            id: self.id_generator.generate(),
            tenant_id: actor.tenant_id,
            actor_id: Some(actor.user_id),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            metadata,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.audit_repo.insert(&entry).await {
            warn!(
                tenant_id = actor.tenant_id,
                user_id = actor.user_id,
                action,
                entity_id,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }

    /// Newest-first audit entries of the actor's tenant (requires VIEW_AUDIT_LOG).
    pub async fn list<R>(
        &self,
        access: &AccessControl<R>,
        actor: &Actor,
        mut filter: AuditFilter,
    ) -> Result<Vec<AuditEntry>, AppError>
    where
        R: RoleRepository,
    {
        access
            .authorize(actor, Permissions::VIEW_AUDIT_LOG, actor.tenant_scope())
            .await?;

        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::validation("from must not be after to"));
            }
        }
        filter.limit = clamp_limit(filter.limit, MAX_AUDIT_LIMIT);

        self.audit_repo.list(actor.tenant_id, filter).await
    }
}

/// Clamp a requested page size into `1..=max`, defaulting non-positive values to 50 (or `max`).
pub fn clamp_limit(requested: i64, max: i64) -> i64 {
    if requested <= 0 {
        50.min(max)
    } else {
        requested.min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::access_control::test_support::access_with_role;
    use crate::domain::entities::mocks::MockAuditRepository;
    use crate::domain::Role;

    fn service(repo: MockAuditRepository) -> AuditService<MockAuditRepository> {
        AuditService::new(Arc::new(repo), Arc::new(SnowflakeGenerator::new(1, 0)))
    }

    #[tokio::test]
    async fn test_record_swallows_failures() {
        let mut repo = MockAuditRepository::new();
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(AppError::Internal("audit table locked".into())));

        service(repo)
            .record(&Actor::new(1, 2), "ast.create", "ast_form", Some(3), Value::Null)
            .await;
    }

    #[tokio::test]
    async fn test_record_copies_request_info() {
        let mut repo = MockAuditRepository::new();
        repo.expect_insert()
            .withf(|entry| {
                entry.tenant_id == 2
                    && entry.actor_id == Some(1)
                    && entry.action == "permit.activate"
                    && entry.ip_address.as_deref() == Some("10.0.0.1")
            })
            .times(1)
            .returning(|_| Ok(()));

        let actor = Actor::new(1, 2).with_request_info(Some("10.0.0.1".into()), None);
        service(repo)
            .record(&actor, "permit.activate", "permit", Some(9), Value::Null)
            .await;
    }

    #[tokio::test]
    async fn test_list_requires_audit_permission() {
        let repo = MockAuditRepository::new();
        let access = access_with_role(2, Role::Worker);

        let err = service(repo)
            .list(&access, &Actor::new(1, 2), AuditFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_list_clamps_limit_and_scopes_tenant() {
        let mut repo = MockAuditRepository::new();
        repo.expect_list()
            .withf(|tenant_id, filter| *tenant_id == 2 && filter.limit == MAX_AUDIT_LIMIT)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let access = access_with_role(2, Role::Auditor);

        let filter = AuditFilter {
            limit: 10_000,
            ..Default::default()
        };
        let entries = service(repo)
            .list(&access, &Actor::new(1, 2), filter)
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0, 200), 50);
        assert_eq!(clamp_limit(-5, 20), 20);
        assert_eq!(clamp_limit(75, 100), 75);
        assert_eq!(clamp_limit(500, 100), 100);
    }
}

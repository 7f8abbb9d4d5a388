//! Access Control
//!
//! Resolves effective permissions of a user in a tenant (cache first, then
//! role assignments) and enforces permission checks for the other services.

use std::sync::Arc;

use tracing::{debug, warn};

use super::actor::Actor;
use crate::domain::services::PermissionService;
use crate::domain::{RoleRepository, Scope};
use crate::infrastructure::cache::PermissionCacheService;
use crate::shared::error::AppError;

/// Permission checks backed by role assignments and the optional Redis cache
pub struct AccessControl<R>
where
    R: RoleRepository,
{
    role_repo: Arc<R>,
    cache: Option<PermissionCacheService>,
}

impl<R> AccessControl<R>
where
    R: RoleRepository,
{
    pub fn new(role_repo: Arc<R>, cache: Option<PermissionCacheService>) -> Self {
        Self { role_repo, cache }
    }

    /// Effective permission bits of `user_id` in `tenant_id`.
    ///
    /// Cache failures are logged and the assignments are read from the database.
    pub async fn effective_permissions(&self, tenant_id: i64, user_id: i64) -> Result<i64, AppError> {
        if let Some(cache) = &self.cache {
            match cache.get(tenant_id, user_id).await {
                Ok(Some(bits)) => return Ok(bits),
                Ok(None) => {}
                Err(e) => warn!(tenant_id, user_id, error = %e, "Permission cache read failed"),
            }
        }

        let assignments = self.role_repo.find_for_user(user_id).await?;
        let bits = PermissionService::effective_permissions(&assignments, tenant_id);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(tenant_id, user_id, bits).await {
                warn!(tenant_id, user_id, error = %e, "Permission cache write failed");
            }
        }

        Ok(bits)
    }

    /// Require `required` in `scope`, returning the effective bits on success.
    pub async fn authorize(&self, actor: &Actor, required: i64, scope: Scope) -> Result<i64, AppError> {
        let effective = self
            .effective_permissions(scope.tenant_id(), actor.user_id)
            .await?;

        if PermissionService::allows(effective, actor.user_id, required, scope) {
            Ok(effective)
        } else {
            debug!(
                user_id = actor.user_id,
                tenant_id = scope.tenant_id(),
                required,
                "Permission denied"
            );
            Err(AppError::Forbidden("Missing permission".into()))
        }
    }

    /// Whether the user holds a platform-wide super admin grant.
    pub async fn is_super_admin(&self, user_id: i64) -> Result<bool, AppError> {
        let assignments = self.role_repo.find_for_user(user_id).await?;
        Ok(PermissionService::is_super_admin(&assignments))
    }

    /// Drop cached permissions after role assignments change.
    pub async fn invalidate(&self, tenant_id: i64, user_id: i64) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate(tenant_id, user_id).await {
                warn!(tenant_id, user_id, error = %e, "Permission cache invalidation failed");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::entities::mocks::MockRoleRepository;
    use crate::domain::{Permissions, Role};

    #[tokio::test]
    async fn test_worker_can_edit_own_form_only() {
        let access = access_with_role(1, Role::Worker);
        let actor = Actor::new(7, 1);

        assert!(access
            .authorize(&actor, Permissions::EDIT_FORMS, actor.record_scope(7))
            .await
            .is_ok());

        let err = access
            .authorize(&actor, Permissions::EDIT_FORMS, actor.record_scope(8))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_role_in_other_tenant_grants_nothing() {
        let access = access_with_role(2, Role::TenantAdmin);
        let actor = Actor::new(7, 1);

        let err = access
            .authorize(&actor, Permissions::VIEW_FORMS, actor.tenant_scope())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_global_super_admin() {
        let mut roles = MockRoleRepository::new();
        roles
            .expect_find_for_user()
            .returning(|user_id| Ok(vec![assignment(user_id, None, Role::SuperAdmin)]));
        let access = AccessControl::new(Arc::new(roles), None);
        let actor = Actor::new(1, 99);

        assert!(access.is_super_admin(1).await.unwrap());
        let bits = access
            .authorize(&actor, Permissions::MANAGE_USERS, actor.tenant_scope())
            .await
            .unwrap();
        assert_eq!(bits, Permissions::ALL);
    }

    #[tokio::test]
    async fn test_repository_failure_propagates() {
        let mut roles = MockRoleRepository::new();
        roles
            .expect_find_for_user()
            .returning(|_| Err(AppError::Internal("down".into())));
        let access = AccessControl::new(Arc::new(roles), None);

        assert!(access.effective_permissions(1, 1).await.is_err());
    }
}

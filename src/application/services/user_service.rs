//! User Service
//!
//! Tenant user management: profile, listing, creation within the seat limit
//! and role assignment.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::access_control::AccessControl;
use super::actor::Actor;
use super::audit_service::AuditService;
use super::auth_service::hash_password;
use crate::application::dto::request::{CreateUserRequest, RoleGrantRequest, SetRolesRequest};
use crate::domain::services::PermissionService;
use crate::domain::{
    AuditRepository, Permissions, Role, RoleAssignment, RoleRepository, TenantRepository, User,
    UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::sanitize::{sanitize_opt, sanitize_text};
use crate::shared::snowflake::SnowflakeGenerator;

/// The caller with its roles and effective permissions in the current tenant
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub roles: Vec<RoleAssignment>,
    pub permissions: i64,
}

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// Profile of the caller
    async fn me(&self, actor: &Actor) -> Result<UserProfile, UserError>;

    /// Users of the caller's tenant (MANAGE_USERS)
    async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, UserError>;

    /// Create a user in the caller's tenant (MANAGE_USERS)
    async fn create_user(&self, actor: &Actor, request: CreateUserRequest) -> Result<User, UserError>;

    /// Replace a user's roles in the caller's tenant (MANAGE_USERS)
    async fn set_roles(
        &self,
        actor: &Actor,
        user_id: i64,
        request: SetRolesRequest,
    ) -> Result<Vec<RoleAssignment>, UserError>;
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Email already exists")]
    EmailExists,

    #[error("Tenant user limit of {0} reached")]
    SeatLimitReached(i32),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("The super_admin role cannot be granted")]
    SuperAdminGrant,

    #[error("Unknown permission bits: {0:#x}")]
    UnknownPermissionBits(i64),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound => AppError::NotFound("User not found".into()),
            UserError::EmailExists => AppError::Conflict("Email already exists".into()),
            e @ UserError::SeatLimitReached(_) => AppError::Conflict(e.to_string()),
            e @ (UserError::UnknownRole(_) | UserError::UnknownPermissionBits(_)) => {
                AppError::validation(e.to_string())
            }
            e @ UserError::SuperAdminGrant => AppError::Forbidden(e.to_string()),
            UserError::Internal(msg) => AppError::Internal(msg),
            UserError::Store(e) => e,
        }
    }
}

/// UserService implementation
pub struct UserServiceImpl<U, T, R, A>
where
    U: UserRepository,
    T: TenantRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    user_repo: Arc<U>,
    tenant_repo: Arc<T>,
    role_repo: Arc<R>,
    access: Arc<AccessControl<R>>,
    audit: AuditService<A>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U, T, R, A> UserServiceImpl<U, T, R, A>
where
    U: UserRepository,
    T: TenantRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        tenant_repo: Arc<T>,
        role_repo: Arc<R>,
        access: Arc<AccessControl<R>>,
        audit: AuditService<A>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            tenant_repo,
            role_repo,
            access,
            audit,
            id_generator,
        }
    }

    fn build_assignment(
        &self,
        user_id: i64,
        tenant_id: i64,
        grant: &RoleGrantRequest,
    ) -> Result<RoleAssignment, UserError> {
        let role = Role::parse(&grant.role).ok_or_else(|| UserError::UnknownRole(grant.role.clone()))?;
        if role == Role::SuperAdmin {
            return Err(UserError::SuperAdminGrant);
        }
        let unknown = (grant.allow | grant.deny) & !Permissions::ALL;
        if unknown != 0 {
            return Err(UserError::UnknownPermissionBits(unknown));
        }

        Ok(RoleAssignment {
            id: self.id_generator.generate(),
            user_id,
            tenant_id: Some(tenant_id),
            role,
            allow: grant.allow,
            deny: grant.deny,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl<U, T, R, A> UserService for UserServiceImpl<U, T, R, A>
where
    U: UserRepository + 'static,
    T: TenantRepository + 'static,
    R: RoleRepository + 'static,
    A: AuditRepository + 'static,
{
    async fn me(&self, actor: &Actor) -> Result<UserProfile, UserError> {
        let user = self
            .user_repo
            .find_by_id(actor.tenant_id, actor.user_id)
            .await?
            .ok_or(UserError::NotFound)?;

        let assignments = self.role_repo.find_for_user(user.id).await?;
        let permissions = PermissionService::effective_permissions(&assignments, actor.tenant_id);
        let roles = assignments
            .into_iter()
            .filter(|a| a.applies_to(actor.tenant_id) || a.is_global_super_admin())
            .collect();

        Ok(UserProfile {
            user,
            roles,
            permissions,
        })
    }

    async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, UserError> {
        self.access
            .authorize(actor, Permissions::MANAGE_USERS, actor.tenant_scope())
            .await?;
        Ok(self.user_repo.list_by_tenant(actor.tenant_id).await?)
    }

    async fn create_user(&self, actor: &Actor, request: CreateUserRequest) -> Result<User, UserError> {
        self.access
            .authorize(actor, Permissions::MANAGE_USERS, actor.tenant_scope())
            .await?;

        let tenant = self
            .tenant_repo
            .find_by_id(actor.tenant_id)
            .await?
            .ok_or(UserError::NotFound)?;
        let active = self.user_repo.count_active(tenant.id).await?;
        if active >= i64::from(tenant.max_users) {
            return Err(UserError::SeatLimitReached(tenant.max_users));
        }

        let email = request.email.trim().to_lowercase();
        if self.user_repo.email_exists(&email).await? {
            return Err(UserError::EmailExists);
        }

        let user_id = self.id_generator.generate();
        let grants = if request.roles.is_empty() {
            vec![RoleGrantRequest {
                role: Role::Worker.as_str().to_string(),
                allow: 0,
                deny: 0,
            }]
        } else {
            request
                .roles
                .iter()
                .map(|role| RoleGrantRequest {
                    role: role.clone(),
                    allow: 0,
                    deny: 0,
                })
                .collect()
        };
        let assignments = grants
            .iter()
            .map(|grant| self.build_assignment(user_id, tenant.id, grant))
            .collect::<Result<Vec<_>, _>>()?;

        let password_hash =
            hash_password(&request.password).map_err(|e| UserError::Internal(e.to_string()))?;
        let now = Utc::now();
        let user = self
            .user_repo
            .create(&User {
                id: user_id,
                tenant_id: tenant.id,
                email,
                password_hash,
                full_name: sanitize_text(&request.full_name),
                employee_number: sanitize_opt(request.employee_number),
                hourly_rate_cents: request.hourly_rate_cents,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        let roles: Vec<&str> = assignments.iter().map(|a| a.role.as_str()).collect();
        let metadata = json!({ "email": user.email, "roles": roles });
        self.role_repo
            .replace_for_user(user.id, tenant.id, assignments)
            .await?;

        self.audit
            .record(actor, "user.create", "user", Some(user.id), metadata)
            .await;
        info!(tenant_id = tenant.id, user_id = user.id, "User created");
        Ok(user)
    }

    async fn set_roles(
        &self,
        actor: &Actor,
        user_id: i64,
        request: SetRolesRequest,
    ) -> Result<Vec<RoleAssignment>, UserError> {
        self.access
            .authorize(actor, Permissions::MANAGE_USERS, actor.tenant_scope())
            .await?;

        self.user_repo
            .find_by_id(actor.tenant_id, user_id)
            .await?
            .ok_or(UserError::NotFound)?;

        let assignments = request
            .roles
            .iter()
            .map(|grant| self.build_assignment(user_id, actor.tenant_id, grant))
            .collect::<Result<Vec<_>, _>>()?;

        let saved = self
            .role_repo
            .replace_for_user(user_id, actor.tenant_id, assignments)
            .await?;
        self.access.invalidate(actor.tenant_id, user_id).await;

        let roles: Vec<&str> = saved.iter().map(|a| a.role.as_str()).collect();
        self.audit
            .record(
                actor,
                "user.roles.update",
                "user",
                Some(user_id),
                json!({ "roles": roles }),
            )
            .await;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::access_control::test_support::assignment;
    use crate::domain::entities::mocks::{
        MockAuditRepository, MockRoleRepository, MockTenantRepository, MockUserRepository,
    };
    use crate::domain::{Province, Tenant, TenantPlan};

    type Service =
        UserServiceImpl<MockUserRepository, MockTenantRepository, MockRoleRepository, MockAuditRepository>;

    const TENANT: i64 = 1;
    const ADMIN: i64 = 10;

    fn tenant(max_users: i32) -> Tenant {
        let now = Utc::now();
        Tenant {
            id: TENANT,
            name: "Acme".into(),
            slug: "acme".into(),
            province: Province::ON,
            plan: TenantPlan::Starter,
            max_users,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn roles() -> MockRoleRepository {
        let mut roles = MockRoleRepository::new();
        roles.expect_find_for_user().returning(|user_id| {
            let role = if user_id == ADMIN {
                Role::TenantAdmin
            } else {
                Role::Worker
            };
            Ok(vec![assignment(user_id, Some(TENANT), role)])
        });
        roles
            .expect_replace_for_user()
            .returning(|_, _, assignments| Ok(assignments));
        roles
    }

    fn service(users: MockUserRepository, tenants: MockTenantRepository) -> Service {
        let role_repo = Arc::new(roles());
        let mut audit = MockAuditRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        let ids = Arc::new(SnowflakeGenerator::new(1, 0));
        UserServiceImpl::new(
            Arc::new(users),
            Arc::new(tenants),
            role_repo.clone(),
            Arc::new(AccessControl::new(role_repo, None)),
            AuditService::new(Arc::new(audit), ids.clone()),
            ids,
        )
    }

    fn create_request(roles: Vec<&str>) -> CreateUserRequest {
        CreateUserRequest {
            email: "New.Worker@Acme.example".into(),
            password: "long enough".into(),
            full_name: "New <b>Worker</b>".into(),
            employee_number: None,
            hourly_rate_cents: 4200,
            roles: roles.into_iter().map(String::from).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_user_defaults_to_worker() {
        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(|_| Ok(Some(tenant(10))));
        let mut users = MockUserRepository::new();
        users.expect_count_active().returning(|_| Ok(3));
        users.expect_email_exists().returning(|_| Ok(false));
        users.expect_create().returning(|u| Ok(u.clone()));

        let user = service(users, tenants)
            .create_user(&Actor::new(ADMIN, TENANT), create_request(vec![]))
            .await
            .unwrap();

        assert_eq!(user.email, "new.worker@acme.example");
        assert_eq!(user.full_name, "New Worker");
        assert_eq!(user.tenant_id, TENANT);
    }

    #[tokio::test]
    async fn test_seat_limit_is_conflict() {
        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(|_| Ok(Some(tenant(3))));
        let mut users = MockUserRepository::new();
        users.expect_count_active().returning(|_| Ok(3));

        let err = service(users, tenants)
            .create_user(&Actor::new(ADMIN, TENANT), create_request(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::SeatLimitReached(3)));
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_worker_cannot_manage_users() {
        let err = service(MockUserRepository::new(), MockTenantRepository::new())
            .list_users(&Actor::new(20, TENANT))
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_super_admin_cannot_be_granted() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|tenant_id, id| {
            let now = Utc::now();
            Ok(Some(User {
                id,
                tenant_id,
                email: "w@acme.example".into(),
                password_hash: String::new(),
                full_name: "W".into(),
                employee_number: None,
                hourly_rate_cents: 0,
                is_active: true,
                created_at: now,
                updated_at: now,
            }))
        });

        let request = SetRolesRequest {
            roles: vec![RoleGrantRequest {
                role: "super_admin".into(),
                allow: 0,
                deny: 0,
            }],
        };
        let err = service(users, MockTenantRepository::new())
            .set_roles(&Actor::new(ADMIN, TENANT), 20, request)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::SuperAdminGrant));
    }

    #[tokio::test]
    async fn test_set_roles_unknown_user() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_, _| Ok(None));

        let err = service(users, MockTenantRepository::new())
            .set_roles(&Actor::new(ADMIN, TENANT), 99, SetRolesRequest { roles: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound));
    }
}

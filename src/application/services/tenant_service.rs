//! Tenant Service
//!
//! Tenant provisioning (with its first administrator) and tenant lookup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use super::access_control::AccessControl;
use super::actor::Actor;
use super::audit_service::AuditService;
use super::auth_service::hash_password;
use crate::application::dto::request::CreateTenantRequest;
use crate::domain::{
    AuditRepository, Province, Role, RoleAssignment, RoleRepository, Tenant, TenantPlan,
    TenantRepository, User, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::sanitize::sanitize_text;
use crate::shared::snowflake::SnowflakeGenerator;

/// Tenant service trait
#[async_trait]
pub trait TenantService: Send + Sync {
    /// Create a tenant and its first tenant admin (super admin only)
    async fn create_tenant(
        &self,
        actor: &Actor,
        request: CreateTenantRequest,
    ) -> Result<(Tenant, User), TenantError>;

    /// Tenant of the caller with its active seat count
    async fn current_tenant(&self, actor: &Actor) -> Result<(Tenant, i64), TenantError>;
}

/// Tenant service errors
#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant not found")]
    NotFound,

    #[error("Only a super admin can create tenants")]
    NotSuperAdmin,

    #[error("Slug already in use")]
    SlugExists,

    #[error("Email already exists")]
    EmailExists,

    #[error("Unknown province: {0}")]
    UnknownProvince(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<TenantError> for AppError {
    fn from(e: TenantError) -> Self {
        match e {
            TenantError::NotFound => AppError::NotFound("Tenant not found".into()),
            TenantError::NotSuperAdmin => {
                AppError::Forbidden("Only a super admin can create tenants".into())
            }
            TenantError::SlugExists => AppError::Conflict("Slug already in use".into()),
            TenantError::EmailExists => AppError::Conflict("Email already exists".into()),
            TenantError::UnknownProvince(p) => {
                AppError::validation(format!("Unknown province: {}", p))
            }
            TenantError::Internal(msg) => AppError::Internal(msg),
            TenantError::Store(e) => e,
        }
    }
}

/// TenantService implementation
pub struct TenantServiceImpl<T, U, R, A>
where
    T: TenantRepository,
    U: UserRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    tenant_repo: Arc<T>,
    user_repo: Arc<U>,
    role_repo: Arc<R>,
    access: Arc<AccessControl<R>>,
    audit: AuditService<A>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<T, U, R, A> TenantServiceImpl<T, U, R, A>
where
    T: TenantRepository,
    U: UserRepository,
    R: RoleRepository,
    A: AuditRepository,
{
    pub fn new(
        tenant_repo: Arc<T>,
        user_repo: Arc<U>,
        role_repo: Arc<R>,
        access: Arc<AccessControl<R>>,
        audit: AuditService<A>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            tenant_repo,
            user_repo,
            role_repo,
            access,
            audit,
            id_generator,
        }
    }
}

#[async_trait]
impl<T, U, R, A> TenantService for TenantServiceImpl<T, U, R, A>
where
    T: TenantRepository + 'static,
    U: UserRepository + 'static,
    R: RoleRepository + 'static,
    A: AuditRepository + 'static,
{
    async fn create_tenant(
        &self,
        actor: &Actor,
        request: CreateTenantRequest,
    ) -> Result<(Tenant, User), TenantError> {
        if !self.access.is_super_admin(actor.user_id).await? {
            return Err(TenantError::NotSuperAdmin);
        }

        let province = Province::parse(&request.province)
            .map_err(|_| TenantError::UnknownProvince(request.province.clone()))?;

        if self.tenant_repo.slug_exists(&request.slug).await? {
            return Err(TenantError::SlugExists);
        }
        let admin_email = request.admin_email.trim().to_lowercase();
        if self.user_repo.email_exists(&admin_email).await? {
            return Err(TenantError::EmailExists);
        }

        let plan = request
            .plan
            .as_deref()
            .map(TenantPlan::from_str)
            .unwrap_or_default();
        let now = Utc::now();

        let tenant = self
            .tenant_repo
            .create(&Tenant {
                id: self.id_generator.generate(),
                name: sanitize_text(&request.name),
                slug: request.slug,
                province,
                plan,
                max_users: request.max_users.unwrap_or_else(|| plan.default_max_users()),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        let password_hash = hash_password(&request.admin_password)
            .map_err(|e| TenantError::Internal(e.to_string()))?;
        let admin = self
            .user_repo
            .create(&User {
                id: self.id_generator.generate(),
                tenant_id: tenant.id,
                email: admin_email,
                password_hash,
                full_name: sanitize_text(&request.admin_full_name),
                employee_number: None,
                hourly_rate_cents: 0,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.role_repo
            .replace_for_user(
                admin.id,
                tenant.id,
                vec![RoleAssignment {
                    id: self.id_generator.generate(),
                    user_id: admin.id,
                    tenant_id: Some(tenant.id),
                    role: Role::TenantAdmin,
                    allow: 0,
                    deny: 0,
                    created_at: now,
                }],
            )
            .await?;

        let in_new_tenant = Actor {
            tenant_id: tenant.id,
            ..actor.clone()
        };
        self.audit
            .record(
                &in_new_tenant,
                "tenant.create",
                "tenant",
                Some(tenant.id),
                json!({ "slug": tenant.slug, "admin_id": admin.id.to_string() }),
            )
            .await;

        info!(tenant_id = tenant.id, slug = %tenant.slug, "Tenant created");
        Ok((tenant, admin))
    }

    async fn current_tenant(&self, actor: &Actor) -> Result<(Tenant, i64), TenantError> {
        let tenant = self
            .tenant_repo
            .find_by_id(actor.tenant_id)
            .await?
            .ok_or(TenantError::NotFound)?;
        let seats_used = self.user_repo.count_active(tenant.id).await?;
        Ok((tenant, seats_used))
    }
}

//! Tenant Handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::application::dto::request::CreateTenantRequest;
use crate::application::dto::response::{TenantCreatedResponse, TenantResponse, UserResponse};
use crate::application::services::{TenantService, TenantServiceImpl};
use crate::infrastructure::repositories::{
    PgAuditRepository, PgRoleRepository, PgTenantRepository, PgUserRepository,
};
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

fn tenant_service(
    state: &AppState,
) -> TenantServiceImpl<PgTenantRepository, PgUserRepository, PgRoleRepository, PgAuditRepository> {
    TenantServiceImpl::new(
        Arc::new(PgTenantRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgRoleRepository::new(state.db.clone())),
        state.access_control(),
        state.audit(),
        state.snowflake.clone(),
    )
}

/// Create a tenant with its first administrator (super admin only)
pub async fn create_tenant(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<TenantCreatedResponse>), AppError> {
    validate_request(&body)?;

    let (tenant, admin) = tenant_service(&state).create_tenant(&actor, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(TenantCreatedResponse {
            tenant: TenantResponse::new(tenant, Some(1)),
            admin: UserResponse::from(admin),
        }),
    ))
}

/// Tenant of the caller
pub async fn current_tenant(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<Json<TenantResponse>, AppError> {
    let (tenant, seats_used) = tenant_service(&state).current_tenant(&actor).await?;
    Ok(Json(TenantResponse::new(tenant, Some(seats_used))))
}

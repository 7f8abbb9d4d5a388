//! User Handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::parse_id;
use crate::application::dto::request::{CreateUserRequest, SetRolesRequest};
use crate::application::dto::response::{ProfileResponse, RoleAssignmentResponse, UserResponse};
use crate::application::services::{UserService, UserServiceImpl};
use crate::infrastructure::repositories::{
    PgAuditRepository, PgRoleRepository, PgTenantRepository, PgUserRepository,
};
use crate::presentation::http::extractors::RequestActor;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

fn user_service(
    state: &AppState,
) -> UserServiceImpl<PgUserRepository, PgTenantRepository, PgRoleRepository, PgAuditRepository> {
    UserServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgTenantRepository::new(state.db.clone())),
        Arc::new(PgRoleRepository::new(state.db.clone())),
        state.access_control(),
        state.audit(),
        state.snowflake.clone(),
    )
}

/// Get current user with roles and effective permissions
pub async fn get_current_user(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = user_service(&state).me(&actor).await?;
    Ok(Json(ProfileResponse::from(profile)))
}

/// List users of the caller's tenant
pub async fn list_users(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = user_service(&state).list_users(&actor).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user in the caller's tenant
pub async fn create_user(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    validate_request(&body)?;

    let user = user_service(&state).create_user(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Replace a user's roles in the caller's tenant
pub async fn set_roles(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(user_id): Path<String>,
    Json(body): Json<SetRolesRequest>,
) -> Result<Json<Vec<RoleAssignmentResponse>>, AppError> {
    validate_request(&body)?;
    let user_id = parse_id(&user_id, "user")?;

    let assignments = user_service(&state).set_roles(&actor, user_id, body).await?;
    Ok(Json(
        assignments
            .into_iter()
            .map(RoleAssignmentResponse::from)
            .collect(),
    ))
}

//! Authentication Handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::headers::{HeaderMapExt, UserAgent};

use crate::application::dto::request::{LoginRequest, RefreshTokenRequest};
use crate::application::dto::response::{LoginResponse, TokenResponse, UserResponse};
use crate::application::services::{AuthService, AuthServiceImpl};
use crate::infrastructure::repositories::{
    PgSessionRepository, PgTenantRepository, PgUserRepository,
};
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

fn auth_service(
    state: &AppState,
) -> AuthServiceImpl<PgUserRepository, PgSessionRepository, PgTenantRepository> {
    AuthServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgSessionRepository::new(state.db.clone())),
        Arc::new(PgTenantRepository::new(state.db.clone())),
        state.settings.jwt.clone(),
    )
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_request(&body)?;

    let device_info = headers
        .typed_get::<UserAgent>()
        .map(|ua| ua.as_str().chars().take(255).collect());
    let (user, tokens) = auth_service(&state)
        .login(&body.email, &body.password, device_info)
        .await?;

    Ok(Json(LoginResponse {
        user: UserResponse::from(user),
        tokens: TokenResponse::from(tokens),
    }))
}

/// Refresh access token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_request(&body)?;

    let tokens = auth_service(&state).refresh_token(&body.refresh_token).await?;
    Ok(Json(TokenResponse::from(tokens)))
}

/// Logout (revoke refresh token). Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> StatusCode {
    if !body.refresh_token.is_empty() {
        if let Err(e) = auth_service(&state).revoke_token(&body.refresh_token).await {
            tracing::warn!(error = %e, "Failed to revoke refresh token on logout");
        }
    }
    StatusCode::NO_CONTENT
}

//! Authentication Middleware
//!
//! JWT validation middleware for protected routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::application::services::auth_service::decode_access_token;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub tenant_id: i64,
}

/// Authentication middleware that validates JWT access tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))?;

    let claims = decode_access_token(&state.settings.jwt.secret, token)?;
    let (user_id, tenant_id) = claims.identity()?;

    request
        .extensions_mut()
        .insert(AuthUser { user_id, tenant_id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::auth_service::issue_access_token;
    use crate::config::JwtSettings;

    fn jwt() -> JwtSettings {
        JwtSettings {
            secret: "an-access-token-secret-of-32-chars!!".into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        }
    }

    #[test]
    fn test_token_carries_tenant() {
        let settings = jwt();
        let token = issue_access_token(&settings, 42, 7).unwrap();
        let claims = decode_access_token(&settings.secret, &token).unwrap();
        assert_eq!(claims.identity().unwrap(), (42, 7));
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = issue_access_token(&jwt(), 42, 7).unwrap();
        let err = decode_access_token("another-secret-that-is-long-enough!!", &token).unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Unauthorized(_)));
    }
}

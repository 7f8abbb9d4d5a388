//! Custom Extractors
//!
//! Axum extractors that turn an authenticated request into a service `Actor`.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use axum_extra::headers::{HeaderMapExt, UserAgent};

use crate::application::services::Actor;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;

/// Maximum stored user agent length
const MAX_USER_AGENT_LEN: usize = 512;

/// Caller of a protected endpoint, with the request metadata used for auditing.
///
/// Requires `auth_middleware` to have run on the route.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

        let connect_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip());

        let actor = Actor::new(auth_user.user_id, auth_user.tenant_id)
            .with_request_info(client_ip(parts, connect_ip), user_agent(parts));

        Ok(RequestActor(actor))
    }
}

/// First valid `X-Forwarded-For` address, else the connection address
fn client_ip(parts: &Parts, connect_ip: Option<IpAddr>) -> Option<String> {
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
        .or(connect_ip)
        .map(|ip| ip.to_string())
}

fn user_agent(parts: &Parts) -> Option<String> {
    parts
        .headers
        .typed_get::<UserAgent>()
        .map(|ua| ua.as_str().chars().take(MAX_USER_AGENT_LEN).collect())
}

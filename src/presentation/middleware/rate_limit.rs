//! Rate Limiting Middleware
//!
//! Fixed one-minute windows per client and scope. Counters live in Redis
//! when it is enabled and in a process-local map otherwise (or while Redis
//! is unreachable).

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::infrastructure::cache::keys;
use crate::presentation::middleware::auth::AuthUser;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

/// Window length in seconds
pub const WINDOW_SECS: u64 = 60;

/// Local counters are pruned of stale windows past this many clients
const LOCAL_PRUNE_THRESHOLD: usize = 10_000;

/// Rate-limited endpoint families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    /// Login, refresh and logout
    Auth,
    /// Every other API endpoint
    Api,
}

impl EndpointType {
    /// Requests allowed per window
    pub fn limit(&self, settings: &RateLimitSettings) -> u32 {
        match self {
            EndpointType::Auth => settings.auth_per_minute,
            EndpointType::Api => settings.api_per_minute,
        }
    }

    fn scope(&self) -> &'static str {
        match self {
            EndpointType::Auth => "auth",
            EndpointType::Api => "api",
        }
    }
}

/// Rate limit status returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: u64,
    /// Seconds until the window resets (0 when allowed)
    pub retry_after: u64,
}

#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    #[serde(flatten)]
    error: ErrorResponse,
    rate_limit: RateLimitInfo,
}

/// Fixed-window request counter.
#[derive(Clone)]
pub struct RateLimiter {
    redis: Option<ConnectionManager>,
    local: Arc<DashMap<String, (u64, u32)>>,
}

impl RateLimiter {
    pub fn new(redis: Option<ConnectionManager>) -> Self {
        Self {
            redis,
            local: Arc::new(DashMap::new()),
        }
    }

    /// Count one request. `Ok` when allowed, `Err` when over the limit.
    pub async fn check(
        &self,
        endpoint: EndpointType,
        client: &str,
        limit: u32,
    ) -> Result<RateLimitInfo, RateLimitInfo> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let window = now / WINDOW_SECS;

        let count = match &self.redis {
            Some(redis) => match self.count_redis(redis, endpoint, client, window).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(error = %e, "Rate limiter Redis error, counting locally");
                    self.count_local(endpoint, client, window)
                }
            },
            None => self.count_local(endpoint, client, window),
        };

        evaluate(count, limit, window, now)
    }

    async fn count_redis(
        &self,
        redis: &ConnectionManager,
        endpoint: EndpointType,
        client: &str,
        window: u64,
    ) -> Result<u32, redis::RedisError> {
        let key = keys::rate_limit(endpoint.scope(), client, window);
        let mut conn = redis.clone();

        let (count,): (u32,) = redis::pipe()
            .atomic()
            .incr(&key, 1u32)
            .expire(&key, (WINDOW_SECS + 1) as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    fn count_local(&self, endpoint: EndpointType, client: &str, window: u64) -> u32 {
        if self.local.len() > LOCAL_PRUNE_THRESHOLD {
            self.local.retain(|_, (w, _)| *w == window);
        }

        let key = format!("{}:{}", endpoint.scope(), client);
        let mut entry = self.local.entry(key).or_insert((window, 0));
        let (current_window, count) = entry.value_mut();
        if *current_window != window {
            *current_window = window;
            *count = 0;
        }
        *count += 1;
        *count
    }
}

fn evaluate(count: u32, limit: u32, window: u64, now: u64) -> Result<RateLimitInfo, RateLimitInfo> {
    let reset_at = (window + 1) * WINDOW_SECS;
    let info = RateLimitInfo {
        limit,
        remaining: limit.saturating_sub(count),
        reset_at,
        retry_after: 0,
    };

    if count <= limit {
        Ok(info)
    } else {
        Err(RateLimitInfo {
            retry_after: reset_at.saturating_sub(now).max(1),
            ..info
        })
    }
}

/// Client identifier for rate limiting.
///
/// Authenticated user first, then the first `X-Forwarded-For` address,
/// then `X-Real-IP`, then the connection address.
fn extract_identifier(request: &Request, client_ip: Option<IpAddr>) -> String {
    if let Some(auth_user) = request.extensions().get::<AuthUser>() {
        return format!("user:{}", auth_user.user_id);
    }

    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim);

    if let Some(ip) = forwarded
        .into_iter()
        .chain(real_ip)
        .find_map(|candidate| candidate.parse::<IpAddr>().ok())
    {
        return format!("ip:{}", ip);
    }

    match client_ip {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Rate limiting middleware for authentication endpoints.
pub async fn rate_limit_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    rate_limit_inner(state, request, next, EndpointType::Auth).await
}

/// Rate limiting middleware for standard API endpoints.
pub async fn rate_limit_api(State(state): State<AppState>, request: Request, next: Next) -> Response {
    rate_limit_inner(state, request, next, EndpointType::Api).await
}

async fn rate_limit_inner(
    state: AppState,
    request: Request,
    next: Next,
    endpoint: EndpointType,
) -> Response {
    // Present when served with `into_make_service_with_connect_info`
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = extract_identifier(&request, client_ip);
    let limit = endpoint.limit(&state.settings.rate_limit);

    match state.rate_limiter.check(endpoint, &identifier, limit).await {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(
                identifier = %identifier,
                endpoint_type = ?endpoint,
                "Rate limit exceeded"
            );
            create_rate_limit_response(info)
        }
    }
}

fn add_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(info.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(info.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(info.reset_at));
}

fn create_rate_limit_response(info: RateLimitInfo) -> Response {
    let mut headers = HeaderMap::new();
    add_rate_limit_headers(&mut headers, &info);
    headers.insert(header::RETRY_AFTER, HeaderValue::from(info.retry_after));

    let body = RateLimitExceededResponse {
        error: ErrorResponse {
            code: 10006,
            message: "You are being rate limited. Please slow down.".to_string(),
            errors: None,
            details: None,
        },
        rate_limit: info,
    };

    (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
}

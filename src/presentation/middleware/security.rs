//! Security Headers Middleware
//!
//! Adds security headers to every response. The API only serves JSON, so
//! the content policy forbids all subresources and framing, and responses
//! are never cached by intermediaries.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response},
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::config::Settings;

/// Security headers configuration
#[derive(Clone, Debug)]
pub struct SecurityHeadersConfig {
    /// Only meaningful behind HTTPS
    pub enable_hsts: bool,
    pub hsts_max_age: u64,
    pub content_security_policy: &'static str,
    pub referrer_policy: &'static str,
    pub cache_control: &'static str,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enable_hsts: true,
            hsts_max_age: 31_536_000,
            content_security_policy: "default-src 'none'; frame-ancestors 'none'",
            referrer_policy: "no-referrer",
            cache_control: "no-store",
        }
    }
}

impl SecurityHeadersConfig {
    /// HSTS only in production
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enable_hsts: settings.is_production(),
            ..Default::default()
        }
    }
}

/// Layer that adds security headers to responses
#[derive(Clone, Default)]
pub struct SecurityHeadersLayer {
    config: SecurityHeadersConfig,
}

impl SecurityHeadersLayer {
    pub fn new(config: SecurityHeadersConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Middleware service that adds security headers
#[derive(Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    config: SecurityHeadersConfig,
}

impl<S> Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            let headers = response.headers_mut();

            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
            headers.insert(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(config.content_security_policy),
            );
            headers.insert(
                header::REFERRER_POLICY,
                HeaderValue::from_static(config.referrer_policy),
            );
            // Handlers that set their own caching policy keep it
            headers
                .entry(header::CACHE_CONTROL)
                .or_insert(HeaderValue::from_static(config.cache_control));

            if config.enable_hsts {
                if let Ok(value) =
                    HeaderValue::from_str(&format!("max-age={}; includeSubDomains", config.hsts_max_age))
                {
                    headers.insert(header::STRICT_TRANSPORT_SECURITY, value);
                }
            }

            Ok(response)
        })
    }
}

/// Security headers layer for the given environment
pub fn create_security_headers_layer(settings: &Settings) -> SecurityHeadersLayer {
    SecurityHeadersLayer::new(SecurityHeadersConfig::from_settings(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    async fn send(layer: SecurityHeadersLayer) -> Response<Body> {
        let app = Router::new().route("/", get(test_handler)).layer(layer);
        app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let response = send(SecurityHeadersLayer::default()).await;
        let headers = response.headers();

        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(headers.get(header::REFERRER_POLICY).unwrap(), "no-referrer");
        assert!(headers
            .get(header::STRICT_TRANSPORT_SECURITY)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("max-age=31536000"));
    }

    #[tokio::test]
    async fn test_hsts_disabled() {
        let response = send(SecurityHeadersLayer::new(SecurityHeadersConfig {
            enable_hsts: false,
            ..Default::default()
        }))
        .await;

        assert!(response.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
        assert_eq!(
            response.headers().get(header::CONTENT_SECURITY_POLICY).unwrap(),
            "default-src 'none'; frame-ancestors 'none'"
        );
    }
}

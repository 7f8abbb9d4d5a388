//! Authentication and authorization boundary tests

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{test_settings, TestApp};

#[tokio::test]
async fn test_login_with_invalid_email_fails_validation() {
    let server = TestApp::new().server();

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "not-an-email", "password": "whatever"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], 10007);
    assert_eq!(body["errors"][0]["field"], "email");
}

#[tokio::test]
async fn test_login_with_empty_password_fails_validation() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/api/v1/auth/login",
            r#"{"email":"chef@electro.example","password":""}"#,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let mut settings = test_settings();
    settings.rate_limit.auth_per_minute = 2;
    let server = TestApp::with_settings(settings).server();
    let body = json!({"email": "bad", "password": "x"});

    for _ in 0..2 {
        let response = server.post("/api/v1/auth/login").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.maybe_header("x-ratelimit-remaining").is_some());
    }

    let response = server.post("/api/v1/auth/login").json(&body).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.maybe_header("retry-after").is_some());
    assert_eq!(response.json::<Value>()["code"], 10006);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let server = TestApp::new().server();

    let response = server.get("/api/v1/users/@me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 10003);
}

#[tokio::test]
async fn test_malformed_token_rejected() {
    let server = TestApp::new().server();

    let response = server
        .get("/api/v1/forms")
        .authorization_bearer("not.a.jwt")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let app = TestApp::new();
    let mut other = test_settings();
    other.jwt.secret = "a-completely-different-secret-of-32+".into();
    let foreign = TestApp::with_settings(other).token();

    let response = app
        .server()
        .get("/api/v1/permits")
        .authorization_bearer(foreign)
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_path_id_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .server()
        .get("/api/v1/forms/not-a-number")
        .authorization_bearer(app.token())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Invalid form ID");
}

#[tokio::test]
async fn test_logout_always_no_content() {
    let server = TestApp::new().server();

    let response = server
        .post("/api/v1/auth/logout")
        .json(&json!({"refresh_token": ""}))
        .await;

    response.assert_status(StatusCode::NO_CONTENT);
}

//! Field tool and regulation table endpoint tests

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_volume_is_public() {
    let server = TestApp::new().server();

    let response = server
        .post("/api/v1/tools/volume")
        .json(&json!({"shape": "cylindrical", "diameter": 2.0, "height": 3.0}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["shape"], "cylindrical");
    assert_eq!(body["cubic_meters"], 9.425);
}

#[tokio::test]
async fn test_irregular_volume_applies_shape_factor() {
    let server = TestApp::new().server();

    let response = server
        .post("/api/v1/tools/volume")
        .json(&json!({"shape": "irregular", "length": 2.0, "width": 2.0, "height": 2.0}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["cubic_meters"], 6.8);
}

#[tokio::test]
async fn test_volume_rejects_negative_dimension() {
    let server = TestApp::new().server();

    let response = server
        .post("/api/v1/tools/volume")
        .json(&json!({"shape": "spherical", "diameter": -1.0}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_volume_rejects_overflowing_dimensions() {
    let server = TestApp::new().server();

    let response = server
        .post("/api/v1/tools/volume")
        .json(&json!({"shape": "rectangular", "length": 1e200, "width": 1e200, "height": 1e200}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_journal_requires_authentication() {
    let server = TestApp::new().server();

    let response = server
        .post("/api/v1/tools/journal")
        .json(&json!({"text": "Installé le panneau."}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_journal_classifies_text() {
    let app = TestApp::new();

    let response = app
        .server()
        .post("/api/v1/tools/journal")
        .authorization_bearer(app.token())
        .json(&json!({"text": "Fuite d'huile sur la pompe P-3\nTravaillé 8 heures"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["safety_flag"], true);
    assert_eq!(body["safety"][0], "Fuite d'huile sur la pompe P-3");
}

#[tokio::test]
async fn test_sanitize_strips_scripts() {
    let app = TestApp::new();

    let response = app
        .server()
        .post("/api/v1/tools/sanitize")
        .authorization_bearer(app.token())
        .json(&json!({"note": "<script>steal()</script>Valve <b>fermée</b>"}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["sanitized"]["note"], "Valve fermée");
}

#[tokio::test]
async fn test_regulation_table_lookup() {
    let app = TestApp::new();

    let response = app
        .server()
        .get("/api/v1/permits/regulations/on")
        .authorization_bearer(app.token())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["province"], "ON");
    assert!(body["limits"]["oxygen_min_percent"].is_number());
}

#[tokio::test]
async fn test_unknown_province_not_found() {
    let app = TestApp::new();

    let response = app
        .server()
        .get("/api/v1/permits/regulations/ZZ")
        .authorization_bearer(app.token())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

//! Health, OpenAPI document, metrics and cross-cutting response headers.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::TestApp;

async fn get(app: &TestApp, uri: &str) -> common::TestResponse {
    app.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
}

#[tokio::test]
async fn health_check_reports_backends() {
    let app = TestApp::spawn().await;

    let response = get(&app, "/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["service"], "guardian-service-test");
    assert_eq!(response.body["checks"]["database"], "up");
    assert_eq!(response.body["checks"]["cache"], "up");
}

#[tokio::test]
async fn openapi_document_lists_routes_and_bearer_scheme() {
    let app = TestApp::spawn().await;

    let response = get(&app, "/.well-known/openapi.json").await;

    assert_eq!(response.status, StatusCode::OK);
    let paths = &response.body["paths"];
    assert!(paths["/api/v1/auth/login"].is_object());
    assert!(paths["/api/v1/mfa/verify-code"].is_object());
    assert!(paths["/api/v1/files/{token}"].is_object());
    assert!(paths["/api/v1/lost-articles/found"].is_object());
    assert!(response.body["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn metrics_are_exposed_in_prometheus_format() {
    guardian_service::services::metrics::init_metrics().expect("metrics recorder");
    let app = TestApp::spawn().await;
    get(&app, "/health").await;

    let response = get(&app, "/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    let text = String::from_utf8(response.bytes).unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = get(&app, "/health").await;

    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert!(response.headers.contains_key("x-frame-options"));
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.headers["x-request-id"], "req-123");
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/auth/login")
                .header("origin", "http://localhost:8081")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(
        response.headers["access-control-allow-origin"],
        "http://localhost:8081"
    );
    assert_eq!(response.headers["access-control-allow-credentials"], "true");
}

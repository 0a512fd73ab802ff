//! Email one-time code verification after password login.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

const EMAIL: &str = "casey@example.com";

fn wrong_code(code: &str) -> String {
    if code == "000000" {
        "111111".to_string()
    } else {
        "000000".to_string()
    }
}

#[tokio::test]
async fn verify_code_sets_cookies_and_returns_tokens() {
    let app = TestApp::spawn().await;
    app.register(EMAIL).await;
    let mfa_token = app.login(EMAIL).await;

    let response = app.verify(&mfa_token, &app.last_code(EMAIL)).await;

    assert_eq!(response.status, StatusCode::OK);
    let access = response.body["accessToken"].as_str().unwrap();
    let refresh = response.body["refreshToken"].as_str().unwrap();
    assert_ne!(access, refresh);

    let access_cookie = response.cookie("accessToken").expect("accessToken cookie");
    assert!(access_cookie.contains(access));
    assert!(access_cookie.contains("HttpOnly"));
    assert!(access_cookie.contains("SameSite=Strict"));
    assert!(access_cookie.contains("Path=/"));
    assert!(response.cookie("refreshToken").unwrap().contains(refresh));
}

#[tokio::test]
async fn code_is_single_use() {
    let app = TestApp::spawn().await;
    app.register(EMAIL).await;
    let mfa_token = app.login(EMAIL).await;
    let code = app.last_code(EMAIL);

    assert_eq!(app.verify(&mfa_token, &code).await.status, StatusCode::OK);
    assert_eq!(
        app.verify(&mfa_token, &code).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn wrong_code_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.register(EMAIL).await;
    let mfa_token = app.login(EMAIL).await;
    let code = app.last_code(EMAIL);

    let response = app.verify(&mfa_token, &wrong_code(&code)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.cookies().is_empty());
    // The challenge survives a single miss.
    assert_eq!(app.verify(&mfa_token, &code).await.status, StatusCode::OK);
}

#[tokio::test]
async fn challenge_is_discarded_after_max_attempts() {
    let app = TestApp::spawn().await;
    app.register(EMAIL).await;
    let mfa_token = app.login(EMAIL).await;
    let code = app.last_code(EMAIL);

    for _ in 0..app.state.config.mfa.max_attempts {
        let response = app.verify(&mfa_token, &wrong_code(&code)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    assert_eq!(
        app.verify(&mfa_token, &code).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn tampered_mfa_token_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.register(EMAIL).await;
    let mfa_token = app.login(EMAIL).await;

    let response = app
        .verify(&format!("{}x", mfa_token), &app.last_code(EMAIL))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verify_without_code_is_bad_request() {
    let app = TestApp::spawn().await;
    app.register(EMAIL).await;
    let mfa_token = app.login(EMAIL).await;

    let response = app
        .post(
            "/api/v1/mfa/verify-code",
            None,
            json!({ "mfa_token": mfa_token }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "code is required");
}

#[tokio::test]
async fn verify_without_body_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .request(Method::POST, "/api/v1/mfa/verify-code", None, None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "mfa_token is required");
}

#[tokio::test]
async fn resend_without_token_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/v1/mfa/resend-code", None, json!({}))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resend_replaces_the_code() {
    let app = TestApp::spawn().await;
    app.register(EMAIL).await;
    let mfa_token = app.login(EMAIL).await;

    let response = app
        .post(
            "/api/v1/mfa/resend-code",
            None,
            json!({ "mfa_token": mfa_token }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.email.sent_count(), 2);
    let new_token = response.body["mfa_token"].as_str().unwrap().to_string();

    let verified = app.verify(&new_token, &app.last_code(EMAIL)).await;
    assert_eq!(verified.status, StatusCode::OK);
}

#[tokio::test]
async fn mfa_endpoints_are_rate_limited_per_client_address() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.mfa_attempts = 2;
        config.rate_limit.mfa_window_seconds = 3600;
    })
    .await;

    let mut statuses = Vec::new();
    for i in 0..3 {
        // A fresh forwarded address each time must not buy a fresh bucket.
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/v1/mfa/resend-code")
            .header("x-forwarded-for", format!("203.0.113.{}", i))
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        statuses.push(app.send(request).await.status);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

//! Incident reports: filing, visibility and officer triage.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};

fn report() -> Value {
    json!({
        "title": "Broken streetlight",
        "description": "Dark corner on Elm St. Call me at 555-123-4567 or casey@example.com",
        "category": "infrastructure",
        "location": "Elm St & 3rd Ave",
    })
}

#[tokio::test]
async fn filing_a_report_scrubs_contact_details() {
    let app = TestApp::spawn().await;
    let citizen = app.citizen().await;

    let response = app
        .post("/api/v1/reports", Some(&citizen.access_token), report())
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["status"], "SUBMITTED");
    assert_eq!(response.body["user_id"], citizen.user_id.as_str());
    let description = response.body["description"].as_str().unwrap();
    assert!(!description.contains("555-123-4567"));
    assert!(!description.contains("casey@example.com"));
    assert!(description.starts_with("Dark corner on Elm St."));
}

#[tokio::test]
async fn citizens_only_see_their_own_reports() {
    let app = TestApp::spawn().await;
    let alice = app.citizen().await;
    let bob = app.citizen().await;
    let officer = app.officer().await;

    let filed = app
        .post("/api/v1/reports", Some(&alice.access_token), report())
        .await;
    let id = filed.body["id"].as_str().unwrap();
    app.post("/api/v1/reports", Some(&bob.access_token), report())
        .await;

    let own = app.get("/api/v1/reports", &alice.access_token).await;
    assert_eq!(own.body.as_array().unwrap().len(), 1);

    let all = app.get("/api/v1/reports", &officer.access_token).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let uri = format!("/api/v1/reports/{}", id);
    assert_eq!(app.get(&uri, &bob.access_token).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&uri, &officer.access_token).await.status, StatusCode::OK);
}

#[tokio::test]
async fn officers_triage_reports() {
    let app = TestApp::spawn().await;
    let citizen = app.citizen().await;
    let officer = app.officer().await;

    let filed = app
        .post("/api/v1/reports", Some(&citizen.access_token), report())
        .await;
    let uri = format!("/api/v1/reports/{}/status", filed.body["id"].as_str().unwrap());

    let denied = app
        .request(
            Method::PATCH,
            &uri,
            Some(&citizen.access_token),
            Some(json!({ "status": "RESOLVED" })),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let updated = app
        .request(
            Method::PATCH,
            &uri,
            Some(&officer.access_token),
            Some(json!({ "status": "IN_REVIEW" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["status"], "IN_REVIEW");
    assert_eq!(updated.body["assigned_officer_id"], officer.user_id.as_str());

    let in_review = app
        .get("/api/v1/reports?status=IN_REVIEW", &officer.access_token)
        .await;
    assert_eq!(in_review.body.as_array().unwrap().len(), 1);
    let submitted = app
        .get("/api/v1/reports?status=SUBMITTED", &officer.access_token)
        .await;
    assert!(submitted.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_the_reporter_may_delete() {
    let app = TestApp::spawn().await;
    let citizen = app.citizen().await;
    let other = app.citizen().await;

    let filed = app
        .post("/api/v1/reports", Some(&citizen.access_token), report())
        .await;
    let uri = format!("/api/v1/reports/{}", filed.body["id"].as_str().unwrap());

    let denied = app
        .request(Method::DELETE, &uri, Some(&other.access_token), None)
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let deleted = app
        .request(Method::DELETE, &uri, Some(&citizen.access_token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, &citizen.access_token).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_report_is_not_found() {
    let app = TestApp::spawn().await;
    let citizen = app.citizen().await;

    let response = app
        .get(
            &format!("/api/v1/reports/{}", uuid::Uuid::new_v4()),
            &citizen.access_token,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

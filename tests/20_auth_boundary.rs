// Router-level checks that never reach the database: authentication,
// role gating and request validation all answer before any query runs.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use showcase_api::types::Role;

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let (state, config) = common::lazy_state();
    let response = showcase_api::app(state, &config).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_form(uri: &str, token: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", common::BOUNDARY),
        )
        .body(Body::from(common::multipart_body(fields)))
        .unwrap()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (status, body) = send(get("/api/projects/1", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let (status, _) = send(get("/api/projects/1", Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let claims = showcase_api::auth::Claims::new(1, Role::Admin, 1);
    let forged = showcase_api::auth::generate_jwt(&claims, "some-other-secret").unwrap();
    let (status, _) = send(get("/api/admin/projects/1/reviews", Some(&forged))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_reach_admin_routes() {
    let student = common::token(7, Role::Student);
    let (status, body) = send(post_json(
        "/api/admin/projects/1/review",
        &student,
        serde_json::json!({ "status": "approved" }),
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn unknown_review_status_is_a_field_error() {
    let admin = common::token(1, Role::Admin);
    let (status, body) = send(post_json(
        "/api/admin/projects/1/review",
        &admin,
        serde_json::json!({ "status": "archived" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["status"].is_string());
}

#[tokio::test]
async fn students_cannot_submit_for_someone_else() {
    let student = common::token(7, Role::Student);
    let (status, _) = send(post_form(
        "/api/users/8/projects",
        &student,
        &[("title", "Demo"), ("type", "coursework")],
    ))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn incomplete_submission_lists_every_missing_field() {
    let student = common::token(7, Role::Student);
    let request = post_form("/api/users/7/projects", &student, &[("title", "Demo")]);
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let errors = &body["field_errors"];
    for field in ["description", "type", "study_year", "year", "semester"] {
        assert!(errors[field].is_string(), "missing error for {}", field);
    }
    assert!(errors["title"].is_null());
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let (status, body) = send(get("/health", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["status"], "degraded");
}

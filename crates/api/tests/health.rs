//! Health endpoint and middleware behaviour that needs no database.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use storyflam_core::locking::MemoryLockStore;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let app = common::build_test_app(Arc::new(MemoryLockStore::new()));
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn response_carries_request_id() {
    let app = common::build_test_app(Arc::new(MemoryLockStore::new()));
    let response = get(app, "/api/v1/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header should be set")
        .to_str()
        .unwrap();
    assert_eq!(id.len(), 36, "x-request-id should be a UUID string");
}

#[tokio::test]
async fn cors_preflight_allows_editor_origin() {
    let app = common::build_test_app(Arc::new(MemoryLockStore::new()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/stories/00000000-0000-0000-0000-000000000000/lock")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "PUT")
        .header("Access-Control-Request-Headers", "authorization")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    let methods = headers
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("PUT"), "Allow-Methods should contain PUT, got: {methods}");
    assert!(!methods.contains("PATCH"), "no route takes PATCH, got: {methods}");
}

#[tokio::test]
async fn cors_response_exposes_request_id() {
    let app = common::build_test_app(Arc::new(MemoryLockStore::new()));
    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    let exposed = response
        .headers()
        .get("access-control-expose-headers")
        .expect("expose-headers should be set for the editor origin")
        .to_str()
        .unwrap();
    assert!(exposed.contains("x-request-id"), "got: {exposed}");
}

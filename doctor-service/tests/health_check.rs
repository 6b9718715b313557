mod common;

use axum::http::StatusCode;
use common::{test_config, TestApp};
use doctor_service::services::InMemoryStore;
use doctor_service::Application;
use std::sync::Arc;

#[tokio::test]
async fn health_check_is_not_gated() {
    let app = TestApp::spawn();

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["service"], "doctor-service");
}

#[tokio::test]
async fn readiness_reflects_store_health() {
    let app = TestApp::spawn();

    let response = app.get("/ready", None).await;
    assert_eq!(response.status, StatusCode::OK);

    app.store.set_unreachable(true);
    let response = app.get("/ready", None).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    app.store.set_unreachable(false);
    let response = app.get("/ready", None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn liveness_ignores_store_health() {
    let app = TestApp::spawn();
    app.store.set_unreachable(true);

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn();

    let response = app.get("/api/doctors/appointments", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn application_binds_an_ephemeral_port() {
    let app = Application::build_with_store(test_config(), Arc::new(InMemoryStore::new()))
        .await
        .expect("Failed to build application");

    assert_ne!(app.port(), 0);
}

#[tokio::test]
async fn metrics_endpoint_serves_plain_text() {
    let app = TestApp::spawn();

    let response = app.get("/metrics", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["db_ok"], true);
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = TestApp::new().await;
    let response = app.raw_get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

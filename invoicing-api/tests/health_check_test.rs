mod common;

use common::TestApp;
use invoicing_api::services::init_metrics;
use reqwest::{Client, StatusCode};
use std::sync::Once;

static INIT_METRICS: Once = Once::new();

fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(|| {
        init_metrics().ok();
    });
}

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "invoicing-api");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = Client::new()
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_format() {
    ensure_metrics_initialized();
    let app = TestApp::spawn().await;

    let response = Client::new()
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .expect("Missing content-type header")
        .to_str()
        .expect("Invalid content-type")
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn unknown_routes_get_the_not_found_envelope() {
    let app = TestApp::spawn().await;

    for path in ["/nope", "/api/v1/nope"] {
        let response = Client::new()
            .get(format!("{}{}", app.address, path))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route not found");
    }
}

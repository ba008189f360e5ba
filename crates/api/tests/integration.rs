//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server.
//! Slack and CircleCI are `wiremock` fakes.
//!
//! ```bash
//! cargo test -p slack-api --test integration
//! ```

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slack_api::routes::create_router;
use slack_api::state::AppState;
use slack_common::config::AppConfig;

// ============================================================
// Helpers
// ============================================================

fn test_config(circleci_host: &str) -> AppConfig {
    AppConfig {
        circleci_api_host: circleci_host.to_string(),
        sleep_interval_secs: 0,
        ..AppConfig::default()
    }
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/notification")
        .body(body.into())
        .unwrap()
}

async fn slack(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

async fn received_json(server: &MockServer, count: usize) -> Vec<Value> {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let requests = server.received_requests().await.unwrap_or_default();
            if requests.len() >= count {
                return requests
                    .iter()
                    .map(|r| serde_json::from_slice(&r.body).unwrap())
                    .collect();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for requests")
}

// ============================================================
// Health
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(AppState::from_config(&test_config("http://127.0.0.1:1")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"UP");
}

// ============================================================
// Notification
// ============================================================

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let app = create_router(AppState::from_config(&test_config("http://127.0.0.1:1")));

    let response = app.oneshot(post("{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_webhook_is_bad_request() {
    let app = create_router(AppState::from_config(&test_config("http://127.0.0.1:1")));

    let response = app
        .oneshot(post(json!({"text": "hello"}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_immediate_notification_is_ok() {
    let hook = slack(200).await;
    let app = create_router(AppState::from_config(&test_config("http://127.0.0.1:1")));

    // No content type on purpose
    let body = json!({
        "text": "Hello {{Name}}",
        "color": "green",
        "channel": "general",
        "title": "Greeting",
        "webhook": format!("{}/hook", hook.uri())
    });
    let response = app.oneshot(post(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bodies = received_json(&hook, 1).await;
    let attachment = &bodies[0]["attachments"][0];
    assert_eq!(attachment["color"], "green");
    assert_eq!(attachment["title"], "Greeting");
    assert_eq!(bodies[0]["channel"], "general");
}

#[tokio::test]
async fn test_default_webhook_from_config() {
    let hook = slack(200).await;
    let config = AppConfig {
        default_webhook: Some(format!("{}/hook", hook.uri())),
        ..test_config("http://127.0.0.1:1")
    };
    let app = create_router(AppState::from_config(&config));

    let response = app
        .oneshot(post(json!({"text": "hi"}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bodies = received_json(&hook, 1).await;
    assert_eq!(bodies[0]["attachments"][0]["text"], "hi");
}

#[tokio::test]
async fn test_rejected_webhook_is_bad_request() {
    let hook = slack(500).await;
    let app = create_router(AppState::from_config(&test_config("http://127.0.0.1:1")));

    let response = app
        .oneshot(post(
            json!({"webhook": format!("{}/hook", hook.uri())}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_build_notification_is_accepted() {
    let ci = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/workflow/1234"))
        .and(header("Circle-Token", "dummy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project_slug": "gh/devatherock/email-sender",
            "pipeline_number": 292,
            "status": "success"
        })))
        .mount(&ci)
        .await;
    let hook = slack(200).await;
    let app = create_router(AppState::from_config(&test_config(&ci.uri())));

    let body = json!({
        "webhook": format!("{}/hook", hook.uri()),
        "build_id": "1234",
        "token": "dummy"
    });
    let response = app.oneshot(post(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.is_empty());

    let bodies = received_json(&hook, 1).await;
    assert_eq!(bodies[0]["attachments"][0]["color"], "#33ad7f");
}

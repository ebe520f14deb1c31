//! Integration tests for the lead notification endpoint.
//!
//! Exercises the full Axum router with an in-memory store and a recording
//! delivery double: success-shaped outcomes for every benign case, error
//! cooldown on delivery failure, end-to-end token issuance, and the admin
//! inspection surface.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use dispatch_api::{create_api_router, AppConfig, RecordingDelivery};
use dispatch_storage::MemoryStore;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

struct TestHarness {
    app: Router,
    delivery: Arc<RecordingDelivery>,
}

fn test_harness() -> TestHarness {
    let config = AppConfig {
        admin_token: Some("test-admin".to_string()),
        ..AppConfig::default()
    };
    let delivery = Arc::new(RecordingDelivery::new());
    let app = create_api_router(
        Arc::new(MemoryStore::new()),
        Arc::clone(&delivery) as Arc<dyn dispatch_api::DeliveryPipeline>,
        &config,
    );
    TestHarness { app, delivery }
}

async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get_with_bearer(
    app: &Router,
    uri: &str,
    bearer: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn notify_body(conversation_id: &str) -> serde_json::Value {
    json!({
        "conversation_id": conversation_id,
        "reason": "idle",
        "summary": "Visitor asked about pricing",
    })
}

#[tokio::test]
async fn test_first_notify_delivers_then_dedupes() {
    let harness = test_harness();

    let (status, body) = post_json(&harness.app, "/api/v1/leads/notify", notify_body("conv-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["outcome"], "delivered");

    // A retry from a second tab is a benign success, not a duplicate send.
    let (status, body) = post_json(&harness.app, "/api/v1/leads/notify", notify_body("conv-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["outcome"], "already_handled");

    assert_eq!(harness.delivery.delivered_count(), 1);
}

#[tokio::test]
async fn test_unrelated_conversations_do_not_contend() {
    let harness = test_harness();

    let (_, body) = post_json(&harness.app, "/api/v1/leads/notify", notify_body("conv-a")).await;
    assert_eq!(body["outcome"], "delivered");
    let (_, body) = post_json(&harness.app, "/api/v1/leads/notify", notify_body("conv-b")).await;
    assert_eq!(body["outcome"], "delivered");

    assert_eq!(harness.delivery.delivered_count(), 2);
}

#[tokio::test]
async fn test_blank_fields_are_rejected() {
    let harness = test_harness();

    let (status, body) = post_json(
        &harness.app,
        "/api/v1/leads/notify",
        json!({"conversation_id": "  ", "reason": "idle", "summary": "s"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_field");

    let (status, _) = post_json(
        &harness.app,
        "/api/v1/leads/notify",
        json!({"conversation_id": "conv-1", "reason": "", "summary": "s"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delivery_failure_is_502_then_cooldown_defers() {
    let harness = test_harness();
    harness.delivery.set_failing(true);

    let (status, body) = post_json(&harness.app, "/api/v1/leads/notify", notify_body("conv-1")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "delivery_failed");

    // Inside the error cooldown the conversation is blocked, reported as a
    // benign deferral.
    harness.delivery.set_failing(false);
    let (status, body) = post_json(&harness.app, "/api/v1/leads/notify", notify_body("conv-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "deferred");
    assert_eq!(harness.delivery.delivered_count(), 0);
}

#[tokio::test]
async fn test_notify_with_phone_issues_resolvable_link_token() {
    let harness = test_harness();

    let (status, body) = post_json(
        &harness.app,
        "/api/v1/leads/notify",
        json!({
            "conversation_id": "conv-1",
            "reason": "manual",
            "summary": "Visitor left a callback number",
            "visitor_phone": "+14085550100",
            "reply_body": "Hi! Thanks for reaching out.",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "delivered");
    let token = body["text_link_token"].as_str().expect("token issued");

    // The issued token resolves through the public endpoint.
    let (status, body) = get_with_bearer(
        &harness.app,
        &format!("/api/v1/tokens/resolve?token={}", token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["to"], "+14085550100");
    assert_eq!(body["body"], "Hi! Thanks for reaching out.");
}

#[tokio::test]
async fn test_admin_lease_inspection_requires_credential() {
    let harness = test_harness();
    post_json(&harness.app, "/api/v1/leads/notify", notify_body("conv-1")).await;

    let (status, _) = get_with_bearer(&harness.app, "/api/v1/admin/leases/conv-1", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        get_with_bearer(&harness.app, "/api/v1/admin/leases/conv-1", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        get_with_bearer(&harness.app, "/api/v1/admin/leases/conv-1", Some("test-admin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation_id"], "conv-1");
    assert_eq!(body["status"], "sent");

    let (status, _) =
        get_with_bearer(&harness.app, "/api/v1/admin/leases/conv-x", Some("test-admin")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let harness = test_harness();

    let (status, _) = get_with_bearer(&harness.app, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);

    let response = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/ping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

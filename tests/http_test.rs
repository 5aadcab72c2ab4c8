//! HTTP routes driven through the router without a listener.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use toolgate::{build_router, config::GatewayConfig, AppState};
use tower::ServiceExt;

fn router_with(config: GatewayConfig) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    (build_router(Arc::clone(&state)), state)
}

fn get(uri: &str, auth: Option<&str>, device: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    if let Some(device) = device {
        builder = builder.header("x-device-id", device);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_error_payload(body: &Value) {
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert!(object["error"].is_string());
    assert!(object["correlationId"].is_string());
    assert!(object["timestamp"].is_string());
}

#[tokio::test]
async fn test_health() {
    let (router, _) = router_with(GatewayConfig::default());
    let response = router.oneshot(get("/health", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_manifest_requires_credential() {
    let (router, _) = router_with(GatewayConfig::default());
    let response = router
        .oneshot(get("/v1/tools/manifest", None, Some("ops-tablet")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_error_payload(&json_body(response).await);
}

#[tokio::test]
async fn test_manifest_rejects_wrong_prefix() {
    let (router, _) = router_with(GatewayConfig::default());
    let response = router
        .oneshot(get("/v1/tools/manifest", Some("Bearer sk_123"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_error_payload(&json_body(response).await);
}

#[tokio::test]
async fn test_manifest_for_operator() {
    let (router, _) = router_with(GatewayConfig::default());
    let response = router
        .oneshot(get(
            "/v1/tools/manifest",
            Some("Bearer dev_tablet"),
            Some("ops-tablet"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["meta"]["device_id"], "ops-tablet");
    assert_eq!(body["meta"]["trust_tier"], "OPERATOR");
    assert_eq!(body["meta"]["count"], 5);
    let names: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(!names.contains(&"delete_record"));
    assert!(body["tools"][0]["parameters"].is_object());
}

#[tokio::test]
async fn test_unknown_device_gets_public_manifest() {
    let (router, _) = router_with(GatewayConfig::default());
    let response = router
        .oneshot(get("/v1/tools/manifest", Some("Bearer dev_anon"), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["meta"]["device_id"], "unknown");
    assert_eq!(body["meta"]["trust_tier"], "PUBLIC");
    assert_eq!(body["tools"][0]["name"], "get_device_status");
}

#[tokio::test]
async fn test_realtime_rejects_before_upgrade() {
    let (router, state) = router_with(GatewayConfig::default());
    let response = router
        .oneshot(get("/v1/realtime", None, Some("ops-tablet")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.gateway.registry().count(), 0);
}

#[tokio::test]
async fn test_realtime_at_capacity_is_unavailable() {
    let mut config = GatewayConfig::default();
    config.relay.max_connections = 1;
    let (router, state) = router_with(config);
    assert!(state.gateway.registry().try_reserve());

    let response = router
        .oneshot(get("/v1/realtime", Some("Bearer dev_x"), Some("ops-tablet")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_error_payload(&json_body(response).await);
    assert_eq!(state.gateway.metrics().snapshot().rejected_connections, 1);
}

#[tokio::test]
async fn test_non_upgrade_request_releases_slot() {
    let (router, state) = router_with(GatewayConfig::default());
    let response = router
        .oneshot(get("/v1/realtime", Some("Bearer dev_x"), Some("ops-tablet")))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(state.gateway.registry().count(), 0);
}

#[tokio::test]
async fn test_metrics_snapshot() {
    let (router, _) = router_with(GatewayConfig::default());
    let response = router.oneshot(get("/v1/metrics", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["ledger_records"], 0);
    assert_eq!(body["pipeline"]["executions"], 0);
    assert_eq!(body["connections"]["max"], 1000);
}

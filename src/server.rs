//! HTTP surface.

use std::{future::Future, sync::Arc};

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{config::GatewayConfig, error, realtime::RealtimeGateway};

pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub gateway: Arc<RealtimeGateway>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let gateway = Arc::new(RealtimeGateway::from_config(&config));
        Self::with_gateway(config, gateway)
    }

    pub fn with_gateway(config: GatewayConfig, gateway: Arc<RealtimeGateway>) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/tools/manifest", get(tool_manifest))
        .route("/v1/metrics", get(metrics))
        .route("/v1/realtime", get(realtime_ws))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves, then cancel live connections.
pub async fn serve<F>(state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "Gateway listening");

    let registry = Arc::clone(state.gateway.registry());
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutdown requested, closing realtime connections");
            registry.cancel_all();
        })
        .await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// `GET /v1/tools/manifest`: tools the calling device may see.
async fn tool_manifest(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match state.gateway.authenticate(&headers) {
        Ok(device) => Json(state.gateway.manifest_for(&device)).into_response(),
        Err(e) => error::auth_rejected(&e),
    }
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let gateway = &state.gateway;
    let ledger_records = match gateway.orchestrator().ledger().len().await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Failed to read ledger size");
            return error::internal_error("Metrics unavailable");
        }
    };

    Json(json!({
        "pipeline": gateway.metrics().snapshot(),
        "ledger_records": ledger_records,
        "audit_entries": gateway.orchestrator().audit_log().len(),
        "connections": {
            "active": gateway.registry().count(),
            "max": gateway.registry().max_connections(),
        },
    }))
    .into_response()
}

/// `GET /v1/realtime`: authenticate, claim a slot, then upgrade.
async fn realtime_ws(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let gateway = Arc::clone(&state.gateway);

    let device = match gateway.authenticate(&headers) {
        Ok(device) => device,
        Err(e) => {
            warn!(error = %e, "Realtime handshake rejected");
            return error::auth_rejected(&e);
        }
    };

    let registry = Arc::clone(gateway.registry());
    if !registry.try_reserve() {
        gateway.metrics().record_connection_rejected();
        return error::service_unavailable("Connection limit reached");
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            registry.release();
            return rejection.into_response();
        }
    };

    ws.on_failed_upgrade(move |e| {
        warn!(error = %e, "WebSocket upgrade failed");
        registry.release();
    })
    .on_upgrade(move |socket| async move {
        gateway.serve_device(socket, device).await;
    })
}

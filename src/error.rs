//! Boundary error payloads.
//!
//! Every error that leaves the gateway, whether as an HTTP rejection or as a
//! failed tool output injected into the conversation, has the same fixed
//! shape. Internal detail stays in the logs, keyed by the correlation id.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use device_auth::AuthError;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error: String,
    pub correlation_id: String,
    pub timestamp: String,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

pub fn create_error(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = ErrorPayload::new(message);
    debug!(
        status = status.as_u16(),
        correlation_id = %payload.correlation_id,
        error = %payload.error,
        "Rejecting request"
    );
    (status, Json(payload)).into_response()
}

pub fn auth_rejected(err: &AuthError) -> Response {
    create_error(err.status_code(), err.to_string())
}

pub fn service_unavailable(message: impl Into<String>) -> Response {
    create_error(StatusCode::SERVICE_UNAVAILABLE, message)
}

pub fn internal_error(message: impl Into<String>) -> Response {
    create_error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

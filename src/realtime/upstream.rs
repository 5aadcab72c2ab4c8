//! Upstream realtime session connect.

use std::time::Duration;

use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest,
    http::{header::AUTHORIZATION, HeaderValue},
};
use tracing::{debug, info};

use super::transport::{RelayError, Transport};
use crate::config::UpstreamConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Open the upstream WebSocket, authenticating with the configured key.
pub async fn connect_upstream(config: &UpstreamConfig) -> Result<Transport, RelayError> {
    let url = config
        .connect_url()
        .map_err(|e| RelayError::Connect(e.to_string()))?;

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| RelayError::Connect(e.to_string()))?;
    let headers = request.headers_mut();
    if let Some(key) = &config.api_key {
        let value = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| RelayError::Connect("api key is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, value);
    }
    headers.insert("openai-beta", HeaderValue::from_static("realtime=v1"));

    debug!(host = url.host_str().unwrap_or_default(), "Connecting upstream");
    let (socket, response) =
        tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| RelayError::Connect("timed out".to_string()))?
            .map_err(|e| RelayError::Connect(e.to_string()))?;
    info!(status = response.status().as_u16(), "Upstream session connected");

    Ok(Transport::from_upstream(socket))
}

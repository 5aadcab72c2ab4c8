//! Device ↔ upstream relay with tool-call interception.
//!
//! One task per connection runs a sequential dispatch loop. The only
//! suspension points that can hold up forwarding are the upstream connect
//! and a tool execution; while a tool runs, upstream reading pauses and
//! device frames wait in the bounded outbound queue, so the result pair
//! always reaches upstream before anything that followed the call.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use device_auth::{AuthError, AuthorizationKernel, DeviceAuthenticator, DeviceProfile};
use futures::{SinkExt, StreamExt};
use http::HeaderMap;
use realtime_protocol::RealtimeClientEvent;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tool_pipeline::{
    ExecutionError, InMemoryLedger, Orchestrator, PipelineMetrics, StubToolRunner, ToolCatalog,
    ToolExecutionInput, ToolExecutionResult, ToolManifest, ToolManifestFilter, ToolRunner,
};
use tracing::{debug, info, warn};

use super::{
    connection::ConnectionState,
    interceptor::{parse_tool_call, result_events, ToolCallRequest},
    registry::{ConnectionEntry, ConnectionPhase, ConnectionRegistry},
    transport::{Frame, RelayError, Transport},
    upstream::connect_upstream,
};
use crate::{
    config::{GatewayConfig, RelayConfig, SessionSettings, UpstreamConfig},
    error::ErrorPayload,
};

/// Why a relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    DeviceClosed,
    UpstreamClosed,
    IdleTimeout,
    Shutdown,
    DownstreamError,
    UpstreamError,
    UpstreamUnavailable,
}

pub struct RealtimeGateway {
    authenticator: DeviceAuthenticator,
    manifest: ToolManifestFilter,
    orchestrator: Arc<Orchestrator>,
    registry: Arc<ConnectionRegistry>,
    upstream: UpstreamConfig,
    session: SessionSettings,
    relay: RelayConfig,
}

impl RealtimeGateway {
    pub fn new(
        config: &GatewayConfig,
        authenticator: DeviceAuthenticator,
        manifest: ToolManifestFilter,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            authenticator,
            manifest,
            orchestrator,
            registry: Arc::new(ConnectionRegistry::with_capacity(config.relay.max_connections)),
            upstream: config.upstream.clone(),
            session: config.session.clone(),
            relay: config.relay.clone(),
        }
    }

    /// Wire every component from configuration around the given runner.
    pub fn with_runner(config: &GatewayConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let kernel = Arc::new(AuthorizationKernel::default());
        let authenticator =
            DeviceAuthenticator::new(config.auth.clone(), Arc::new(config.device_directory()));
        let manifest = ToolManifestFilter::new(Arc::new(ToolCatalog::builtin()), kernel.clone());
        let orchestrator = Orchestrator::new(kernel, Arc::new(InMemoryLedger::new()), runner);
        Self::new(config, authenticator, manifest, Arc::new(orchestrator))
    }

    /// Configuration wiring with the stub runner.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::with_runner(config, Arc::new(StubToolRunner))
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        self.orchestrator.metrics()
    }

    /// Authenticate a handshake under a fresh connection id.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<DeviceProfile, AuthError> {
        let connection_id = uuid::Uuid::new_v4().to_string();
        self.authenticator.authenticate(headers, &connection_id)
    }

    pub fn manifest_for(&self, device: &DeviceProfile) -> ToolManifest {
        self.manifest.filter_manifest(device)
    }

    /// `session.update` carrying the device's filtered tools.
    pub fn session_init(&self, device: &DeviceProfile) -> RealtimeClientEvent {
        let tools = self.manifest_for(device).to_definitions();
        RealtimeClientEvent::session_update(self.session.session_config(tools))
    }

    /// Record a connection whose slot was reserved before the upgrade.
    pub fn register(&self, device: &DeviceProfile) -> ConnectionEntry {
        self.metrics().record_connection_opened();
        self.registry.register(device)
    }

    /// Serve an upgraded device socket: connect upstream, then relay.
    pub async fn serve_device(&self, socket: WebSocket, device: DeviceProfile) -> CloseReason {
        let entry = self.register(&device);
        let mut downstream = Transport::from_device(socket);

        let upstream = match connect_upstream(&self.upstream).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(connection_id = %entry.connection_id, error = %e, "Upstream unavailable");
                let payload = ErrorPayload::new("Upstream realtime service unavailable");
                if let Ok(text) = serde_json::to_string(&payload) {
                    let _ = downstream.sink.send(Frame::Text(text)).await;
                }
                let _ = downstream.sink.close().await;
                self.release(&entry);
                return CloseReason::UpstreamUnavailable;
            }
        };

        self.run_connection(Arc::new(device), entry, downstream, upstream)
            .await
    }

    /// Relay between already-open transports until either side ends.
    pub async fn run_connection(
        &self,
        device: Arc<DeviceProfile>,
        entry: ConnectionEntry,
        downstream: Transport,
        upstream: Transport,
    ) -> CloseReason {
        let state = ConnectionState::new(
            Arc::clone(&device),
            self.relay.ping_interval(),
            self.relay.idle_timeout(),
            self.relay.outbound_queue_capacity,
        );
        let mut relay = Relay {
            gateway: self,
            state,
            downstream,
            upstream,
            cancel: entry.cancel_token.clone(),
        };

        let reason = match relay.send_session_init().await {
            Ok(()) => {
                self.registry
                    .set_phase(&entry.connection_id, ConnectionPhase::Proxying);
                info!(
                    connection_id = %entry.connection_id,
                    device_id = %device.device_id(),
                    trust_tier = %device.trust_tier(),
                    "Realtime session proxying"
                );
                relay.run().await
            }
            Err(e) => {
                warn!(connection_id = %entry.connection_id, error = %e, "Session init failed");
                CloseReason::UpstreamError
            }
        };

        self.registry
            .set_phase(&entry.connection_id, ConnectionPhase::Closing);
        relay.teardown().await;
        self.release(&entry);
        info!(connection_id = %entry.connection_id, reason = ?reason, "Realtime session closed");
        reason
    }

    fn release(&self, entry: &ConnectionEntry) {
        if self.registry.remove(&entry.connection_id).is_some() {
            self.metrics().record_connection_closed();
        }
    }
}

impl std::fmt::Debug for RealtimeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeGateway")
            .field("upstream", &self.upstream)
            .field("relay", &self.relay)
            .field("connections", &self.registry.count())
            .finish_non_exhaustive()
    }
}

struct Relay<'a> {
    gateway: &'a RealtimeGateway,
    state: ConnectionState,
    downstream: Transport,
    upstream: Transport,
    cancel: CancellationToken,
}

impl Relay<'_> {
    async fn send_session_init(&mut self) -> Result<(), RelayError> {
        let event = self.gateway.session_init(self.state.device());
        let text = event
            .to_json()
            .map_err(|e| RelayError::Upstream(e.to_string()))?;
        self.upstream.sink.send(Frame::Text(text)).await
    }

    async fn run(&mut self) -> CloseReason {
        loop {
            let idle = tokio::time::sleep_until(self.state.idle_deadline());

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return CloseReason::Shutdown,

                _ = idle => {
                    info!(connection_id = %self.state.connection_id(), "Idle timeout");
                    return CloseReason::IdleTimeout;
                }

                msg = self.upstream.stream.next() => {
                    if let Some(reason) = self.on_upstream(msg).await {
                        return reason;
                    }
                }

                msg = self.downstream.stream.next() => {
                    if let Some(reason) = self.on_downstream(msg).await {
                        return reason;
                    }
                }

                _ = self.state.ping_tick() => {
                    if self.downstream.sink.send(Frame::Ping(Vec::new())).await.is_err() {
                        return CloseReason::DownstreamError;
                    }
                }
            }
        }
    }

    async fn on_upstream(&mut self, msg: Option<Result<Frame, RelayError>>) -> Option<CloseReason> {
        let frame = match msg {
            None | Some(Ok(Frame::Close)) => return Some(CloseReason::UpstreamClosed),
            Some(Err(e)) => {
                warn!(connection_id = %self.state.connection_id(), error = %e, "Upstream read failed");
                return Some(CloseReason::UpstreamError);
            }
            Some(Ok(frame)) => frame,
        };
        self.state.touch();

        match frame {
            Frame::Text(text) => {
                let call = serde_json::from_str::<Value>(&text)
                    .ok()
                    .and_then(|event| parse_tool_call(&event, self.state.device().device_id()));

                if self.downstream.sink.send(Frame::Text(text)).await.is_err() {
                    return Some(CloseReason::DownstreamError);
                }
                match call {
                    Some(call) => self.execute_call(call).await,
                    None => None,
                }
            }
            Frame::Binary(data) => {
                if self.downstream.sink.send(Frame::Binary(data)).await.is_err() {
                    return Some(CloseReason::DownstreamError);
                }
                None
            }
            // Pings are answered by the socket library.
            Frame::Ping(_) | Frame::Pong(_) | Frame::Close => None,
        }
    }

    async fn on_downstream(
        &mut self,
        msg: Option<Result<Frame, RelayError>>,
    ) -> Option<CloseReason> {
        match msg {
            None | Some(Ok(Frame::Close)) => Some(CloseReason::DeviceClosed),
            Some(Err(e)) => {
                debug!(connection_id = %self.state.connection_id(), error = %e, "Device read failed");
                Some(CloseReason::DownstreamError)
            }
            Some(Ok(frame)) => {
                self.state.touch();
                if frame.is_data() && self.upstream.sink.send(frame).await.is_err() {
                    return Some(CloseReason::UpstreamError);
                }
                None
            }
        }
    }

    /// Run one tool call to completion (or timeout), holding back device
    /// frames, then emit the result pair and flush what was held back.
    async fn execute_call(&mut self, call: ToolCallRequest) -> Option<CloseReason> {
        let device = Arc::clone(self.state.device());
        info!(
            connection_id = %self.state.connection_id(),
            tool = %call.tool_name,
            call_id = %call.call_id,
            "Intercepted tool call"
        );

        let call_id = call.call_id.clone();
        let input = ToolExecutionInput {
            tool_name: call.tool_name,
            args: call.args,
            device,
            idempotency_key: call.idempotency_key,
            call_id: call.call_id,
        };
        let orchestrator = Arc::clone(&self.gateway.orchestrator);
        // Detached: on timeout the task keeps running and settles the ledger.
        let handle = tokio::spawn(async move { orchestrator.execute_tool(input).await });

        let timeout = self.gateway.relay.execution_timeout();
        let execution = tokio::time::timeout(timeout, handle);
        tokio::pin!(execution);

        let mut pending_close = None;
        let result = loop {
            tokio::select! {
                biased;

                outcome = &mut execution => break match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        warn!(call_id = %call_id, error = %e, "Tool execution task failed");
                        ToolExecutionResult::failed(
                            call_id.as_str(),
                            &ExecutionError::Runner("tool execution aborted".to_string()),
                        )
                    }
                    Err(_) => {
                        self.gateway.metrics().record_timeout();
                        warn!(call_id = %call_id, timeout_ms = self.gateway.relay.execution_timeout_ms, "Tool execution timed out");
                        ToolExecutionResult::failed(
                            call_id.as_str(),
                            &ExecutionError::Timeout(self.gateway.relay.execution_timeout_ms),
                        )
                    }
                },

                _ = self.cancel.cancelled(), if pending_close.is_none() => {
                    pending_close = Some(CloseReason::Shutdown);
                }

                msg = self.downstream.stream.next(), if pending_close.is_none() => match msg {
                    None | Some(Ok(Frame::Close)) => pending_close = Some(CloseReason::DeviceClosed),
                    Some(Err(_)) => pending_close = Some(CloseReason::DownstreamError),
                    Some(Ok(frame)) => {
                        self.state.touch();
                        if frame.is_data() && !self.state.queue_mut().push(frame) {
                            self.gateway.metrics().record_dropped_frame();
                            warn!(
                                connection_id = %self.state.connection_id(),
                                capacity = self.state.queue().capacity(),
                                "Outbound queue full, dropping device frame"
                            );
                        }
                    }
                },

                _ = self.state.ping_tick(), if pending_close.is_none() => {
                    if self.downstream.sink.send(Frame::Ping(Vec::new())).await.is_err() {
                        pending_close = Some(CloseReason::DownstreamError);
                    }
                }
            }
        };

        if let Err(e) = self.send_result_pair(&result).await {
            warn!(call_id = %call_id, error = %e, "Failed to deliver tool result upstream");
            return Some(CloseReason::UpstreamError);
        }
        // The execution may have outlasted the idle window; the model has not
        // had a chance to answer yet.
        self.state.touch();

        for frame in self.state.queue_mut().drain() {
            if self.upstream.sink.send(frame).await.is_err() {
                return Some(CloseReason::UpstreamError);
            }
        }
        pending_close
    }

    async fn send_result_pair(&mut self, result: &ToolExecutionResult) -> Result<(), RelayError> {
        let [item, resume] = result_events(result);
        for event in [item, resume] {
            let text = event
                .to_json()
                .map_err(|e| RelayError::Upstream(e.to_string()))?;
            self.upstream.sink.feed(Frame::Text(text)).await?;
        }
        self.upstream.sink.flush().await
    }

    async fn teardown(&mut self) {
        let leftover = self.state.teardown();
        if !leftover.is_empty() {
            debug!(
                connection_id = %self.state.connection_id(),
                frames = leftover.len(),
                "Discarded queued frames on teardown"
            );
        }
        let _ = self.upstream.sink.close().await;
        let _ = self.downstream.sink.close().await;
    }
}

//! Gateway configuration.
//!
//! Loaded from an optional YAML file, then overridden by command-line flags.

use std::{fmt, path::Path, time::Duration};

use device_auth::{AuthConfig, DeviceClassification, StaticDeviceDirectory, TrustTier};
use realtime_protocol::{
    AudioFormat, Modality, SessionConfig, ToolChoice, ToolDefinition, TurnDetection, Voice,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub relay: RelayConfig,

    /// Extra device entries merged over the built-in table
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Realtime endpoint (ws:// or wss://)
    #[serde(default = "default_upstream_url")]
    pub url: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Appended as the `model` query parameter when set
    #[serde(default = "default_model")]
    pub model: String,
}

/// Parameters of the session-init message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_instructions")]
    pub instructions: String,

    #[serde(default)]
    pub voice: Voice,

    #[serde(default = "default_modalities")]
    pub modalities: Vec<Modality>,

    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,

    #[serde(default = "default_vad_prefix_padding_ms")]
    pub vad_prefix_padding_ms: u32,

    #[serde(default = "default_vad_silence_duration_ms")]
    pub vad_silence_duration_ms: u32,

    #[serde(default)]
    pub tool_choice: ToolChoice,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Bound on a single tool execution, as seen by the device
    #[serde(default = "default_execution_timeout_ms")]
    pub execution_timeout_ms: u64,

    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub device_id: String,
    pub trust_tier: TrustTier,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOverrides {
    /// Bind address
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port
    #[arg(long)]
    pub port: Option<u16>,

    /// Upstream realtime endpoint
    #[arg(long)]
    pub upstream_url: Option<String>,

    /// Upstream API key
    #[arg(long, env = "UPSTREAM_API_KEY", hide_env_values = true)]
    pub upstream_api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    pub log_json: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upstream_url() -> String {
    "wss://api.openai.com/v1/realtime".to_string()
}

fn default_model() -> String {
    "gpt-4o-realtime-preview".to_string()
}

fn default_instructions() -> String {
    "You are a concise voice assistant. Call a tool only when the user's request needs it."
        .to_string()
}

fn default_modalities() -> Vec<Modality> {
    vec![Modality::Text, Modality::Audio]
}

fn default_vad_threshold() -> f32 {
    0.5
}

fn default_vad_prefix_padding_ms() -> u32 {
    300
}

fn default_vad_silence_duration_ms() -> u32 {
    500
}

fn default_execution_timeout_ms() -> u64 {
    30_000
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    300 // 5 minutes
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_max_connections() -> usize {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_key: None,
            model: default_model(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            instructions: default_instructions(),
            voice: Voice::default(),
            modalities: default_modalities(),
            vad_threshold: default_vad_threshold(),
            vad_prefix_padding_ms: default_vad_prefix_padding_ms(),
            vad_silence_duration_ms: default_vad_silence_duration_ms(),
            tool_choice: ToolChoice::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            execution_timeout_ms: default_execution_timeout_ms(),
            ping_interval_secs: default_ping_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

impl UpstreamConfig {
    /// Endpoint with the model query parameter applied.
    pub fn connect_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| ConfigError::Invalid(format!("upstream.url '{}': {e}", self.url)))?;
        let has_model = url.query_pairs().any(|(k, _)| k == "model");
        if !self.model.is_empty() && !has_model {
            url.query_pairs_mut().append_pair("model", &self.model);
        }
        Ok(url)
    }
}

impl SessionSettings {
    /// Session-init payload carrying the device's filtered tools.
    pub fn session_config(&self, tools: Vec<ToolDefinition>) -> SessionConfig {
        SessionConfig {
            modalities: Some(self.modalities.clone()),
            instructions: Some(self.instructions.clone()),
            voice: Some(self.voice),
            input_audio_format: Some(AudioFormat::Pcm16),
            output_audio_format: Some(AudioFormat::Pcm16),
            turn_detection: Some(TurnDetection::server_vad(
                self.vad_threshold,
                self.vad_prefix_padding_ms,
                self.vad_silence_duration_ms,
            )),
            tools: Some(tools),
            tool_choice: Some(self.tool_choice),
        }
    }
}

impl RelayConfig {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// File config if a path is given, defaults otherwise.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => Ok(Self::default()),
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(url) = overrides.upstream_url {
            self.upstream.url = url;
        }
        if let Some(key) = overrides.upstream_api_key {
            self.upstream.api_key = Some(key);
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
        if overrides.log_json {
            self.log.json = true;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.relay.execution_timeout_ms == 0 {
            return invalid("relay.execution_timeout_ms must be greater than zero");
        }
        if self.relay.ping_interval_secs == 0 {
            return invalid("relay.ping_interval_secs must be greater than zero");
        }
        if self.relay.idle_timeout_secs == 0 {
            return invalid("relay.idle_timeout_secs must be greater than zero");
        }
        if self.relay.outbound_queue_capacity == 0 {
            return invalid("relay.outbound_queue_capacity must be greater than zero");
        }
        if self.relay.max_connections == 0 {
            return invalid("relay.max_connections must be greater than zero");
        }
        if self.auth.token_prefix.is_empty() {
            return invalid("auth.token_prefix must not be empty");
        }
        if self.auth.device_id_header.trim().is_empty() {
            return invalid("auth.device_id_header must not be empty");
        }
        if http::HeaderName::from_bytes(self.auth.device_id_header.as_bytes()).is_err() {
            return invalid("auth.device_id_header is not a valid header name");
        }
        if !(0.0..=1.0).contains(&self.session.vad_threshold) {
            return invalid("session.vad_threshold must be within [0, 1]");
        }

        let url = self.upstream.connect_url()?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Invalid(format!(
                "upstream.url must use ws:// or wss://, got '{}'",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Built-in device table plus configured entries.
    pub fn device_directory(&self) -> StaticDeviceDirectory {
        self.devices
            .iter()
            .fold(StaticDeviceDirectory::builtin(), |directory, entry| {
                directory.with_device(
                    entry.device_id.clone(),
                    DeviceClassification::new(entry.trust_tier, entry.capabilities.iter().cloned()),
                )
            })
    }
}

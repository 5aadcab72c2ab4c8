//! Session configuration for `session.update` events.
//!
//! Field names follow the beta realtime dialect (`modalities`,
//! `input_audio_format`, `output_audio_format`, `turn_detection`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Session Configuration (Request)
// ============================================================================

/// Session configuration carried by `session.update`.
///
/// All fields are optional - only specified fields will be updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Modalities the model may respond with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    /// System instructions for the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Output voice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,

    /// Format of audio sent by the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<AudioFormat>,

    /// Format of audio produced by the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<AudioFormat>,

    /// Voice activity detection settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Tools available to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    /// How the model should choose tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

// ============================================================================
// Tools
// ============================================================================

/// Tool definition in the upstream function-declaration format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    /// A function tool that the model can call directly
    Function {
        /// The name of the function
        name: String,
        /// A description of what the function does
        description: String,
        /// JSON Schema for the function parameters
        parameters: Value,
    },
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self::Function {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Tool choice mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide whether to call tools
    #[default]
    Auto,
    /// Don't call any tools
    None,
    /// Force the model to call a tool
    Required,
}

// --- Modality ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Audio,
}

// --- Audio Format ---

/// Audio codec for input/output streams. Devices stream PCM16 only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// 16-bit little-endian PCM, 24kHz mono
    #[default]
    Pcm16,
}

// --- Voice ---

/// Built-in output voices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

// --- Turn Detection ---

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnDetection {
    /// Server-side Voice Activity Detection (VAD)
    ServerVad {
        /// Activation threshold (0.0-1.0)
        threshold: f32,
        /// Audio to include before speech starts (ms)
        prefix_padding_ms: u32,
        /// Duration of silence to detect end of speech (ms)
        silence_duration_ms: u32,
    },
}

impl TurnDetection {
    pub fn server_vad(threshold: f32, prefix_padding_ms: u32, silence_duration_ms: u32) -> Self {
        Self::ServerVad {
            threshold,
            prefix_padding_ms,
            silence_duration_ms,
        }
    }
}

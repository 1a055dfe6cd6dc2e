//! OpenAI Realtime API WebSocket message types.
//!
//! All events are JSON-encoded and sent over WebSocket with a `type`
//! discriminator.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Configure the session (instructions, formats, voice)
//! - input_audio_buffer.append - Append base64 audio to the input buffer
//! - input_audio_buffer.commit - Commit the input buffer (turn boundary)
//! - response.create - Request a response for the committed turn
//!
//! Server events (received from server):
//! - response.audio_transcript.delta / .done - Assistant spoken-text transcript
//! - response.audio.delta / .done - Assistant audio (base64 PCM16)
//! - conversation.item.input_audio_transcription.delta / .completed - User speech
//! - error - Provider-reported error
//!
//! All other inbound kinds are accepted and ignored (forward-compatible).

use base64::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration carried by `session.update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,
}

/// Response configuration carried by `response.create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Response modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// Per-response instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 audio
        audio: String,
    },

    /// Commit the input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Request a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response configuration
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },
}

impl ClientEvent {
    /// Create an audio append event from raw PCM16 bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the OpenAI Realtime API.
///
/// Only the kinds the translator acts on are modelled here; everything else
/// is caught by the raw-kind fallback in the translator.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Provider-reported error
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Assistant spoken-text transcript fragment
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        /// Transcript fragment
        delta: String,
    },

    /// Assistant transcript complete
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// Full transcript
        #[serde(default)]
        transcript: String,
    },

    /// Assistant audio chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded PCM16 audio
        delta: String,
    },

    /// Assistant audio complete
    #[serde(rename = "response.audio.done")]
    AudioDone {},

    /// Transcription fragment of the user's input audio
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    InputTranscriptionDelta {
        /// Transcript fragment
        #[serde(default)]
        delta: String,
    },

    /// Transcription of the user's input audio complete
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted {
        /// Full transcript
        #[serde(default)]
        transcript: String,
    },
}

/// Minimal view of any provider event, used to classify kinds the typed
/// enum does not model.
#[derive(Debug, Clone, Deserialize)]
pub struct RawServerEvent {
    /// Event kind discriminator
    #[serde(rename = "type")]
    pub kind: String,
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Provider error payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_serialization() {
        let event = ClientEvent::InputAudioBufferCommit;
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("input_audio_buffer.commit"));
    }

    #[test]
    fn test_audio_append_round_trips() {
        let data = vec![0u8, 1, 2, 3];
        let event = ClientEvent::audio_append(&data);
        match event {
            ClientEvent::InputAudioBufferAppend { audio } => {
                let decoded = BASE64_STANDARD.decode(&audio).unwrap();
                assert_eq!(decoded, data);
            }
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn test_session_update_serialization() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig {
                modalities: Some(vec!["audio".to_string(), "text".to_string()]),
                instructions: Some("Be brief.".to_string()),
                voice: Some("verse".to_string()),
                input_audio_format: Some("pcm16".to_string()),
                output_audio_format: Some("pcm16".to_string()),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("session.update"));
        assert!(json.contains("pcm16"));
        assert!(json.contains("verse"));
    }

    #[test]
    fn test_response_create_serialization() {
        let event = ClientEvent::ResponseCreate {
            response: Some(ResponseConfig {
                modalities: Some(vec!["audio".to_string(), "text".to_string()]),
                instructions: None,
            }),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("response.create"));
        assert!(!json.contains("instructions"));
    }

    #[test]
    fn test_transcript_delta_deserialization() {
        let json = r#"{
            "type": "response.audio_transcript.delta",
            "response_id": "resp_1",
            "item_id": "item_1",
            "output_index": 0,
            "content_index": 0,
            "delta": "Hello"
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::AudioTranscriptDelta { delta } => assert_eq!(delta, "Hello"),
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "bad turn"}
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::Error { error } => {
                assert_eq!(error.error_type, "invalid_request_error");
                assert_eq!(error.message, "bad turn");
            }
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn test_raw_event_kind() {
        let json = r#"{"type": "rate_limits.updated", "rate_limits": []}"#;
        let raw: RawServerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(raw.kind, "rate_limits.updated");
    }
}

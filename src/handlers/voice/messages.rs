//! Voice session WebSocket message types.
//!
//! Text frames are JSON objects with a `type` discriminator; binary frames
//! are raw PCM16 mono audio in both directions.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Control messages from the client.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceIncomingMessage {
    /// Idempotent no-op after the initial accept
    StartSession,

    /// Client-side transcript of the user's speech; persisted, never
    /// forwarded to the bridge
    UserTranscript {
        /// Transcript text
        #[serde(default)]
        text: String,
    },

    /// Turn boundary: commit accumulated audio and request a response
    StopSpeaking,

    /// Graceful shutdown
    EndSession,
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Control messages to the client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceOutgoingMessage {
    /// Announced once at session start
    AudioFormat {
        /// Sample rate of binary frames, both directions
        sample_rate: u32,
        /// Channel count of binary frames
        channels: u32,
    },

    /// One per assistant transcript delta and one (empty, final) per
    /// utterance end
    AiTextDelta {
        /// Transcript fragment
        text: String,
        /// Marks utterance end
        is_final: bool,
    },

    /// User-visible failure; never carries raw internal payloads
    Error {
        /// Error description
        message: String,
    },
}

// =============================================================================
// Message Routing
// =============================================================================

/// Routing envelope for the client writer task.
pub enum VoiceMessageRoute {
    /// JSON text message
    Outgoing(VoiceOutgoingMessage),
    /// Binary audio data, forwarded verbatim
    Audio(Bytes),
    /// Close the connection
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_deserialization() {
        let msg: VoiceIncomingMessage =
            serde_json::from_str(r#"{"type": "start_session"}"#).unwrap();
        assert!(matches!(msg, VoiceIncomingMessage::StartSession));

        let msg: VoiceIncomingMessage =
            serde_json::from_str(r#"{"type": "user_transcript", "text": "hello there"}"#).unwrap();
        match msg {
            VoiceIncomingMessage::UserTranscript { text } => assert_eq!(text, "hello there"),
            _ => panic!("expected UserTranscript"),
        }

        let msg: VoiceIncomingMessage =
            serde_json::from_str(r#"{"type": "stop_speaking"}"#).unwrap();
        assert!(matches!(msg, VoiceIncomingMessage::StopSpeaking));

        let msg: VoiceIncomingMessage = serde_json::from_str(r#"{"type": "end_session"}"#).unwrap();
        assert!(matches!(msg, VoiceIncomingMessage::EndSession));
    }

    #[test]
    fn test_user_transcript_text_defaults_empty() {
        let msg: VoiceIncomingMessage =
            serde_json::from_str(r#"{"type": "user_transcript"}"#).unwrap();
        match msg {
            VoiceIncomingMessage::UserTranscript { text } => assert!(text.is_empty()),
            _ => panic!("expected UserTranscript"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<VoiceIncomingMessage>(r#"{"type": "dance"}"#).is_err());
    }

    #[test]
    fn test_audio_format_serialization() {
        let msg = VoiceOutgoingMessage::AudioFormat {
            sample_rate: 24000,
            channels: 1,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"audio_format""#));
        assert!(json.contains(r#""sample_rate":24000"#));
        assert!(json.contains(r#""channels":1"#));
    }

    #[test]
    fn test_ai_text_delta_serialization() {
        let msg = VoiceOutgoingMessage::AiTextDelta {
            text: "Hi".to_string(),
            is_final: false,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"ai_text_delta""#));
        assert!(json.contains(r#""text":"Hi""#));
        assert!(json.contains(r#""is_final":false"#));
    }

    #[test]
    fn test_error_serialization() {
        let msg = VoiceOutgoingMessage::Error {
            message: "session could not be started".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(!json.contains("LinkError"));
    }
}

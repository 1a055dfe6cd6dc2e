//! Translation from provider wire events to the internal event vocabulary.
//!
//! The mapping is pure and stateless: the same wire event always yields the
//! same [`ProviderEvent`]. Malformed payloads never kill the stream; they
//! surface as non-fatal [`ProviderEvent::Error`] values.

use base64::prelude::*;
use bytes::Bytes;

use crate::core::realtime::base::ProviderEvent;

use super::messages::{RawServerEvent, ServerEvent};

/// Translate one raw text frame from the provider socket.
///
/// Frames that parse into a modelled [`ServerEvent`] go through
/// [`translate_event`]; frames with a recognizable `type` but no modelled
/// variant become [`ProviderEvent::Unhandled`]; anything else is a
/// translation error.
pub fn translate_frame(text: &str) -> ProviderEvent {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => translate_event(event),
        Err(_) => match serde_json::from_str::<RawServerEvent>(text) {
            Ok(raw) => ProviderEvent::Unhandled(raw.kind),
            Err(e) => ProviderEvent::Error(format!("unparseable provider event: {e}")),
        },
    }
}

/// Translate one decoded wire event.
pub fn translate_event(event: ServerEvent) -> ProviderEvent {
    match event {
        ServerEvent::AudioTranscriptDelta { delta } => ProviderEvent::TextDelta(delta),

        // The completion marker carries no text; the full transcript was
        // already streamed as deltas.
        ServerEvent::AudioTranscriptDone { .. } => ProviderEvent::TextFinal,

        ServerEvent::AudioDelta { delta } => match BASE64_STANDARD.decode(&delta) {
            Ok(pcm) => ProviderEvent::AudioChunk(Bytes::from(pcm)),
            Err(e) => ProviderEvent::Error(format!("audio delta decode failed: {e}")),
        },

        ServerEvent::Error { error } => {
            ProviderEvent::Error(format!("{}: {}", error.error_type, error.message))
        }

        ServerEvent::AudioDone {} => {
            ProviderEvent::Unhandled("response.audio.done".to_string())
        }

        ServerEvent::InputTranscriptionDelta { .. } => ProviderEvent::Unhandled(
            "conversation.item.input_audio_transcription.delta".to_string(),
        ),

        ServerEvent::InputTranscriptionCompleted { .. } => ProviderEvent::Unhandled(
            "conversation.item.input_audio_transcription.completed".to_string(),
        ),
    }
}

//! Base types for the realtime upstream link and session bridge.
//!
//! This module defines the error taxonomy, the internal provider event
//! vocabulary, and the event sink interface the bridge delivers into.
//!
//! # Audio Format
//!
//! A single fixed format is assumed on both sides: PCM 16-bit signed
//! little-endian, mono, at the provider's native sample rate.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the upstream link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// WebSocket handshake or connection setup failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Missing or rejected credentials
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The link is not connected
    #[error("not connected")]
    NotConnected,

    /// WebSocket transport error after connect
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Outbound message could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration injected at link construction.
///
/// There is no process-wide credential state; every link carries its own
/// key, model and persona instructions.
#[derive(Debug, Clone, Default)]
pub struct LinkConfig {
    /// API key for the upstream provider
    pub api_key: String,

    /// Model identifier (e.g. "gpt-4o-realtime-preview")
    pub model: String,

    /// Voice identifier for spoken output
    pub voice: Option<String>,

    /// Session persona/context instructions sent at setup
    pub instructions: Option<String>,

    /// Endpoint override. `None` uses the provider's public endpoint;
    /// tests and self-hosted gateways point this at their own URL.
    pub endpoint: Option<String>,
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of a session and its upstream link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Connected, audio and commands accepted
    Active,
    /// Teardown started
    Closing,
    /// Terminal
    #[default]
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Active => write!(f, "active"),
            ConnectionState::Closing => write!(f, "closing"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Provider Events
// =============================================================================

/// Internal event vocabulary produced by the translator.
///
/// Every decoded provider wire event maps to exactly one of these variants;
/// the mapping is pure and stateless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Incremental fragment of the assistant's spoken-text transcript
    TextDelta(String),
    /// The assistant's utterance is complete; carries no text
    TextFinal,
    /// Decoded PCM16 audio chunk of the assistant's spoken output
    AudioChunk(Bytes),
    /// Provider-reported or translation-layer error; non-fatal unless the
    /// link itself reports connection loss
    Error(String),
    /// Recognized-but-ignored or unknown event kind, observability only
    Unhandled(String),
}

/// Callback invoked by the link for each decoded provider event, in strict
/// receive order.
pub type ProviderEventCallback =
    Arc<dyn Fn(ProviderEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Event Sink
// =============================================================================

/// The two-method event sink the bridge delivers into.
///
/// Implemented by the session orchestrator. An explicit interface instead of
/// captured closures keeps the shared state visible at the seam between the
/// provider-receive flow and the client connection.
#[async_trait]
pub trait BridgeEvents: Send + Sync {
    /// Called once per `TextDelta` (with `is_final == false`) and once per
    /// `TextFinal` (empty text, `is_final == true`), in receive order.
    async fn on_text(&self, text: &str, is_final: bool);

    /// Called once per `AudioChunk`, in receive order.
    async fn on_audio_chunk(&self, pcm: Bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Active.to_string(), "active");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }

    #[test]
    fn test_default_state_is_closed() {
        assert_eq!(ConnectionState::default(), ConnectionState::Closed);
    }

    #[test]
    fn test_error_display() {
        let err = LinkError::ConnectionFailed("refused".to_string());
        assert!(err.to_string().contains("connection failed"));

        let err = LinkError::NotConnected;
        assert_eq!(err.to_string(), "not connected");
    }

    #[test]
    fn test_provider_event_equality() {
        assert_eq!(
            ProviderEvent::TextDelta("hi".to_string()),
            ProviderEvent::TextDelta("hi".to_string())
        );
        assert_ne!(ProviderEvent::TextFinal, ProviderEvent::TextDelta(String::new()));
    }
}

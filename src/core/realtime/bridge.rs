//! Session bridge between one client session and one upstream link.
//!
//! The bridge owns the link, drives the session lifecycle
//! (`Connecting --connect()--> Active --close()--> Closed`, the latter
//! terminal), and fans provider events out to the registered
//! [`BridgeEvents`] sink in receive order.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::base::{BridgeEvents, ConnectionState, LinkConfig, LinkError, ProviderEvent};
use super::openai::OpenAiLink;

/// Errors surfaced by bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bridge is not in the Active state
    #[error("bridge not connected")]
    NotConnected,

    /// The bridge reached its terminal state and cannot be reused
    #[error("bridge closed")]
    Closed,

    /// Underlying link failure
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// One client session's bridge to the upstream provider.
///
/// Owns exactly one [`OpenAiLink`]; the two are created and torn down
/// together. Audio and commit commands are rejected with
/// [`BridgeError::NotConnected`] until `connect()` succeeds - data is never
/// silently dropped.
pub struct SessionBridge {
    link: OpenAiLink,
    state: RwLock<ConnectionState>,
}

impl SessionBridge {
    /// Create a bridge and register the event sink on its link.
    ///
    /// The sink is wired before any connection exists, so a failed
    /// `connect()` can never invoke it.
    pub async fn new(config: LinkConfig, sink: Arc<dyn BridgeEvents>) -> BridgeResult<Self> {
        let link = OpenAiLink::new(config)?;

        link.on_event(Arc::new(move |event: ProviderEvent| {
            let sink = sink.clone();
            Box::pin(async move {
                match event {
                    ProviderEvent::TextDelta(text) => sink.on_text(&text, false).await,
                    ProviderEvent::TextFinal => sink.on_text("", true).await,
                    ProviderEvent::AudioChunk(pcm) => sink.on_audio_chunk(pcm).await,
                    ProviderEvent::Error(detail) => {
                        tracing::warn!(%detail, "provider error event");
                    }
                    ProviderEvent::Unhandled(kind) => {
                        tracing::debug!(%kind, "unhandled provider event");
                    }
                }
            })
        }))
        .await;

        Ok(Self {
            link,
            state: RwLock::new(ConnectionState::Connecting),
        })
    }

    /// Connect the link. On failure the bridge stays in its initial state
    /// and the sink is never invoked.
    pub async fn connect(&self) -> BridgeResult<()> {
        match *self.state.read() {
            ConnectionState::Connecting => {}
            ConnectionState::Active => return Ok(()),
            ConnectionState::Closing | ConnectionState::Closed => {
                return Err(BridgeError::Closed);
            }
        }

        self.link.connect().await?;
        *self.state.write() = ConnectionState::Active;
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the bridge is Active with a live link.
    pub fn is_active(&self) -> bool {
        *self.state.read() == ConnectionState::Active && self.link.is_active()
    }

    /// Pass one PCM16 chunk through to the link.
    ///
    /// Delivery toward the provider is at-least-once with no application
    /// ack; a send racing a socket failure surfaces as an error on a later
    /// call rather than this one.
    pub async fn send_audio_chunk(&self, pcm: &[u8]) -> BridgeResult<()> {
        if !self.is_active() {
            return Err(BridgeError::NotConnected);
        }
        self.link.send_audio(pcm).await?;
        Ok(())
    }

    /// Forward the two-message commit sequence unconditionally.
    ///
    /// Whether unread audio exists since the last turn is the caller's
    /// policy, not the bridge's.
    pub async fn commit_and_request_response(&self) -> BridgeResult<()> {
        if !self.is_active() {
            return Err(BridgeError::NotConnected);
        }
        self.link.commit_and_respond().await?;
        Ok(())
    }

    /// Tear the link down. Idempotent; the bridge is terminal afterwards.
    pub async fn close(&self) {
        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Closing | ConnectionState::Closed => return,
                _ => *state = ConnectionState::Closing,
            }
        }
        self.link.close().await;
        *self.state.write() = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        texts: Mutex<Vec<(String, bool)>>,
        audio: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl BridgeEvents for RecordingSink {
        async fn on_text(&self, text: &str, is_final: bool) {
            self.texts.lock().push((text.to_string(), is_final));
        }

        async fn on_audio_chunk(&self, pcm: Bytes) {
            self.audio.lock().push(pcm);
        }
    }

    fn test_config() -> LinkConfig {
        LinkConfig {
            api_key: "test-key".to_string(),
            model: "gpt-4o-realtime-preview".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_bridge_is_connecting() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = SessionBridge::new(test_config(), sink).await.unwrap();
        assert_eq!(bridge.state(), ConnectionState::Connecting);
        assert!(!bridge.is_active());
    }

    #[tokio::test]
    async fn test_send_audio_before_connect_fails() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = SessionBridge::new(test_config(), sink.clone()).await.unwrap();

        match bridge.send_audio_chunk(&[0u8; 32]).await {
            Err(BridgeError::NotConnected) => {}
            other => panic!("expected NotConnected, got {other:?}"),
        }
        assert!(sink.texts.lock().is_empty());
        assert!(sink.audio.lock().is_empty());
    }

    #[tokio::test]
    async fn test_commit_before_connect_fails() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = SessionBridge::new(test_config(), sink).await.unwrap();
        match bridge.commit_and_request_response().await {
            Err(BridgeError::NotConnected) => {}
            other => panic!("expected NotConnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = SessionBridge::new(test_config(), sink).await.unwrap();
        bridge.close().await;
        bridge.close().await;
        assert_eq!(bridge.state(), ConnectionState::Closed);
        assert!(!bridge.is_active());
    }

    #[tokio::test]
    async fn test_connect_after_close_is_terminal() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = SessionBridge::new(test_config(), sink).await.unwrap();
        bridge.close().await;
        match bridge.connect().await {
            Err(BridgeError::Closed) => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_initial_state_without_events() {
        let sink = Arc::new(RecordingSink::default());
        let config = LinkConfig {
            endpoint: Some("ws://127.0.0.1:1/realtime".to_string()),
            ..test_config()
        };
        let bridge = SessionBridge::new(config, sink.clone()).await.unwrap();

        assert!(bridge.connect().await.is_err());
        assert_eq!(bridge.state(), ConnectionState::Connecting);
        assert!(!bridge.is_active());
        assert!(sink.texts.lock().is_empty());
        assert!(sink.audio.lock().is_empty());
    }
}

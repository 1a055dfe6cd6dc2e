//! OpenAI Realtime upstream link.
//!
//! Owns the single duplex WebSocket connection to the provider. Outbound
//! frames are serialized through one writer; a spawned receive loop decodes
//! provider events and dispatches each one immediately, in receive order.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: PCM 16-bit, 24kHz, mono, little-endian, base64 encoded

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use http::header::AUTHORIZATION;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_util::sync::CancellationToken;

use crate::core::realtime::base::{
    LinkConfig, LinkError, LinkResult, ProviderEvent, ProviderEventCallback,
};

use super::config::{OPENAI_REALTIME_URL, RealtimeModel, RealtimeVoice};
use super::messages::{ClientEvent, ResponseConfig, SessionConfig};
use super::translate::translate_frame;

/// Channel capacity for outbound WebSocket messages.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Per-response instructions sent with each turn-boundary request.
const RESPONSE_INSTRUCTIONS: &str = "Answer the user's last utterance.";

/// Upstream link to the OpenAI Realtime API.
///
/// One link per session. All mutable state is behind `Arc` so the spawned
/// receive loop shares it with the owning bridge; the `connected` flag uses
/// `AtomicBool` for lock-free fail-fast checks.
pub struct OpenAiLink {
    config: LinkConfig,
    model: RealtimeModel,
    voice: RealtimeVoice,

    /// Connected flag, shared with the receive loop
    connected: Arc<AtomicBool>,

    /// Outbound message channel; cleared on close so racing sends fail fast.
    /// All sends go through this one lock, which is what makes the
    /// commit/respond pair non-interleavable.
    outbound: Arc<Mutex<Option<mpsc::Sender<ClientEvent>>>>,

    /// Event callback, invoked once per decoded event in receive order
    event_callback: Arc<Mutex<Option<ProviderEventCallback>>>,

    /// Cancellation for the receive loop
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl OpenAiLink {
    /// Create a new link. Fails fast when no API key is configured.
    pub fn new(config: LinkConfig) -> LinkResult<Self> {
        if config.api_key.is_empty() {
            return Err(LinkError::Authentication("API key is required".to_string()));
        }

        let model = RealtimeModel::from_str_or_default(&config.model);
        let voice = config
            .voice
            .as_deref()
            .map(RealtimeVoice::from_str_or_default)
            .unwrap_or_default();

        Ok(Self {
            config,
            model,
            voice,
            connected: Arc::new(AtomicBool::new(false)),
            outbound: Arc::new(Mutex::new(None)),
            event_callback: Arc::new(Mutex::new(None)),
            cancel: Arc::new(Mutex::new(None)),
        })
    }

    /// Get the configured model.
    pub fn model(&self) -> RealtimeModel {
        self.model
    }

    /// Get the configured voice.
    pub fn voice(&self) -> RealtimeVoice {
        self.voice
    }

    /// Whether the socket is up and the receive loop is running.
    pub fn is_active(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Register the event callback. Must be set before `connect()`; events
    /// arriving with no callback registered are dropped with a warning.
    pub async fn on_event(&self, callback: ProviderEventCallback) {
        *self.event_callback.lock().await = Some(callback);
    }

    /// Build the WebSocket URL with the model parameter.
    fn build_ws_url(&self) -> String {
        match &self.config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}?model={}", OPENAI_REALTIME_URL, self.model.as_str()),
        }
    }

    /// Build the initial session setup message.
    fn build_session_config(&self) -> SessionConfig {
        SessionConfig {
            modalities: Some(vec!["audio".to_string(), "text".to_string()]),
            instructions: self.config.instructions.clone(),
            voice: Some(self.voice.as_str().to_string()),
            input_audio_format: Some("pcm16".to_string()),
            output_audio_format: Some("pcm16".to_string()),
        }
    }

    /// Connect to the provider and start the receive loop.
    ///
    /// Sends the session setup message before returning, so it is always the
    /// first outbound frame. Fails with [`LinkError::ConnectionFailed`] on
    /// handshake failure, in which case no event is ever dispatched.
    pub async fn connect(&self) -> LinkResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let url = self.build_ws_url();
        let mut request = url
            .into_client_request()
            .map_err(|e| LinkError::ConnectionFailed(e.to_string()))?;
        request.headers_mut().insert(
            AUTHORIZATION,
            format!("Bearer {}", self.config.api_key)
                .parse()
                .map_err(|_| LinkError::Authentication("API key is not a valid header value".to_string()))?,
        );
        request
            .headers_mut()
            .insert("OpenAI-Beta", http::HeaderValue::from_static("realtime=v1"));

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| LinkError::ConnectionFailed(e.to_string()))?;

        tracing::info!(model = %self.model, "connected to realtime provider");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        *self.outbound.lock().await = Some(tx);

        let token = CancellationToken::new();
        *self.cancel.lock().await = Some(token.clone());

        let connected = self.connected.clone();
        let outbound = self.outbound.clone();
        let event_callback = self.event_callback.clone();

        connected.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut intentional = false;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("receive loop cancelled");
                        intentional = true;
                        break;
                    }

                    Some(event) = rx.recv() => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("failed to serialize client event: {e}");
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("failed to send to provider: {e}");
                            break;
                        }
                    }

                    msg = ws_stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let event = translate_frame(&text);
                                Self::dispatch(&event_callback, event).await;
                            }
                            Some(Ok(Message::Binary(data))) => {
                                // The provider speaks JSON; binary frames are unexpected.
                                tracing::debug!(len = data.len(), "binary frame from provider");
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("failed to send pong: {e}");
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("provider closed the connection");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!("provider socket error: {e}");
                                break;
                            }
                            Some(Ok(_)) => {}
                        }
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
            if !intentional {
                Self::dispatch(
                    &event_callback,
                    ProviderEvent::Error("upstream connection closed".to_string()),
                )
                .await;
            }
            // Dropping the receiver first lets any send blocked on a full
            // channel fail instead of holding the sender lock forever.
            drop(rx);
            *outbound.lock().await = None;
            tracing::debug!("realtime receive loop ended");
        });

        // Session setup is enqueued before any audio can be, so it is the
        // first frame the provider sees.
        self.send_event(ClientEvent::SessionUpdate {
            session: self.build_session_config(),
        })
        .await?;

        Ok(())
    }

    /// Append raw PCM16 to the provider's input buffer.
    ///
    /// No local backpressure beyond the bounded outbound channel; the
    /// provider is assumed to sustain steady intake.
    pub async fn send_audio(&self, pcm: &[u8]) -> LinkResult<()> {
        if !self.is_active() {
            return Err(LinkError::NotConnected);
        }
        self.send_event(ClientEvent::audio_append(pcm)).await
    }

    /// Commit the input buffer and request a response.
    ///
    /// Exactly two ordered messages, enqueued while holding the outbound
    /// sender lock so no other send can interleave between them.
    pub async fn commit_and_respond(&self) -> LinkResult<()> {
        if !self.is_active() {
            return Err(LinkError::NotConnected);
        }

        let guard = self.outbound.lock().await;
        let sender = guard.as_ref().ok_or(LinkError::NotConnected)?;
        sender
            .send(ClientEvent::InputAudioBufferCommit)
            .await
            .map_err(|e| LinkError::WebSocket(e.to_string()))?;
        sender
            .send(ClientEvent::ResponseCreate {
                response: Some(ResponseConfig {
                    modalities: Some(vec!["audio".to_string(), "text".to_string()]),
                    instructions: Some(RESPONSE_INSTRUCTIONS.to_string()),
                }),
            })
            .await
            .map_err(|e| LinkError::WebSocket(e.to_string()))?;
        Ok(())
    }

    /// Close the socket and cancel the receive loop. Idempotent, and safe to
    /// invoke while a send is in flight: the racing send fails benignly.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(token) = self.cancel.lock().await.take() {
            token.cancel();
        }
        *self.outbound.lock().await = None;
    }

    async fn send_event(&self, event: ClientEvent) -> LinkResult<()> {
        let guard = self.outbound.lock().await;
        let sender = guard.as_ref().ok_or(LinkError::NotConnected)?;
        sender
            .send(event)
            .await
            .map_err(|e| LinkError::WebSocket(e.to_string()))
    }

    async fn dispatch(
        callback: &Arc<Mutex<Option<ProviderEventCallback>>>,
        event: ProviderEvent,
    ) {
        match callback.lock().await.as_ref() {
            Some(cb) => cb(event).await,
            None => tracing::warn!(?event, "provider event dropped: no callback registered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LinkConfig {
        LinkConfig {
            api_key: "test-key".to_string(),
            model: "gpt-4o-realtime-preview".to_string(),
            voice: Some("verse".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_api_key_required() {
        let result = OpenAiLink::new(LinkConfig::default());
        match result {
            Err(LinkError::Authentication(_)) => {}
            _ => panic!("expected Authentication error"),
        }
    }

    #[test]
    fn test_link_creation() {
        let link = OpenAiLink::new(test_config()).unwrap();
        assert!(!link.is_active());
        assert_eq!(link.model(), RealtimeModel::Gpt4oRealtimePreview);
        assert_eq!(link.voice(), RealtimeVoice::Verse);
    }

    #[test]
    fn test_build_ws_url_default_endpoint() {
        let link = OpenAiLink::new(test_config()).unwrap();
        let url = link.build_ws_url();
        assert!(url.starts_with("wss://api.openai.com"));
        assert!(url.contains("model=gpt-4o-realtime-preview"));
    }

    #[test]
    fn test_build_ws_url_override() {
        let config = LinkConfig {
            endpoint: Some("ws://127.0.0.1:9999/realtime".to_string()),
            ..test_config()
        };
        let link = OpenAiLink::new(config).unwrap();
        assert_eq!(link.build_ws_url(), "ws://127.0.0.1:9999/realtime");
    }

    #[tokio::test]
    async fn test_send_audio_requires_connection() {
        let link = OpenAiLink::new(test_config()).unwrap();
        match link.send_audio(&[0u8; 64]).await {
            Err(LinkError::NotConnected) => {}
            other => panic!("expected NotConnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_commit_requires_connection() {
        let link = OpenAiLink::new(test_config()).unwrap();
        match link.commit_and_respond().await {
            Err(LinkError::NotConnected) => {}
            other => panic!("expected NotConnected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_before_connect_is_harmless() {
        let link = OpenAiLink::new(test_config()).unwrap();
        link.close().await;
        link.close().await;
        assert!(!link.is_active());
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let config = LinkConfig {
            // Nothing listens here.
            endpoint: Some("ws://127.0.0.1:1/realtime".to_string()),
            ..test_config()
        };
        let link = OpenAiLink::new(config).unwrap();
        match link.connect().await {
            Err(LinkError::ConnectionFailed(_)) => {}
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
        assert!(!link.is_active());
    }

    #[test]
    fn test_session_config_is_pcm16_both_directions() {
        let link = OpenAiLink::new(test_config()).unwrap();
        let session = link.build_session_config();
        assert_eq!(session.input_audio_format.as_deref(), Some("pcm16"));
        assert_eq!(session.output_audio_format.as_deref(), Some("pcm16"));
        assert_eq!(
            session.modalities,
            Some(vec!["audio".to_string(), "text".to_string()])
        );
    }
}

//! Voice session WebSocket handler - the session orchestrator.
//!
//! Owns one client connection's lifecycle: builds session context from prior
//! memory, drives the bridge from client frames, persists conversation
//! events, and triggers memory extraction at teardown.
//!
//! Two logically concurrent flows exist per session: client-frame
//! consumption driving bridge calls (this module's receive loop), and the
//! link's provider-receive flow driving [`ClientSink`]. Each flow preserves
//! its own emission order; no ordering holds between them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::realtime::{
    BridgeError, BridgeEvents, LinkConfig, OPENAI_REALTIME_CHANNELS, OPENAI_REALTIME_SAMPLE_RATE,
    SessionBridge,
};
use crate::memory::{Role, Storage, StorageError, render_instructions, render_transcript};
use crate::state::AppState;

use super::messages::{VoiceIncomingMessage, VoiceMessageRoute, VoiceOutgoingMessage};

/// Channel buffer size for the client writer task.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Profile used when the client does not identify itself.
const DEFAULT_USER_ID: &str = "anonymous";

/// Query parameters on the upgrade URL.
#[derive(Debug, Deserialize)]
pub struct VoiceParams {
    /// Profile identifier, e.g. `/voice?user_id=user-123`
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Error)]
enum SessionStartError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Voice WebSocket handler.
///
/// Upgrades the HTTP connection and hands it to the per-session task.
pub async fn voice_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<VoiceParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let user_id = params
        .user_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    info!(%user_id, "voice WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_voice_socket(socket, state, user_id))
}

/// One live session: the bridge, its record, and the turn-boundary state.
struct LiveSession {
    session_id: Uuid,
    bridge: Arc<SessionBridge>,
    response_in_flight: Arc<AtomicBool>,
}

/// Provider-event sink for one session.
///
/// Forwards assistant output to the client writer and persists every
/// non-empty transcript delta as its own conversation event, so no partial
/// assistant output is lost on abrupt disconnect.
struct ClientSink {
    routes: mpsc::Sender<VoiceMessageRoute>,
    store: Arc<dyn Storage>,
    session_id: Uuid,
    response_in_flight: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl BridgeEvents for ClientSink {
    async fn on_text(&self, text: &str, is_final: bool) {
        let _ = self
            .routes
            .send(VoiceMessageRoute::Outgoing(VoiceOutgoingMessage::AiTextDelta {
                text: text.to_string(),
                is_final,
            }))
            .await;

        if is_final {
            self.response_in_flight.store(false, Ordering::SeqCst);
        } else if !text.is_empty() {
            if let Err(e) = self
                .store
                .append_event(self.session_id, Role::Assistant, text.to_string())
                .await
            {
                warn!("failed to persist assistant delta: {e}");
            }
        }
    }

    async fn on_audio_chunk(&self, pcm: Bytes) {
        let _ = self.routes.send(VoiceMessageRoute::Audio(pcm)).await;
    }
}

/// Handle one client connection end to end.
async fn handle_voice_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    info!(%user_id, "voice WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<VoiceMessageRoute>(CHANNEL_BUFFER_SIZE);

    // Writer task: the only place that touches the client-facing sink.
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let should_close = matches!(route, VoiceMessageRoute::Close);

            let result = match route {
                VoiceMessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("failed to serialize outgoing message: {e}");
                        continue;
                    }
                },
                VoiceMessageRoute::Audio(data) => sender.send(Message::Binary(data)).await,
                VoiceMessageRoute::Close => sender.send(Message::Close(None)).await,
            };

            if result.is_err() || should_close {
                break;
            }
        }
    });

    // Session and link are created together, before the first client frame
    // is processed.
    let live = match start_session(&state, &user_id, &message_tx).await {
        Ok(live) => live,
        Err(e) => {
            error!(%user_id, "failed to start session: {e}");
            let _ = message_tx
                .send(VoiceMessageRoute::Outgoing(VoiceOutgoingMessage::Error {
                    message: "session could not be started".to_string(),
                }))
                .await;
            let _ = message_tx.send(VoiceMessageRoute::Close).await;
            let _ = sender_task.await;
            return;
        }
    };

    // Client frame loop.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if !handle_control_message(&text, &state, &live, &message_tx).await {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                if let Err(e) = live.bridge.send_audio_chunk(&data).await {
                    warn!("audio forward failed: {e}");
                    break;
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("voice WebSocket closed by client");
                break;
            }
            Err(e) => {
                warn!("voice WebSocket error: {e}");
                break;
            }
        }
    }

    teardown(&state, &user_id, &live).await;

    let _ = message_tx.send(VoiceMessageRoute::Close).await;
    sender_task.abort();
    info!(%user_id, "voice session terminated");
}

/// Process one control message. Returns `false` to end the session.
async fn handle_control_message(
    text: &str,
    state: &Arc<AppState>,
    live: &LiveSession,
    message_tx: &mpsc::Sender<VoiceMessageRoute>,
) -> bool {
    let incoming: VoiceIncomingMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("unparseable control message: {e}");
            let _ = message_tx
                .send(VoiceMessageRoute::Outgoing(VoiceOutgoingMessage::Error {
                    message: format!("invalid message format: {e}"),
                }))
                .await;
            return true;
        }
    };

    match incoming {
        VoiceIncomingMessage::StartSession => {
            // Already accepted and connected.
            debug!("start_session after accept, ignoring");
            true
        }

        VoiceIncomingMessage::UserTranscript { text } => {
            if let Err(e) = state
                .store
                .append_event(live.session_id, Role::User, text)
                .await
            {
                warn!("failed to persist user transcript: {e}");
            }
            true
        }

        VoiceIncomingMessage::StopSpeaking => {
            // A turn boundary arriving while a response is still streaming
            // is coalesced; the in-flight flag clears when the final
            // transcript marker is relayed.
            if live.response_in_flight.swap(true, Ordering::SeqCst) {
                debug!("response in flight, coalescing turn boundary");
                return true;
            }
            if let Err(e) = live.bridge.commit_and_request_response().await {
                warn!("turn commit failed: {e}");
                return false;
            }
            true
        }

        VoiceIncomingMessage::EndSession => {
            info!("end_session requested by client");
            false
        }
    }
}

/// Build session context, connect the bridge and announce the audio format.
async fn start_session(
    state: &Arc<AppState>,
    user_id: &str,
    message_tx: &mpsc::Sender<VoiceMessageRoute>,
) -> Result<LiveSession, SessionStartError> {
    state.store.get_or_create_profile(user_id).await?;
    let memories = state
        .store
        .get_ranked_memories(user_id, state.config.memory_limit)
        .await?;
    debug!(%user_id, count = memories.len(), "loaded ranked memories");

    let instructions = render_instructions(&memories);
    let session = state.store.create_session(user_id).await?;

    let response_in_flight = Arc::new(AtomicBool::new(false));
    let sink = Arc::new(ClientSink {
        routes: message_tx.clone(),
        store: state.store.clone(),
        session_id: session.id,
        response_in_flight: response_in_flight.clone(),
    });

    let link_config = LinkConfig {
        api_key: state.config.openai_api_key.clone(),
        model: state.config.realtime_model.clone(),
        voice: Some(state.config.realtime_voice.clone()),
        instructions: Some(instructions),
        endpoint: state.config.realtime_endpoint.clone(),
    };

    let bridge = match connect_bridge(link_config, sink).await {
        Ok(bridge) => bridge,
        Err(e) => {
            // The session record never outlives its link.
            if let Err(end_err) = state.store.end_session(session.id).await {
                warn!("failed to end orphaned session: {end_err}");
            }
            return Err(e.into());
        }
    };

    let _ = message_tx
        .send(VoiceMessageRoute::Outgoing(VoiceOutgoingMessage::AudioFormat {
            sample_rate: OPENAI_REALTIME_SAMPLE_RATE,
            channels: OPENAI_REALTIME_CHANNELS,
        }))
        .await;

    info!(%user_id, session_id = %session.id, "voice session started");
    Ok(LiveSession {
        session_id: session.id,
        bridge,
        response_in_flight,
    })
}

async fn connect_bridge(
    config: LinkConfig,
    sink: Arc<dyn BridgeEvents>,
) -> Result<Arc<SessionBridge>, BridgeError> {
    let bridge = Arc::new(SessionBridge::new(config, sink).await?);
    bridge.connect().await?;
    Ok(bridge)
}

/// Tear the session down. Runs on every disconnect path.
///
/// The link closes first; memory extraction runs against whatever was
/// persisted up to that point, and its failures never propagate.
async fn teardown(state: &Arc<AppState>, user_id: &str, live: &LiveSession) {
    live.bridge.close().await;

    if let Err(e) = state.store.end_session(live.session_id).await {
        warn!("failed to mark session ended: {e}");
    }

    let events = match state.store.read_ordered_events(live.session_id).await {
        Ok(events) => events,
        Err(e) => {
            warn!("failed to read session transcript: {e}");
            return;
        }
    };
    if events.is_empty() {
        debug!("empty transcript, skipping memory extraction");
        return;
    }

    let transcript = render_transcript(&events);
    match state.summarizer.extract(&transcript).await {
        Ok(extracted) => {
            let count = extracted.len();
            for memory in extracted {
                if let Err(e) = state
                    .store
                    .add_memory(user_id, memory.kind, memory.content, memory.importance)
                    .await
                {
                    warn!("failed to store extracted memory: {e}");
                }
            }
            info!(%user_id, count, "memory extraction complete");
        }
        Err(e) => warn!("memory extraction failed: {e}"),
    }
}

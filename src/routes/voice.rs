//! Voice WebSocket route configuration.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::voice::voice_handler;
use crate::state::AppState;

/// Create the voice WebSocket router.
///
/// # Endpoint
///
/// `GET /voice?user_id=<id>` - WebSocket upgrade for one voice session.
///
/// After the upgrade the server announces `audio_format`; the client then
/// streams binary PCM16 frames and JSON control messages, and receives
/// `ai_text_delta` messages plus binary assistant audio.
pub fn create_voice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice", get(voice_handler))
        .layer(TraceLayer::new_for_http())
}

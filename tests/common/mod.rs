//! Shared test fixtures: a mock realtime provider WebSocket server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// A local stand-in for the upstream realtime provider.
///
/// Records every JSON event the link sends; when a `response.create`
/// arrives, streams the scripted response frames back.
pub struct MockProvider {
    pub url: String,
    pub received: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl MockProvider {
    /// Recorded event kinds, in receive order.
    pub fn received_kinds(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|v| {
                v.get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("")
                    .to_string()
            })
            .collect()
    }
}

/// Spawn a mock provider that answers each `response.create` with
/// `response_frames`.
pub async fn spawn_mock_provider(response_frames: Vec<String>) -> MockProvider {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));

    let recorded = received.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let recorded = recorded.clone();
            let response_frames = response_frames.clone();
            tokio::spawn(async move {
                let ws = match accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(_) => return,
                };
                let (mut write, mut read) = ws.split();
                while let Some(Ok(msg)) = read.next().await {
                    if let Message::Text(text) = msg {
                        let value: serde_json::Value =
                            serde_json::from_str(&text).unwrap_or_default();
                        let kind = value
                            .get("type")
                            .and_then(|t| t.as_str())
                            .unwrap_or("")
                            .to_string();
                        recorded.lock().unwrap().push(value);

                        if kind == "response.create" {
                            for frame in &response_frames {
                                if write
                                    .send(Message::Text(frame.clone().into()))
                                    .await
                                    .is_err()
                                {
                                    return;
                                }
                            }
                        }
                    }
                }
            });
        }
    });

    MockProvider {
        url: format!("ws://{addr}/realtime"),
        received,
    }
}

/// A canned assistant response: two transcript deltas, the final marker,
/// and one audio chunk.
pub fn canned_response_frames() -> Vec<String> {
    use base64::prelude::*;
    vec![
        r#"{"type":"response.audio_transcript.delta","delta":"Hi"}"#.to_string(),
        r#"{"type":"response.audio_transcript.delta","delta":" there"}"#.to_string(),
        format!(
            r#"{{"type":"response.audio.delta","delta":"{}"}}"#,
            BASE64_STANDARD.encode([1u8, 2, 3, 4])
        ),
        r#"{"type":"response.audio_transcript.done","transcript":"Hi there"}"#.to_string(),
    ]
}

/// Poll until `predicate` holds or the timeout elapses.
pub async fn wait_until<F: Fn() -> bool>(predicate: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

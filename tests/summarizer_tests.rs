//! Memory extraction tests against a mock chat-completions endpoint.

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voiceline::memory::{ChatSummarizer, MemoryKind, Summarizer, SummarizerError};

fn summarizer_for(server: &MockServer) -> ChatSummarizer {
    ChatSummarizer::with_endpoint(
        "test-key".to_string(),
        "test-model".to_string(),
        format!("{}/v1/chat/completions", server.uri()),
    )
}

#[tokio::test]
async fn test_extraction_happy_path() {
    let server = MockServer::start().await;
    let body = json!({
        "choices": [{
            "message": {
                "content": "{\"memories\":[\
                    {\"type\":\"preference\",\"content\":\"prefers brief answers\",\"importance\":8},\
                    {\"type\":\"history_summary\",\"content\":\"asked about the weather\",\"importance\":3}\
                ]}"
            }
        }]
    });
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("USER: what's the weather"))
        .and(body_string_contains("json_object"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let summarizer = summarizer_for(&server);
    let memories = summarizer
        .extract("USER: what's the weather\nASSISTANT: sunny today")
        .await
        .unwrap();

    assert_eq!(memories.len(), 2);
    assert_eq!(memories[0].kind, MemoryKind::Preference);
    assert_eq!(memories[0].content, "prefers brief answers");
    assert_eq!(memories[0].importance, 8);
    assert_eq!(memories[1].kind, MemoryKind::HistorySummary);
}

#[tokio::test]
async fn test_extraction_server_error_is_contained() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let summarizer = summarizer_for(&server);
    match summarizer.extract("USER: hi").await {
        Err(SummarizerError::Request(msg)) => assert!(msg.contains("500")),
        other => panic!("expected Request error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_extraction_malformed_payload_is_invalid_response() {
    let server = MockServer::start().await;
    let body = json!({
        "choices": [{"message": {"content": "sorry, no json today"}}]
    });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let summarizer = summarizer_for(&server);
    match summarizer.extract("USER: hi").await {
        Err(SummarizerError::InvalidResponse(_)) => {}
        other => panic!("expected InvalidResponse, got {other:?}"),
    }
}

//! Post-session memory extraction via a chat-completions model.
//!
//! At teardown the orchestrator hands the session transcript to a
//! [`Summarizer`]; each extracted record is then written through
//! [`super::Storage`]. Failures here are caught at the teardown boundary and
//! never block bridge teardown.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::MemoryKind;

/// OpenAI chat completions endpoint.
const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Importance assigned when the model omits one.
const DEFAULT_IMPORTANCE: i64 = 5;

/// Errors raised by memory extraction.
#[derive(Debug, Error)]
pub enum SummarizerError {
    /// HTTP request failed or returned a non-success status
    #[error("extraction request failed: {0}")]
    Request(String),

    /// Response body did not match the expected shape
    #[error("unexpected extraction response: {0}")]
    InvalidResponse(String),
}

/// Result type for summarizer operations.
pub type SummarizerResult<T> = Result<T, SummarizerError>;

/// One memory extracted from a session transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMemory {
    /// Memory kind
    pub kind: MemoryKind,
    /// Memory content
    pub content: String,
    /// Importance, clamped to 1-10
    pub importance: i64,
}

/// Summarizer interface the session orchestrator depends on.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Extract durable memories from one session transcript.
    async fn extract(&self, transcript: &str) -> SummarizerResult<Vec<ExtractedMemory>>;
}

// =============================================================================
// Chat-completions implementation
// =============================================================================

/// Summarizer backed by a JSON-mode chat-completions request.
pub struct ChatSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl ChatSummarizer {
    /// Create a summarizer against the public endpoint.
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_endpoint(api_key, model, OPENAI_CHAT_COMPLETIONS_URL.to_string())
    }

    /// Create a summarizer against a custom endpoint (tests, proxies).
    pub fn with_endpoint(api_key: String, model: String, endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            endpoint,
        }
    }

    fn build_prompt(transcript: &str) -> String {
        format!(
            "You are a memory extraction assistant.\n\
             \n\
             From the conversation transcript below, extract:\n\
             - stable user preferences\n\
             - stable user profile facts\n\
             - a short summary of what happened in this session\n\
             \n\
             Return JSON like:\n\
             {{\"memories\": [{{\"type\": \"preference\" | \"fact\" | \"history_summary\", \
             \"content\": \"string\", \"importance\": 1-10}}]}}\n\
             \n\
             Transcript:\n\
             \"\"\"{transcript}\"\"\""
        )
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn extract(&self, transcript: &str) -> SummarizerResult<Vec<ExtractedMemory>> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::build_prompt(transcript),
            }],
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummarizerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::Request(format!(
                "status {status}: {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::InvalidResponse(e.to_string()))?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| SummarizerError::InvalidResponse("no choices".to_string()))?;

        parse_extraction(content)
    }
}

/// Parse the model's JSON payload into extracted memories.
///
/// Unknown kinds fall back to `fact`, importance is clamped to 1-10, and
/// records with empty content are skipped.
fn parse_extraction(content: &str) -> SummarizerResult<Vec<ExtractedMemory>> {
    let payload: ExtractionPayload = serde_json::from_str(content)
        .map_err(|e| SummarizerError::InvalidResponse(e.to_string()))?;

    Ok(payload
        .memories
        .into_iter()
        .filter(|m| !m.content.is_empty())
        .map(|m| ExtractedMemory {
            kind: MemoryKind::from_str_or_default(&m.kind),
            content: m.content,
            importance: m.importance.unwrap_or(DEFAULT_IMPORTANCE).clamp(1, 10),
        })
        .collect())
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    memories: Vec<RawMemory>,
}

#[derive(Debug, Deserialize)]
struct RawMemory {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    importance: Option<i64>,
}

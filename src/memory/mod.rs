//! Per-user memory: profiles, ranked memories, sessions and conversation
//! events, plus the post-session memory extraction collaborator.

mod store;
mod summarizer;

pub use store::{InMemoryStore, Storage, StorageError, StorageResult};
pub use summarizer::{
    ChatSummarizer, ExtractedMemory, Summarizer, SummarizerError, SummarizerResult,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Records
// =============================================================================

/// Kind of extracted memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// A stable user preference
    Preference,
    /// A stable user profile fact
    Fact,
    /// A short summary of a past session
    HistorySummary,
}

impl MemoryKind {
    /// Convert to the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::HistorySummary => "history_summary",
        }
    }

    /// Parse from string; unknown kinds fall back to `Fact`.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "preference" => Self::Preference,
            "fact" => Self::Fact,
            "history_summary" => Self::HistorySummary,
            _ => Self::Fact,
        }
    }
}

/// Speaker role in a conversation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the session
    User,
    /// The assistant side of the session
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A known user.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Client-chosen identifier (e.g. "user-123")
    pub id: String,
    /// Creation time
    pub created_at: OffsetDateTime,
}

/// One remembered fact, preference or summary about a user.
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    /// Record identifier
    pub id: Uuid,
    /// Owning profile
    pub profile_id: String,
    /// Memory kind
    pub kind: MemoryKind,
    /// Memory content
    pub content: String,
    /// Importance, 1 (low) to 10 (high)
    pub importance: i64,
    /// Creation time
    pub created_at: OffsetDateTime,
    /// Last update time; ranking tie-breaker
    pub updated_at: OffsetDateTime,
}

/// One conversation session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Session identifier
    pub id: Uuid,
    /// Owning profile
    pub profile_id: String,
    /// Start time
    pub started_at: OffsetDateTime,
    /// End time, set at teardown
    pub ended_at: Option<OffsetDateTime>,
}

/// One append-only conversation event.
#[derive(Debug, Clone)]
pub struct ConversationEvent {
    /// Speaker role
    pub role: Role,
    /// Event content
    pub content: String,
    /// Creation time
    pub created_at: OffsetDateTime,
}

// =============================================================================
// Rendering
// =============================================================================

/// Render ranked memories into the session persona instructions.
pub fn render_instructions(memories: &[MemoryRecord]) -> String {
    let memory_text = if memories.is_empty() {
        "- (no previous memories)".to_string()
    } else {
        memories
            .iter()
            .map(|m| format!("- {}", m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a friendly real-time voice assistant.\n\
         \n\
         You know these things about the user from past interactions:\n\
         {memory_text}\n\
         \n\
         Style:\n\
         - Keep answers short and conversational (2-4 sentences).\n\
         - Speak like you are talking, not writing an essay."
    )
}

/// Render ordered conversation events into a transcript, one
/// `ROLE: content` line per event.
pub fn render_transcript(events: &[ConversationEvent]) -> String {
    events
        .iter()
        .map(|e| format!("{}: {}", e.role.to_string().to_uppercase(), e.content))
        .collect::<Vec<_>>()
        .join("\n")
}

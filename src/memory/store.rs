//! Storage collaborator for profiles, memories, sessions and events.
//!
//! The trait is the seam the orchestrator depends on; [`InMemoryStore`] is
//! the in-process implementation. Writes are internally serialized behind a
//! single lock, which is what makes concurrent appends from independent
//! producers safe while preserving each producer's own emission order.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{ConversationEvent, MemoryKind, MemoryRecord, Profile, Role, SessionRecord};

/// Errors raised by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Session id not found
    #[error("unknown session: {0}")]
    UnknownSession(Uuid),

    /// Profile id not found
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage interface the session orchestrator depends on.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a profile, creating it on first sight.
    async fn get_or_create_profile(&self, id: &str) -> StorageResult<Profile>;

    /// Fetch up to `limit` memories for a profile, ordered by importance
    /// descending, ties broken by most-recently-updated first.
    async fn get_ranked_memories(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<MemoryRecord>>;

    /// Store one extracted memory.
    async fn add_memory(
        &self,
        profile_id: &str,
        kind: MemoryKind,
        content: String,
        importance: i64,
    ) -> StorageResult<()>;

    /// Create a session for a profile.
    async fn create_session(&self, profile_id: &str) -> StorageResult<SessionRecord>;

    /// Mark a session ended.
    async fn end_session(&self, session_id: Uuid) -> StorageResult<()>;

    /// Append one conversation event to a session.
    async fn append_event(
        &self,
        session_id: Uuid,
        role: Role,
        content: String,
    ) -> StorageResult<()>;

    /// Read a session's events in creation order.
    async fn read_ordered_events(
        &self,
        session_id: Uuid,
    ) -> StorageResult<Vec<ConversationEvent>>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    memories: Vec<MemoryRecord>,
    sessions: HashMap<Uuid, SessionRecord>,
    events: HashMap<Uuid, Vec<ConversationEvent>>,
}

/// In-process store. One lock serializes all writes.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions recorded for a profile, in creation order.
    pub fn sessions_for(&self, profile_id: &str) -> Vec<SessionRecord> {
        let inner = self.inner.read();
        let mut sessions: Vec<SessionRecord> = inner
            .sessions
            .values()
            .filter(|s| s.profile_id == profile_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    #[cfg(test)]
    pub(crate) fn insert_memory_record(&self, record: MemoryRecord) {
        self.inner.write().memories.push(record);
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn get_or_create_profile(&self, id: &str) -> StorageResult<Profile> {
        let mut inner = self.inner.write();
        let profile = inner.profiles.entry(id.to_string()).or_insert_with(|| Profile {
            id: id.to_string(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(profile.clone())
    }

    async fn get_ranked_memories(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<MemoryRecord>> {
        let inner = self.inner.read();
        let mut memories: Vec<MemoryRecord> = inner
            .memories
            .iter()
            .filter(|m| m.profile_id == profile_id)
            .cloned()
            .collect();
        memories.sort_by(|a, b| {
            b.importance
                .cmp(&a.importance)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        memories.truncate(limit);
        Ok(memories)
    }

    async fn add_memory(
        &self,
        profile_id: &str,
        kind: MemoryKind,
        content: String,
        importance: i64,
    ) -> StorageResult<()> {
        let mut inner = self.inner.write();
        if !inner.profiles.contains_key(profile_id) {
            return Err(StorageError::UnknownProfile(profile_id.to_string()));
        }
        let now = OffsetDateTime::now_utc();
        inner.memories.push(MemoryRecord {
            id: Uuid::new_v4(),
            profile_id: profile_id.to_string(),
            kind,
            content,
            importance,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn create_session(&self, profile_id: &str) -> StorageResult<SessionRecord> {
        let mut inner = self.inner.write();
        if !inner.profiles.contains_key(profile_id) {
            return Err(StorageError::UnknownProfile(profile_id.to_string()));
        }
        let session = SessionRecord {
            id: Uuid::new_v4(),
            profile_id: profile_id.to_string(),
            started_at: OffsetDateTime::now_utc(),
            ended_at: None,
        };
        inner.sessions.insert(session.id, session.clone());
        inner.events.insert(session.id, Vec::new());
        Ok(session)
    }

    async fn end_session(&self, session_id: Uuid) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(StorageError::UnknownSession(session_id))?;
        if session.ended_at.is_none() {
            session.ended_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn append_event(
        &self,
        session_id: Uuid,
        role: Role,
        content: String,
    ) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let events = inner
            .events
            .get_mut(&session_id)
            .ok_or(StorageError::UnknownSession(session_id))?;
        events.push(ConversationEvent {
            role,
            content,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn read_ordered_events(
        &self,
        session_id: Uuid,
    ) -> StorageResult<Vec<ConversationEvent>> {
        let inner = self.inner.read();
        inner
            .events
            .get(&session_id)
            .cloned()
            .ok_or(StorageError::UnknownSession(session_id))
    }
}

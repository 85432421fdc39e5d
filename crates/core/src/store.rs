//! Conversation storage: the external collaborator that keeps message
//! lists per session.
//!
//! The orchestration core owns no persisted state; callers load the
//! history for a session, hand it to the orchestrator, and append the
//! new turn afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::message::{Message, SessionId};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    fn name(&self) -> &str;

    /// Messages of a session, oldest first. Unknown sessions are empty.
    async fn load(&self, session: &SessionId) -> Result<Vec<Message>, StoreError>;

    /// Append messages to a session. Transient UI messages are dropped.
    async fn append(&self, session: &SessionId, messages: Vec<Message>) -> Result<(), StoreError>;

    /// Forget a session. Returns whether it existed.
    async fn clear(&self, session: &SessionId) -> Result<bool, StoreError>;
}

/// An in-memory store. Useful for testing and ephemeral sessions.
pub struct InMemoryConversationStore {
    sessions: Arc<RwLock<HashMap<SessionId, Vec<Message>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, session: &SessionId) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, session: &SessionId, messages: Vec<Message>) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.clone())
            .or_default()
            .extend(messages.into_iter().filter(|m| !m.is_transient()));
        Ok(())
    }

    async fn clear(&self, session: &SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(session).is_some())
    }
}

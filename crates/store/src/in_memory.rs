//! In-memory backend — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use toolweave_core::error::StoreError;
use toolweave_core::message::{ConversationId, Message};
use toolweave_core::store::MessageStore;

/// Conversation histories kept in a map, lost on restart.
#[derive(Clone)]
pub struct InMemoryStore {
    conversations: Arc<RwLock<HashMap<ConversationId, Vec<Message>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Ids of every conversation with at least one message.
    pub async fn conversations(&self) -> Vec<ConversationId> {
        let map = self.conversations.read().await;
        let mut ids: Vec<_> = map.keys().cloned().collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }

    pub async fn clear(&self) {
        self.conversations.write().await.clear();
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, conversation: &ConversationId) -> Result<Vec<Message>, StoreError> {
        let map = self.conversations.read().await;
        Ok(map.get(conversation).cloned().unwrap_or_default())
    }

    async fn append(&self, conversation: &ConversationId, message: Message) -> Result<(), StoreError> {
        let mut map = self.conversations.write().await;
        let history = map.entry(conversation.clone()).or_default();

        match history.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                tracing::trace!(conversation = %conversation, id = %message.id, "Replacing stored message");
                *existing = message;
            }
            None => history.push(message),
        }
        Ok(())
    }
}

//! Message store trait — where conversation history lives.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::message::{ConversationId, Message};

/// Persisted, ordered history per conversation.
///
/// The core never deletes persisted messages. `append` with the id of a
/// message already stored replaces it in place, which is how resolved tool
/// parts are written back.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Backend name (e.g., "in-memory").
    fn name(&self) -> &str;

    /// The ordered message list. Unknown conversations are empty.
    async fn get(&self, conversation: &ConversationId) -> Result<Vec<Message>, StoreError>;

    /// Append a message, or replace the stored message with the same id.
    async fn append(&self, conversation: &ConversationId, message: Message) -> Result<(), StoreError>;
}

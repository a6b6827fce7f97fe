use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ remove_by_id, upsert_front, ConversationStore };
use crate::error::ChatError;
use crate::models::chat::SavedConversation;

#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: Mutex<Vec<SavedConversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn list_all(&self) -> Result<Vec<SavedConversation>, ChatError> {
        Ok(self.conversations.lock().await.clone())
    }

    async fn upsert(&self, conversation: SavedConversation) -> Result<(), ChatError> {
        upsert_front(&mut *self.conversations.lock().await, conversation);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, ChatError> {
        Ok(remove_by_id(&mut *self.conversations.lock().await, id))
    }
}

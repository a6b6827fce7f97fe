mod file;
mod memory;

use async_trait::async_trait;
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::error::ChatError;
use crate::models::chat::SavedConversation;

pub use self::file::JsonConversationStore;
pub use self::memory::MemoryConversationStore;

pub const CONVERSATIONS_FILE: &str = "conversations.json";

/// Saved conversations, most recent first. One record per id.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<SavedConversation>, ChatError>;

    /// Replaces any record with the same id and moves it to the front.
    async fn upsert(&self, conversation: SavedConversation) -> Result<(), ChatError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, ChatError>;

    async fn get(&self, id: &str) -> Result<Option<SavedConversation>, ChatError> {
        Ok(self.list_all().await?.into_iter().find(|c| c.id == id))
    }
}

fn upsert_front(conversations: &mut Vec<SavedConversation>, conversation: SavedConversation) {
    conversations.retain(|c| c.id != conversation.id);
    conversations.insert(0, conversation);
}

fn remove_by_id(conversations: &mut Vec<SavedConversation>, id: &str) -> bool {
    let before = conversations.len();
    conversations.retain(|c| c.id != id);
    conversations.len() != before
}

pub async fn create_conversation_store(
    history_type: &str,
    data_dir: &Path
) -> Result<Arc<dyn ConversationStore>, ChatError> {
    match history_type.to_lowercase().as_str() {
        "file" => {
            let store = JsonConversationStore::open(data_dir.join(CONVERSATIONS_FILE)).await?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryConversationStore::new())),
        _ => Err(ChatError::Config(format!("Unsupported history store type: {}", history_type))),
    }
}

pub async fn initialize_conversation_store(
    history_type: &str,
    data_dir: &Path
) -> Result<Arc<dyn ConversationStore>, ChatError> {
    info!("Chat history will be stored in: {} at {}", history_type, data_dir.display());
    create_conversation_store(history_type, data_dir).await
}

#[cfg(test)]
pub(crate) fn sample_conversation(id: &str, title: &str) -> SavedConversation {
    use crate::models::chat::ChatMessage;
    SavedConversation {
        id: id.to_string(),
        title: title.to_string(),
        messages: vec![ChatMessage::user("What is X?"), ChatMessage::assistant("X is Y.")],
        documents: Vec::new(),
        timestamp: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_front_replaces_and_moves_to_front() {
        let mut list = vec![sample_conversation("a", "A"), sample_conversation("b", "B")];
        upsert_front(&mut list, sample_conversation("b", "B2"));
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "b");
        assert_eq!(list[0].title, "B2");
        assert_eq!(list[1].id, "a");
    }

    #[test]
    fn test_remove_by_id() {
        let mut list = vec![sample_conversation("a", "A")];
        assert!(!remove_by_id(&mut list, "missing"));
        assert!(remove_by_id(&mut list, "a"));
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_store_type() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_conversation_store("redis", dir.path()).await;
        assert!(matches!(result, Err(ChatError::Config(_))));
    }

    #[tokio::test]
    async fn test_get_uses_list_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_conversation_store("memory", dir.path()).await.unwrap();
        store.upsert(sample_conversation("a", "A")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().map(|c| c.title), Some("A".to_string()));
        assert!(store.get("b").await.unwrap().is_none());
    }
}

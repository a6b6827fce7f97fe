use async_trait::async_trait;
use log::{ debug, info };
use std::path::{ Path, PathBuf };
use tokio::sync::Mutex;

use super::{ remove_by_id, upsert_front, ConversationStore };
use crate::error::ChatError;
use crate::models::chat::SavedConversation;

/// Conversations kept as one JSON array on disk, rewritten on every change.
pub struct JsonConversationStore {
    path: PathBuf,
    conversations: Mutex<Vec<SavedConversation>>,
}

impl JsonConversationStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref().to_path_buf();
        let conversations: Vec<SavedConversation> = match tokio::fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!("Loaded {} saved conversations from {}", conversations.len(), path.display());
        Ok(Self { path, conversations: Mutex::new(conversations) })
    }

    async fn persist(&self, conversations: &[SavedConversation]) -> Result<(), ChatError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(conversations)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Wrote {} conversations to {}", conversations.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for JsonConversationStore {
    async fn list_all(&self) -> Result<Vec<SavedConversation>, ChatError> {
        Ok(self.conversations.lock().await.clone())
    }

    async fn upsert(&self, conversation: SavedConversation) -> Result<(), ChatError> {
        let mut conversations = self.conversations.lock().await;
        let mut updated = conversations.clone();
        upsert_front(&mut updated, conversation);
        self.persist(&updated).await?;
        *conversations = updated;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, ChatError> {
        let mut conversations = self.conversations.lock().await;
        let mut updated = conversations.clone();
        if !remove_by_id(&mut updated, id) {
            return Ok(false);
        }
        self.persist(&updated).await?;
        *conversations = updated;
        Ok(true)
    }
}

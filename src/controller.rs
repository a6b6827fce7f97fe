use chrono::Utc;
use log::{ error, info, warn };
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::completion::CompletionClient;
use crate::config::settings::{ SettingsStore, API_KEY_SETTING };
use crate::connectivity::ConnectivitySignal;
use crate::context::{ build_request, read_document };
use crate::error::{ ChatError, RetryNotice, ValidationError };
use crate::history::ConversationStore;
use crate::models::chat::{ ChatMessage, DocumentItem, SavedConversation };
use crate::session::{ SessionId, SessionState };
use crate::status::UiState;

#[derive(Debug)]
pub enum SendOutcome {
    /// A message was already sent in this session. Nothing happened.
    Ignored,
    /// A precondition failed before any network call.
    Rejected(ChatError),
    Answered(ChatMessage),
    Failed(ChatError),
}

/// Owns the session on screen and is the only writer to the conversation store.
pub struct ConversationController {
    session: SessionState,
    ui: UiState,
    client: CompletionClient,
    conversations: Arc<dyn ConversationStore>,
    settings: Arc<dyn SettingsStore>,
    connectivity: ConnectivitySignal,
}

impl ConversationController {
    pub fn new(
        client: CompletionClient,
        conversations: Arc<dyn ConversationStore>,
        settings: Arc<dyn SettingsStore>,
        connectivity: ConnectivitySignal
    ) -> Self {
        Self {
            session: SessionState::default(),
            ui: UiState::default(),
            client,
            conversations,
            settings,
            connectivity,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    pub fn set_draft(&mut self, text: &str) {
        self.session.draft = text.to_string();
        self.ui.clear_status();
    }

    pub fn set_title(&mut self, title: &str) {
        self.session.title = title.trim().to_string();
    }

    pub fn add_document(&mut self, item: DocumentItem) -> &DocumentItem {
        self.session.documents.add(item)
    }

    pub async fn attach_file(&mut self, path: &Path) -> Result<&DocumentItem, ChatError> {
        let item = read_document(path).await?;
        info!("Attached '{}' ({})", item.name, item.doc_type);
        Ok(self.session.documents.add(item))
    }

    pub fn remove_document(&mut self, index: usize) -> Option<DocumentItem> {
        self.session.documents.remove(index)
    }

    pub async fn api_key(&self) -> Result<Option<String>, ChatError> {
        self.settings.get(API_KEY_SETTING).await
    }

    pub async fn set_api_key(&self, key: &str) -> Result<(), ChatError> {
        self.settings.set(API_KEY_SETTING, key.trim()).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SavedConversation>, ChatError> {
        self.conversations.list_all().await
    }

    /// Upserts the session under its id, minting one on first save. Returns the
    /// id, or `None` when there is nothing to save.
    pub async fn save_session(&mut self) -> Result<Option<String>, ChatError> {
        if self.session.messages.is_empty() {
            return Ok(None);
        }

        let id = match &self.session.id {
            SessionId::Saved(id) => id.clone(),
            SessionId::New => Uuid::now_v7().to_string(),
        };
        let record = SavedConversation {
            id: id.clone(),
            title: self.session.display_title(),
            messages: self.session.messages.clone(),
            documents: self.session.documents.to_vec(),
            timestamp: Utc::now(),
        };
        self.conversations.upsert(record).await?;
        self.session.id = SessionId::Saved(id.clone());
        info!("Saved conversation {}", id);
        Ok(Some(id))
    }

    pub async fn create_session(&mut self) -> Result<(), ChatError> {
        self.save_session().await?;
        self.session = SessionState::default();
        self.ui = UiState::default();
        Ok(())
    }

    pub async fn load_session(&mut self, id: &str) -> Result<(), ChatError> {
        self.save_session().await?;
        let saved = self.conversations
            .get(id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))?;
        info!("Loaded conversation {} ({} messages)", id, saved.messages.len());
        self.session = SessionState::from_saved(saved);
        self.ui = UiState::default();
        Ok(())
    }

    pub async fn delete_session(&mut self, id: &str) -> Result<bool, ChatError> {
        let removed = self.conversations.delete(id).await?;
        if self.session.is_active(id) {
            // The record is gone, so the fresh session must not save it back.
            self.session = SessionState::default();
            self.ui = UiState::default();
        }
        Ok(removed)
    }

    pub async fn rename_session(&mut self, id: &str, title: &str) -> Result<(), ChatError> {
        let mut saved = self.conversations
            .get(id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))?;
        saved.title = title.trim().to_string();
        self.conversations.upsert(saved).await?;
        if self.session.is_active(id) {
            self.session.title = title.trim().to_string();
        }
        Ok(())
    }

    /// Sends the draft as this session's single question.
    pub async fn send_message<F>(&mut self, mut on_retry: F) -> SendOutcome
        where F: FnMut(&RetryNotice)
    {
        if self.session.sent {
            info!("Ignoring send: {}", ValidationError::AlreadySent);
            return SendOutcome::Ignored;
        }

        let prompt = self.session.draft.trim().to_string();
        let api_key = match self.check_preconditions(&prompt).await {
            Ok(key) => key,
            Err(err) => {
                warn!("Send rejected: {}", err);
                self.ui.show_error(&err);
                return SendOutcome::Rejected(err);
            }
        };

        self.session.sent = true;
        self.ui.begin_request();

        let user_message = ChatMessage::user(prompt);
        let request = build_request(
            &self.session.messages,
            self.session.documents.list(),
            &user_message
        );
        self.session.messages.push(user_message);
        self.session.draft.clear();

        let ui = &mut self.ui;
        let result = self.client.complete(&api_key, &request, |notice| {
            ui.show_retry(notice);
            on_retry(notice);
        }).await;
        self.ui.finish(&result);

        match result {
            Ok(reply) => {
                self.session.messages.push(reply.clone());
                if let Err(e) = self.save_session().await {
                    error!("Failed to save conversation: {}", e);
                    self.ui.show_error(&e);
                }
                SendOutcome::Answered(reply)
            }
            Err(err) => {
                error!("Send failed: {}", err);
                SendOutcome::Failed(err)
            }
        }
    }

    async fn check_preconditions(&self, prompt: &str) -> Result<String, ChatError> {
        if prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt.into());
        }
        if self.session.documents.is_empty() {
            return Err(ValidationError::NoDocuments.into());
        }
        let api_key = self
            .api_key().await?
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingApiKey)?;
        if !self.connectivity.is_online() {
            return Err(ChatError::Offline);
        }
        Ok(api_key)
    }
}

use crate::context::DocumentCollector;
use crate::models::chat::{ ChatMessage, Role, SavedConversation };

pub const DEFAULT_TITLE: &str = "New Chat";
const DERIVED_TITLE_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionId {
    /// Not saved yet; an id is minted on first save.
    New,
    Saved(String),
}

impl SessionId {
    pub fn as_saved(&self) -> Option<&str> {
        match self {
            SessionId::New => None,
            SessionId::Saved(id) => Some(id),
        }
    }
}

/// Transient state of the conversation on screen.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: SessionId,
    pub title: String,
    pub draft: String,
    pub messages: Vec<ChatMessage>,
    pub documents: DocumentCollector,
    /// Set at the start of a send and never cleared for the rest of the session.
    pub sent: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            id: SessionId::New,
            title: String::new(),
            draft: String::new(),
            messages: Vec::new(),
            documents: DocumentCollector::new(),
            sent: false,
        }
    }
}

impl SessionState {
    pub fn from_saved(saved: SavedConversation) -> Self {
        let sent = !saved.messages.is_empty();
        Self {
            id: SessionId::Saved(saved.id),
            title: saved.title,
            draft: String::new(),
            messages: saved.messages,
            documents: DocumentCollector::from_items(saved.documents),
            sent,
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.id.as_saved() == Some(id)
    }

    /// Draft title, else the start of the first user message, else a default.
    pub fn display_title(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        self.messages
            .iter()
            .find(|m| m.role == Role::User && !m.content.trim().is_empty())
            .map(|m| {
                let content = m.content.trim();
                let mut title: String = content.chars().take(DERIVED_TITLE_CHARS).collect();
                if content.chars().count() > DERIVED_TITLE_CHARS {
                    title.push_str("...");
                }
                title
            })
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_sent_flag_follows_transcript() {
        let mut saved = crate::history::sample_conversation("a", "A");
        assert!(SessionState::from_saved(saved.clone()).sent);

        saved.messages.clear();
        let session = SessionState::from_saved(saved);
        assert!(!session.sent);
        assert_eq!(session.id, SessionId::Saved("a".to_string()));
    }

    #[test]
    fn test_display_title() {
        let mut session = SessionState::default();
        assert_eq!(session.display_title(), DEFAULT_TITLE);

        session.messages.push(ChatMessage::user("  What is X?  "));
        assert_eq!(session.display_title(), "What is X?");

        session.messages[0] = ChatMessage::user("x".repeat(50));
        assert_eq!(session.display_title(), format!("{}...", "x".repeat(40)));

        session.title = "Facts".to_string();
        assert_eq!(session.display_title(), "Facts");
    }
}

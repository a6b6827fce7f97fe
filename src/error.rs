use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Precondition failures detected before any network attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A message was already sent in this chat. Start a new chat to ask another question.")]
    AlreadySent,
    #[error("Please enter a message.")]
    EmptyPrompt,
    #[error("Please attach at least one document before sending.")]
    NoDocuments,
    #[error("Please enter your API key.")]
    MissingApiKey,
}

/// The last thing that went wrong with a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Http { status: u16, message: String },
    Transport(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Http { status, message } => write!(f, "API error ({}): {}", status, message),
            Failure::Transport(message) => write!(f, "Network error: {}", message),
        }
    }
}

/// Informational, non-terminal: a retryable failure and the wait before the next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryNotice {
    pub failure: Failure,
    /// 1-based number of the retry about to happen.
    pub attempt: u32,
    pub max_retries: u32,
    pub delay: Duration,
}

impl fmt::Display for RetryNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. Retrying in ", self.failure)?;
        if self.delay < Duration::from_secs(1) {
            write!(f, "{}ms", self.delay.as_millis())?;
        } else {
            write!(f, "{}s", self.delay.as_secs())?;
        }
        write!(f, " (attempt {}/{})", self.attempt, self.max_retries)
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("You appear to be offline. Check your connection and try again.")]
    Offline,
    #[error("{0}")]
    RetryableServer(RetryNotice),
    #[error("API error ({status}): {message}")]
    FatalServer { status: u16, message: String },
    #[error("Request failed after max retries ({max_retries}). Last error: {last}")]
    RetriesExhausted { max_retries: u32, last: Failure },
    #[error("No response received from the assistant.")]
    NoAssistantContent,
    #[error("Request ended in an unexpected state: {0}")]
    InvalidState(String),
    #[error("Conversation not found: {0}")]
    SessionNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    /// Precondition-style errors are shown briefly and then cleared on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::Validation(_) | ChatError::Offline)
    }
}

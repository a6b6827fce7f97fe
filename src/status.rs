//! Loading/retrying indicators and the single status line shown to the user.

use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ ChatError, RetryNotice };
use crate::models::chat::ChatMessage;

/// How long validation and connectivity messages stay visible.
pub const TRANSIENT_STATUS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    expires_at: Option<Instant>,
}

impl StatusLine {
    pub fn is_visible(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub loading: bool,
    pub retrying: bool,
    status: Option<StatusLine>,
}

impl UiState {
    pub fn begin_request(&mut self) {
        self.loading = true;
        self.retrying = false;
        self.status = None;
    }

    pub fn show_retry(&mut self, notice: &RetryNotice) {
        self.retrying = true;
        let err = ChatError::RetryableServer(notice.clone());
        self.status = Some(StatusLine { text: err.to_string(), expires_at: None });
    }

    /// Transient errors expire on their own, everything else stays until cleared.
    pub fn show_error(&mut self, err: &ChatError) {
        let expires_at = if err.is_transient() {
            Some(Instant::now() + TRANSIENT_STATUS_TTL)
        } else {
            None
        };
        self.status = Some(StatusLine { text: err.to_string(), expires_at });
    }

    pub fn finish(&mut self, outcome: &Result<ChatMessage, ChatError>) {
        self.loading = false;
        self.retrying = false;
        match outcome {
            Ok(_) => {
                self.status = None;
            }
            Err(err) => self.show_error(err),
        }
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn status(&self) -> Option<&str> {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|line| line.is_visible(now))
            .map(|line| line.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ Failure, ValidationError };

    #[tokio::test(start_paused = true)]
    async fn test_validation_errors_clear_themselves() {
        let mut ui = UiState::default();
        ui.show_error(&ValidationError::EmptyPrompt.into());
        assert_eq!(ui.status(), Some("Please enter a message."));

        tokio::time::advance(TRANSIENT_STATUS_TTL).await;
        assert_eq!(ui.status(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_errors_persist() {
        let mut ui = UiState::default();
        ui.begin_request();
        ui.finish(&Err(ChatError::RetriesExhausted {
            max_retries: 5,
            last: Failure::Http { status: 500, message: "Unknown error".to_string() },
        }));
        assert!(!ui.loading);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(ui.status().unwrap().contains("max retries"));

        ui.clear_status();
        assert_eq!(ui.status(), None);
    }

    #[test]
    fn test_retry_then_success_clears_indicators() {
        let mut ui = UiState::default();
        ui.begin_request();
        ui.show_retry(&RetryNotice {
            failure: Failure::Http { status: 429, message: "Slow down".to_string() },
            attempt: 1,
            max_retries: 5,
            delay: Duration::from_secs(1),
        });
        assert!(ui.loading && ui.retrying);
        assert_eq!(
            ui.status(),
            Some("API error (429): Slow down. Retrying in 1s (attempt 1/5)")
        );

        ui.finish(&Ok(ChatMessage::assistant("done")));
        assert!(!ui.loading);
        assert!(!ui.retrying);
        assert_eq!(ui.status(), None);
    }
}

//! Retry state machine for one send.
//!
//! `Idle -> Attempting -> {Success, NoContent, RetryWait, Fatal, Exhausted}` with
//! `RetryWait -> Attempting` looping until the retry budget is spent. Transitions
//! are pure: [`next_state`] returns the new state plus the effects the driver
//! has to perform, and each non-terminal state asks for exactly one effect that
//! produces the next event.

use std::time::Duration;

use crate::error::{ Failure, RetryNotice };
use crate::llm::chat::openai::{ parse_completion_body, parse_error_message };
use crate::llm::chat::{ TransportError, TransportResponse };
use crate::models::chat::ChatMessage;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry `retry` (0-indexed): `base_delay * 2^retry`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        2u32.checked_pow(retry)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Fatal,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 | 500..=599 => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    /// `retries` counts the retries already spent before this attempt.
    Attempting { retries: u32 },
    RetryWait { retries: u32, delay: Duration },
    Success(ChatMessage),
    NoContent,
    Fatal { status: u16, message: String },
    Exhausted { last: Failure },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Success(_) |
                RetryState::NoContent |
                RetryState::Fatal { .. } |
                RetryState::Exhausted { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    Start,
    Response(TransportResponse),
    TransportFailed(TransportError),
    WaitElapsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SendRequest,
    Sleep(Duration),
    Notify(RetryNotice),
}

pub fn next_state(
    state: &RetryState,
    event: RetryEvent,
    policy: &RetryPolicy
) -> (RetryState, Vec<Effect>) {
    match (state, event) {
        (RetryState::Idle, RetryEvent::Start) => {
            (RetryState::Attempting { retries: 0 }, vec![Effect::SendRequest])
        }
        (RetryState::Attempting { retries }, RetryEvent::Response(resp)) => {
            match classify_status(resp.status) {
                StatusClass::Success =>
                    match parse_completion_body(&resp.body) {
                        Ok(Some(message)) => (RetryState::Success(message), Vec::new()),
                        Ok(None) => (RetryState::NoContent, Vec::new()),
                        Err(e) => {
                            let failure = Failure::Transport(
                                format!("invalid response body: {}", e)
                            );
                            retry_or_exhaust(*retries, failure, policy)
                        }
                    }
                StatusClass::Retryable => {
                    let failure = Failure::Http {
                        status: resp.status,
                        message: error_message(&resp.body),
                    };
                    retry_or_exhaust(*retries, failure, policy)
                }
                StatusClass::Fatal => {
                    let fatal = RetryState::Fatal {
                        status: resp.status,
                        message: error_message(&resp.body),
                    };
                    (fatal, Vec::new())
                }
            }
        }
        (RetryState::Attempting { retries }, RetryEvent::TransportFailed(err)) => {
            retry_or_exhaust(*retries, Failure::Transport(err.0), policy)
        }
        (RetryState::RetryWait { retries, .. }, RetryEvent::WaitElapsed) => {
            (RetryState::Attempting { retries: retries + 1 }, vec![Effect::SendRequest])
        }
        (state, _) => (state.clone(), Vec::new()),
    }
}

fn retry_or_exhaust(retries: u32, failure: Failure, policy: &RetryPolicy) -> (RetryState, Vec<Effect>) {
    if retries >= policy.max_retries {
        return (RetryState::Exhausted { last: failure }, Vec::new());
    }

    let delay = policy.backoff_delay(retries);
    let notice = RetryNotice {
        failure,
        attempt: retries + 1,
        max_retries: policy.max_retries,
        delay,
    };
    (RetryState::RetryWait { retries, delay }, vec![Effect::Notify(notice), Effect::Sleep(delay)])
}

fn error_message(body: &str) -> String {
    parse_error_message(body).unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

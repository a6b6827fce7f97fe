pub mod state;

use log::{ info, warn };
use std::sync::Arc;

use crate::error::{ ChatError, RetryNotice };
use crate::llm::chat::ChatTransport;
use crate::models::chat::ChatMessage;
use self::state::{ next_state, Effect, RetryEvent, RetryPolicy, RetryState };

/// Drives [`next_state`] against a transport until a terminal state is reached.
pub struct CompletionClient {
    transport: Arc<dyn ChatTransport>,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(transport: Arc<dyn ChatTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends `messages` until one terminal outcome is reached. `on_retry` is
    /// called before every backoff wait.
    pub async fn complete<F>(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
        mut on_retry: F
    ) -> Result<ChatMessage, ChatError>
        where F: FnMut(&RetryNotice)
    {
        let mut state = RetryState::Idle;
        let mut event = RetryEvent::Start;

        loop {
            let (next, effects) = next_state(&state, event, &self.policy);
            state = next;
            if state.is_terminal() {
                break;
            }

            let mut pending = None;
            for effect in effects {
                match effect {
                    Effect::Notify(notice) => {
                        warn!("{}", notice);
                        on_retry(&notice);
                    }
                    Effect::Sleep(delay) => {
                        tokio::time::sleep(delay).await;
                        pending = Some(RetryEvent::WaitElapsed);
                    }
                    Effect::SendRequest => {
                        if let RetryState::Attempting { retries } = &state {
                            info!(
                                "Completion attempt {}/{} to {}",
                                retries + 1,
                                self.policy.max_attempts(),
                                self.transport.get_base_url()
                            );
                        }
                        pending = Some(match self.transport.send(api_key, messages).await {
                            Ok(resp) => RetryEvent::Response(resp),
                            Err(err) => RetryEvent::TransportFailed(err),
                        });
                    }
                }
            }

            event = match pending {
                Some(event) => event,
                None => return Err(ChatError::InvalidState(format!("{:?}", state))),
            };
        }

        self.into_result(state)
    }

    fn into_result(&self, state: RetryState) -> Result<ChatMessage, ChatError> {
        match state {
            RetryState::Success(message) => Ok(message),
            RetryState::NoContent => Err(ChatError::NoAssistantContent),
            RetryState::Fatal { status, message } => Err(ChatError::FatalServer { status, message }),
            RetryState::Exhausted { last } =>
                Err(ChatError::RetriesExhausted { max_retries: self.policy.max_retries, last }),
            other => Err(ChatError::InvalidState(format!("{:?}", other))),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::llm::chat::{ ChatTransport, TransportError, TransportResponse };
    use crate::models::chat::ChatMessage;

    pub const OK_BODY: &str =
        r#"{"choices":[{"message":{"role":"assistant","content":"X is Y."}}]}"#;

    /// Replays canned results in order; panics if called more often than scripted.
    #[derive(Default)]
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, status: u16, body: &str) -> Self {
            self.script
                .lock()
                .unwrap()
                .push_back(Ok(TransportResponse { status, body: body.to_string() }));
            self
        }

        pub fn respond_times(mut self, times: usize, status: u16, body: &str) -> Self {
            for _ in 0..times {
                self = self.respond(status, body);
            }
            self
        }

        pub fn fail(self, message: &str) -> Self {
            self.script.lock().unwrap().push_back(Err(TransportError(message.to_string())));
            self
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_request(&self) -> Option<Vec<ChatMessage>> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(
            &self,
            _api_key: &str,
            messages: &[ChatMessage]
        ) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(messages.to_vec());
            self.script.lock().unwrap().pop_front().expect("transport called more often than scripted")
        }

        fn get_model(&self) -> String {
            "scripted".to_string()
        }

        fn get_base_url(&self) -> String {
            "scripted://completions".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{ ScriptedTransport, OK_BODY };
    use crate::error::Failure;
    use std::time::Duration;
    use tokio::time::Instant;

    fn client(transport: &Arc<ScriptedTransport>) -> CompletionClient {
        CompletionClient::new(transport.clone(), RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_succeeds() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, OK_BODY));
        let mut notices = Vec::new();

        let reply = client(&transport)
            .complete("sk-test", &[ChatMessage::user("What is X?")], |n| notices.push(n.clone()))
            .await
            .unwrap();

        assert_eq!(reply, ChatMessage::assistant("X is Y."));
        assert_eq!(transport.calls(), 1);
        assert!(notices.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_five_times_then_success() {
        let transport = Arc::new(
            ScriptedTransport::new().respond_times(5, 429, "").respond(200, OK_BODY)
        );
        let mut notices = Vec::new();
        let started = Instant::now();

        let reply = client(&transport)
            .complete("sk-test", &[ChatMessage::user("What is X?")], |n| notices.push(n.clone()))
            .await
            .unwrap();

        assert_eq!(reply.content, "X is Y.");
        assert_eq!(transport.calls(), 6);
        assert!(started.elapsed() >= Duration::from_secs(31));
        let delays: Vec<u64> = notices.iter().map(|n| n.delay.as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
        let attempts: Vec<u32> = notices.iter().map(|n| n.attempt).collect();
        assert_eq!(attempts, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_exhaust_retries() {
        let transport = Arc::new(ScriptedTransport::new().respond_times(6, 500, ""));

        let err = client(&transport)
            .complete("sk-test", &[ChatMessage::user("What is X?")], |_| {})
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 6);
        assert!(matches!(
            err,
            ChatError::RetriesExhausted { max_retries: 5, last: Failure::Http { status: 500, .. } }
        ));
        assert!(err.to_string().contains("max retries"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_share_the_budget() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail("dns error")
                .respond(503, r#"{"error":{"message":"overloaded"}}"#)
                .fail("connection reset")
                .respond(200, OK_BODY)
        );
        let mut notices = Vec::new();

        let reply = client(&transport)
            .complete("sk-test", &[ChatMessage::user("q")], |n| notices.push(n.to_string()))
            .await
            .unwrap();

        assert_eq!(reply.content, "X is Y.");
        assert_eq!(notices, vec![
            "Network error: dns error. Retrying in 1s (attempt 1/5)".to_string(),
            "API error (503): overloaded. Retrying in 2s (attempt 2/5)".to_string(),
            "Network error: connection reset. Retrying in 4s (attempt 3/5)".to_string(),
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_status_stops_immediately() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(401, r#"{"error":{"message":"Invalid API key"}}"#)
        );

        let err = client(&transport)
            .complete("sk-bad", &[ChatMessage::user("q")], |_| {})
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert_eq!(err.to_string(), "API error (401): Invalid API key");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_content_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, r#"{"choices":[]}"#));

        let err = client(&transport)
            .complete("sk-test", &[ChatMessage::user("q")], |_| {})
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert!(matches!(err, ChatError::NoAssistantContent));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_the_full_message_list_every_attempt() {
        let transport = Arc::new(ScriptedTransport::new().respond(500, "").respond(200, OK_BODY));
        let messages = vec![ChatMessage::system("X is Y."), ChatMessage::user("What is X?")];

        client(&transport).complete("sk-test", &messages, |_| {}).await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(transport.last_request(), Some(messages));
    }
}

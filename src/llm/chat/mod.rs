pub mod openai;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use thiserror::Error;
use url::Url;
use super::LlmConfig;
use self::openai::OpenAIChatClient;
use crate::error::ChatError;
use crate::models::chat::ChatMessage;

/// Status and raw body of one completed HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced an HTTP status (DNS, connect, timeout, reset).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Performs one attempt. Non-2xx statuses are returned as `Ok`, classification
    /// is up to the caller.
    async fn send(
        &self,
        api_key: &str,
        messages: &[ChatMessage]
    ) -> Result<TransportResponse, TransportError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatTransport>, ChatError> {
    let endpoint = config.endpoint();
    Url::parse(&endpoint).map_err(|e|
        ChatError::Config(format!("Invalid completion endpoint '{}': {}", endpoint, e))
    )?;

    let client = OpenAIChatClient::from_config(config)?;
    info!(
        "Chat client configured: Type={}, Model={}, Endpoint={}",
        config.llm_type,
        client.get_model(),
        client.get_base_url()
    );
    Ok(Arc::new(client))
}

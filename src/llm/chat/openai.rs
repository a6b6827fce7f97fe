use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE}};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatTransport, TransportError, TransportResponse};
use crate::error::ChatError;
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;

pub const TEMPERATURE: f32 = 1.0;
pub const MAX_TOKENS: u32 = 1000;
pub const TOP_P: f32 = 1.0;

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorBody,
}

#[derive(Deserialize)]
struct OpenAIErrorBody {
    message: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        model: String,
        base_url: String,
        config: &LlmConfig,
    ) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        Self::new(config.model(), config.endpoint(), config)
    }
}

#[async_trait]
impl ChatTransport for OpenAIChatClient {
    async fn send(
        &self,
        api_key: &str,
        messages: &[ChatMessage]
    ) -> Result<TransportResponse, TransportError> {
        let req = OpenAIChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OpenAIMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        debug!("POST {} with {} messages", self.base_url, messages.len());
        let resp = self.http.post(&self.base_url)
            .bearer_auth(api_key.trim())
            .json(&req)
            .send()
            .await
            .map_err(describe_reqwest_error)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(describe_reqwest_error)?;
        debug!("Completion endpoint answered {} ({} bytes)", status, body.len());

        Ok(TransportResponse { status, body })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}

fn describe_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError(format!("request timed out: {}", e))
    } else if e.is_connect() {
        TransportError(format!("could not connect: {}", e))
    } else {
        TransportError(e.to_string())
    }
}

/// Extracts the assistant reply from a success body.
///
/// `Err` means the body is not JSON at all. Any JSON document without a
/// non-blank string at `choices[0].message.content` is `Ok(None)`.
pub fn parse_completion_body(body: &str) -> Result<Option<ChatMessage>, serde_json::Error> {
    let resp: Value = serde_json::from_str(body)?;
    let content = resp
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty());
    Ok(content.map(ChatMessage::assistant))
}

/// Server-supplied `error.message`, if the body carries one.
pub fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<OpenAIErrorResponse>(body)
        .ok()
        .and_then(|resp| resp.error.message)
        .filter(|message| !message.trim().is_empty())
}

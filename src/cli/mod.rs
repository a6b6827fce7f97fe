use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::completion::state::{ RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES };
use crate::error::ChatError;
use crate::llm::{ LlmConfig, LlmType };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// API key for the chat provider. Stored in the settings file when given.
    #[arg(long, env = "CHAT_API_KEY")]
    pub api_key: Option<String>,

    /// Type of LLM provider for chat completion (openai, groq, deepseek, xai)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub llm_type: String,

    /// Full chat completions URL. Defaults to the provider's endpoint.
    #[arg(long, env = "CHAT_BASE_URL")]
    pub base_url: Option<String>,

    /// Model name for chat completion (e.g., gpt-4o-mini, llama-3.1-8b-instant)
    #[arg(long, env = "CHAT_MODEL")]
    pub model: Option<String>,

    // --- Retry Args ---
    /// Retries after the first attempt for 429, 5xx and network failures.
    #[arg(long, env = "MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds, doubled on every retry.
    #[arg(long, env = "RETRY_BASE_DELAY_MS", default_value_t = DEFAULT_BASE_DELAY.as_millis() as u64)]
    pub retry_base_delay_ms: u64,

    /// Timeout for a single HTTP attempt, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "60")]
    pub request_timeout_secs: u64,

    // --- Storage Args ---
    /// Directory holding settings.json and conversations.json.
    #[arg(long, env = "DATA_DIR", default_value = ".doc-chat")]
    pub data_dir: PathBuf,

    /// Conversation store type (file, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    // --- General App Args ---
    /// Start in offline mode. Toggle with /online and /offline.
    #[arg(long, default_value = "false")]
    pub offline: bool,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn llm_config(&self) -> Result<LlmConfig, ChatError> {
        let llm_type: LlmType = self.llm_type
            .parse()
            .map_err(|e| ChatError::Config(format!("{}", e)))?;
        if self.request_timeout_secs == 0 {
            return Err(ChatError::Config("request timeout must be at least 1 second".to_string()));
        }
        Ok(LlmConfig {
            llm_type,
            completion_model: self.model.clone(),
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["doc-chat"]).unwrap();
        assert_eq!(args.retry_policy(), RetryPolicy::default());
        assert_eq!(args.history_type, "file");
        assert!(!args.offline);

        let config = args.llm_config().unwrap();
        assert_eq!(config.llm_type, LlmType::OpenAI);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "doc-chat",
            "--llm-type",
            "groq",
            "--model",
            "llama3-70b",
            "--max-retries",
            "2",
            "--retry-base-delay-ms",
            "250",
            "--offline",
        ]).unwrap();

        let config = args.llm_config().unwrap();
        assert_eq!(config.llm_type, LlmType::Groq);
        assert_eq!(config.model(), "llama3-70b");
        assert_eq!(args.retry_policy(), RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        });
        assert!(args.offline);
    }

    #[test]
    fn test_unknown_llm_type_is_config_error() {
        let args = Args::try_parse_from(["doc-chat", "--llm-type", "ollama"]).unwrap();
        assert!(matches!(args.llm_config(), Err(ChatError::Config(_))));
    }
}

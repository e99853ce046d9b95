pub mod huggingface;
pub mod openai;
pub mod gemini;
pub mod relay;

use async_trait::async_trait;
use log::{ debug, error };
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use super::{ LlmConfig, LlmType };
use self::huggingface::HuggingFaceChatClient;
use self::openai::OpenAIChatClient;
use self::gemini::GeminiChatClient;
use self::relay::RelayChatClient;
use crate::config::prompt::Prompt;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: LlmType,
        status: u16,
        body: String,
    },
    #[error("{provider} returned a malformed payload: {reason}")]
    Malformed {
        provider: LlmType,
        reason: String,
    },
    #[error("{0} returned no generated text")]
    EmptyResponse(LlmType),
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

/// One capability per provider: turn a prompt into generated text.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError>;

    fn llm_type(&self) -> LlmType;
    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::HuggingFace => {
            let specific_client = HuggingFaceChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::DeepSeek | LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Relay => {
            let specific_client = RelayChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

pub(crate) fn require_api_key(config: &LlmConfig) -> Result<String, LlmError> {
    config.api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| LlmError::Config(format!("{} API key is required", config.llm_type)))
}

/// Sends a prepared request and decodes a 2xx JSON body. Anything else is an error;
/// the provider's own error body is kept for logging only.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: LlmType,
    req: reqwest::RequestBuilder
) -> Result<T, LlmError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!("{} API error (HTTP {}): {}", provider, status.as_u16(), body);
        return Err(LlmError::Status { provider, status: status.as_u16(), body });
    }
    let bytes = resp.bytes().await?;
    debug!("{} raw response: {}", provider, String::from_utf8_lossy(&bytes));
    serde_json::from_slice::<T>(&bytes).map_err(|e| LlmError::Malformed {
        provider,
        reason: e.to_string(),
    })
}

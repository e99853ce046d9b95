use async_trait::async_trait;
use reqwest::Client as HttpClient;
use log::info;

use super::{ send_json, ChatClient, LlmError };
use crate::config::prompt::Prompt;
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ ChatRequest, ChatResponse };

const DEFAULT_RELAY_URL: &str = "http://localhost:5000";
const CHAT_ROUTE: &str = "/api/chat";

/// Talks to this crate's own relay. The relay owns the template, so only the
/// user's raw text goes over the wire.
#[derive(Debug)]
pub struct RelayChatClient {
    http: HttpClient,
    url: String,
}

impl RelayChatClient {
    pub fn new(base_url: Option<String>) -> Result<Self, LlmError> {
        let base = base_url.unwrap_or_else(|| DEFAULT_RELAY_URL.to_string());
        let trimmed = base.trim_end_matches('/');
        let url = if trimmed.ends_with(CHAT_ROUTE) {
            trimmed.to_string()
        } else {
            format!("{}{}", trimmed, CHAT_ROUTE)
        };
        let http = HttpClient::builder().build()?;
        Ok(Self { http, url })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for RelayChatClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let req = ChatRequest { input: prompt.user.clone() };
        info!("RelayChatClient::generate() → url={}", self.url);
        let resp: ChatResponse = send_json(LlmType::Relay, self.http.post(&self.url).json(&req)).await?;
        Ok(resp.response)
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Relay
    }

    fn get_model(&self) -> String {
        "relay".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

use async_trait::async_trait;
use log::info;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };

use super::{ require_api_key, send_json, ChatClient, LlmError };
use crate::config::prompt::Prompt;
use crate::llm::{ LlmConfig, LlmType, SamplingParams };

const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/chat/completions";
const DEEPSEEK_MODEL: &str = "deepseek-chat";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o";
const COMPLETIONS_ROUTE: &str = "/chat/completions";

/// Chat-completions client for DeepSeek and any other OpenAI-compatible endpoint.
pub struct OpenAIChatClient {
    http: HttpClient,
    llm_type: LlmType,
    model: String,
    url: String,
    sampling: SamplingParams,
}

#[derive(Serialize, Deserialize, Debug)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

/// A configured URL is used as-is when it already names the completions route.
fn completions_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_ROUTE) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, COMPLETIONS_ROUTE)
    }
}

impl OpenAIChatClient {
    pub fn new(
        llm_type: LlmType,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        sampling: SamplingParams
    ) -> Result<Self, LlmError> {
        let (default_url, default_model) = match llm_type {
            LlmType::OpenAI => (OPENAI_API_URL, OPENAI_MODEL),
            _ => (DEEPSEEK_API_URL, DEEPSEEK_MODEL),
        };
        let chat_model = model.unwrap_or_else(|| default_model.to_string());
        let api_url = base_url
            .map(|u| completions_url(&u))
            .unwrap_or_else(|| default_url.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                LlmError::Config(format!("Invalid API key format: {}", e))
            )?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            llm_type,
            model: chat_model,
            url: api_url,
            sampling,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = require_api_key(config)?;
        Self::new(
            config.llm_type,
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.sampling
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                }
            ],
            temperature: self.sampling.temperature,
            max_tokens: self.sampling.max_tokens,
            stream: false,
        };

        info!("{} chat completion → model={} url={}", self.llm_type, self.model, self.url);
        let resp: OpenAIResponse = send_json(self.llm_type, self.http.post(&self.url).json(&req)).await?;

        let content = resp.choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse(self.llm_type))?
            .message.content;

        Ok(content)
    }

    fn llm_type(&self) -> LlmType {
        self.llm_type
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

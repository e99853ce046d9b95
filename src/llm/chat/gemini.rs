use async_trait::async_trait;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use log::info;

use super::{ require_api_key, send_json, ChatClient, LlmError };
use crate::config::prompt::Prompt;
use crate::llm::{ LlmConfig, LlmType, SamplingParams };

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

pub struct GeminiChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    sampling: SamplingParams,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        sampling: SamplingParams
    ) -> Result<Self, LlmError> {
        let chat_model = model.unwrap_or_else(|| GEMINI_MODEL.to_string());
        let base_url = base_url
            .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&api_key).map_err(|e|
                LlmError::Config(format!("Invalid API key format: {}", e))
            )?
        );
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self { http, model: chat_model, base_url, sampling })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = require_api_key(config)?;
        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.sampling
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let payload = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: prompt.system.clone() }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt.user.clone() }],
            }],
            generation_config: GenerationConfig {
                temperature: self.sampling.temperature,
                max_output_tokens: self.sampling.max_tokens,
            },
        };

        let url = self.endpoint();
        info!("GeminiChatClient::generate() → model={} url={}", self.model, url);
        let resp: GeminiResponse = send_json(LlmType::Gemini, self.http.post(&url).json(&payload)).await?;

        let text: String = resp.candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse(LlmType::Gemini));
        }
        Ok(text)
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Gemini
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

use async_trait::async_trait;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use log::info;

use super::{ require_api_key, send_json, ChatClient, LlmError };
use crate::config::prompt::Prompt;
use crate::llm::{ LlmConfig, LlmType, SamplingParams };

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
const HF_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.1";

#[derive(Serialize)]
struct GenerateRequest {
    inputs: String,
    parameters: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    temperature: f32,
    max_new_tokens: u32,
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Text-generation inference endpoint; the prompt is sent inline as one string.
#[derive(Debug)]
pub struct HuggingFaceChatClient {
    http: HttpClient,
    model: String,
    url: String,
    sampling: SamplingParams,
}

impl HuggingFaceChatClient {
    /// `base_url`, when set, is the full model endpoint.
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        sampling: SamplingParams
    ) -> Result<Self, LlmError> {
        let model = model.unwrap_or_else(|| HF_MODEL.to_string());
        let url = base_url.unwrap_or_else(|| format!("{}/{}", HF_INFERENCE_URL, model));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                LlmError::Config(format!("Invalid API key format: {}", e))
            )?
        );
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self { http, model, url, sampling })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.llm_type != LlmType::HuggingFace {
            return Err(LlmError::Config("Invalid config type for HuggingFaceChatClient".into()));
        }
        let api_key = require_api_key(config)?;
        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.sampling
        )
    }
}

#[async_trait]
impl ChatClient for HuggingFaceChatClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let req = GenerateRequest {
            inputs: prompt.inline(),
            parameters: GenerateParameters {
                temperature: self.sampling.temperature,
                max_new_tokens: self.sampling.max_tokens,
            },
        };

        info!("HuggingFaceChatClient::generate() → model={} url={}", self.model, self.url);
        let data: Vec<GeneratedText> = send_json(
            LlmType::HuggingFace,
            self.http.post(&self.url).json(&req)
        ).await?;

        data.into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or(LlmError::EmptyResponse(LlmType::HuggingFace))
    }

    fn llm_type(&self) -> LlmType {
        LlmType::HuggingFace
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

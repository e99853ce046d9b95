pub mod chat;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;

/// Default sampling temperature sent to every provider.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default cap on generated tokens sent to every provider.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    HuggingFace,
    DeepSeek,
    OpenAI,
    Gemini,
    Relay,
}

impl LlmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmType::HuggingFace => "huggingface",
            LlmType::DeepSeek => "deepseek",
            LlmType::OpenAI => "openai",
            LlmType::Gemini => "gemini",
            LlmType::Relay => "relay",
        }
    }

    /// The relay applies its own credentials; every other provider needs a key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmType::Relay)
    }
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}

impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(LlmType::HuggingFace),
            "deepseek" => Ok(LlmType::DeepSeek),
            "openai" => Ok(LlmType::OpenAI),
            "gemini" | "google" => Ok(LlmType::Gemini),
            "relay" => Ok(LlmType::Relay),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub sampling: SamplingParams,
}

impl LlmConfig {
    pub fn new(llm_type: LlmType) -> Self {
        Self {
            llm_type,
            api_key: None,
            completion_model: None,
            base_url: None,
            sampling: SamplingParams::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::new(LlmType::HuggingFace)
    }
}

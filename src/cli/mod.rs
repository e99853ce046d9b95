use clap::{ Parser, Subcommand };

use crate::llm::{ LlmConfig, LlmType, SamplingParams, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE };
use crate::server::api::TlsPaths;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Model UN assistant: prompt relay and terminal chat client", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the prompt relay (`POST /api/chat`).
    Serve(ServeArgs),
    /// Chat with the assistant in the terminal.
    Chat(ChatArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct SamplingArgs {
    /// Sampling temperature sent to the provider
    #[arg(long, env = "TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Cap on generated tokens
    #[arg(long, env = "MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
}

impl SamplingArgs {
    pub fn params(&self) -> SamplingParams {
        SamplingParams { temperature: self.temperature, max_tokens: self.max_tokens }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port the relay listens on
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Provider the relay forwards to (huggingface, deepseek, openai, gemini; not relay)
    #[arg(long, env = "RELAY_LLM_TYPE", default_value = "huggingface")]
    pub llm_type: LlmType,

    /// API key for the relay's provider
    #[arg(long, env = "HF_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Provider endpoint override (full model URL for Hugging Face)
    #[arg(long, env = "RELAY_BASE_URL")] // adapters pick their own default when unset
    pub base_url: Option<String>,

    /// Model name override
    #[arg(long, env = "RELAY_MODEL")]
    pub model: Option<String>,

    /// JSON file with a `system_instruction` replacing the built-in persona
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    #[command(flatten)]
    pub sampling: SamplingArgs,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// TLS certificate (PEM). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// TLS private key (PEM). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

impl ServeArgs {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            llm_type: self.llm_type,
            api_key: Some(self.api_key.clone()).filter(|k| !k.trim().is_empty()),
            completion_model: self.model.clone(),
            base_url: self.base_url.clone(),
            sampling: self.sampling.params(),
        }
    }

    pub fn tls_paths(&self) -> Result<Option<TlsPaths>, String> {
        if !self.enable_tls {
            return Ok(None);
        }
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert_path), Some(key_path)) =>
                Ok(Some(TlsPaths { cert_path: cert_path.clone(), key_path: key_path.clone() })),
            (Some(_), None) | (None, Some(_)) =>
                Err("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".into()),
            (None, None) => Err("--enable-tls was set but no certificate/key paths provided.".into()),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    /// Provider to call (deepseek, openai, gemini, huggingface, relay)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "deepseek")]
    pub llm_type: LlmType,

    /// API key; falls back to the key stored in the settings file
    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Provider endpoint override; for `relay` this is the relay's address
    #[arg(long, env = "CHAT_BASE_URL")]
    pub base_url: Option<String>,

    /// Model name override
    #[arg(long, env = "CHAT_MODEL")]
    pub model: Option<String>,

    /// JSON file with a `system_instruction` replacing the built-in persona
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Where the client keeps its API key
    #[arg(long, env = "SETTINGS_PATH", default_value = ".mun-assistant.json")]
    pub settings_path: String,

    #[command(flatten)]
    pub sampling: SamplingArgs,
}

impl ChatArgs {
    /// Provider config without a key; the key is resolved against the store separately.
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            llm_type: self.llm_type,
            api_key: None,
            completion_model: self.model.clone(),
            base_url: self.base_url.clone(),
            sampling: self.sampling.params(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["mun-assistant", "serve", "--port", "8080", "--llm-type", "huggingface"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Serve(args) => args,
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn parses_serve_flags() {
        let args = serve_args(&["--api-key", "hf_x", "--temperature", "0.7", "--max-tokens", "1000"]);
        assert_eq!(args.port, 8080);
        let config = args.llm_config();
        assert_eq!(config.llm_type, LlmType::HuggingFace);
        assert_eq!(config.api_key.as_deref(), Some("hf_x"));
        assert_eq!(config.sampling, SamplingParams::default());
    }

    #[test]
    fn blank_relay_key_is_absent() {
        let args = serve_args(&["--api-key", "  "]);
        assert_eq!(args.llm_config().api_key, None);
    }

    #[test]
    fn tls_requires_both_paths() {
        let args = serve_args(&["--enable-tls", "--tls-cert-path", "cert.pem"]);
        assert!(args.tls_paths().is_err());

        let args = serve_args(&[
            "--enable-tls",
            "--tls-cert-path",
            "cert.pem",
            "--tls-key-path",
            "key.pem",
        ]);
        let tls = args.tls_paths().unwrap().unwrap();
        assert_eq!(tls.key_path, "key.pem");
    }

    #[test]
    fn parses_chat_provider() {
        let args = Args::try_parse_from([
            "mun-assistant",
            "chat",
            "--llm-type",
            "relay",
            "--base-url",
            "http://localhost:5000",
            "--settings-path",
            "/tmp/mun.json",
        ]).unwrap();
        match args.command {
            Command::Chat(chat) => {
                assert_eq!(chat.llm_type, LlmType::Relay);
                assert_eq!(chat.settings_path, "/tmp/mun.json");
                assert_eq!(chat.llm_config().base_url.as_deref(), Some("http://localhost:5000"));
            }
            other => panic!("expected chat, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Args::try_parse_from(["mun-assistant", "chat", "--llm-type", "groq"]).is_err());
    }
}

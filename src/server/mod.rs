pub mod api;

use crate::cli::ServeArgs;
use crate::config::prompt::resolve_template;
use crate::llm::chat::{ new_client, LlmError };
use crate::llm::LlmType;
use self::api::{ AppState, TlsPaths };
use std::error::Error;
use log::{ info, error };

pub struct Server {
    port: u16,
    state: AppState,
    tls: Option<TlsPaths>,
}

impl Server {
    pub fn new(port: u16, state: AppState, tls: Option<TlsPaths>) -> Self {
        Self { port, state, tls }
    }

    /// Builds the provider and template from `args`. Both must be valid before
    /// the relay starts listening.
    pub fn from_args(args: &ServeArgs) -> Result<Self, Box<dyn Error + Send + Sync>> {
        // a relay forwarding to a relay would loop and skip the persona
        if args.llm_type == LlmType::Relay {
            let e = LlmError::Config(
                "The relay cannot forward to another relay; pick a hosted provider".to_string()
            );
            error!("Relay provider could not be configured: {}", e);
            return Err(e.into());
        }
        let llm_config = args.llm_config();
        let client = new_client(&llm_config).map_err(|e| {
            error!("Relay provider could not be configured: {}", e);
            e
        })?;
        info!(
            "Relay provider configured: Type={}, Model={}, URL={:?}",
            client.llm_type(),
            client.get_model(),
            client.get_base_url()
        );

        let template = resolve_template(args.prompts_path.as_deref())?;
        let tls = args.tls_paths()?;

        Ok(Self::new(args.port, AppState::new(client, template), tls))
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let protocol = if self.tls.is_some() { "https" } else { "http" };
        info!("Starting relay ({}) on port {}", protocol, self.port);
        if let Err(e) = api::start_http_server(self.port, self.state, self.tls).await {
            error!("Relay server error: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

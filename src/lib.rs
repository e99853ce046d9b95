pub mod cli;
pub mod client;
pub mod config;
pub mod llm;
pub mod models;
pub mod server;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use client::repl::Repl;
use config::prompt::resolve_template;
use config::settings::{ resolve_api_key, FileCredentialStore, Settings };
use log::info;
use server::Server;
use std::error::Error;
use tokio::io::BufReader;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve) => run_relay(serve).await,
        Command::Chat(chat) => run_chat(chat).await,
    }
}

pub async fn run_relay(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Relay Configuration ---");
    info!("Port: {}", args.port);
    info!("Provider: {}", args.llm_type);
    info!("Model: {}", args.model.as_deref().unwrap_or("adapter default"));
    info!("Base URL: {}", args.base_url.as_deref().unwrap_or("adapter default"));
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("Temperature: {}", args.sampling.temperature);
    info!("Max Tokens: {}", args.sampling.max_tokens);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("---------------------------");

    let server = Server::from_args(&args)?;
    server.run().await
}

pub async fn run_chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Chat Configuration ---");
    info!("Provider: {}", args.llm_type);
    info!("Model: {}", args.model.as_deref().unwrap_or("adapter default"));
    info!("Base URL: {}", args.base_url.as_deref().unwrap_or("adapter default"));
    info!("Settings Path: {}", args.settings_path);
    info!("--------------------------");

    let store = FileCredentialStore::new(&args.settings_path);
    let api_key = resolve_api_key(args.api_key.as_deref(), &store)?;
    let template = resolve_template(args.prompts_path.as_deref())?;
    let settings = Settings::new(args.llm_config(), template).with_api_key(api_key);

    let mut repl = Repl::new(settings, Box::new(store), tokio::io::stdout());
    repl.run(BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}

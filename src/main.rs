use clap::Parser;
use dotenv::dotenv;
use mun_assistant::cli::{ Args, Command };
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();

    // stdout belongs to the conversation in chat mode
    let default_filter = match args.command {
        Command::Serve(_) => "info",
        Command::Chat(_) => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    mun_assistant::run(args).await
}

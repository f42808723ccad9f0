use clap::Parser;
use tracing_subscriber::EnvFilter;

use wiki_service::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET, etc. are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wiki_service=info,tower_http=info")),
        )
        .init();

    let config = wiki_service::config::config();
    tracing::info!("Starting wiki service in {:?} mode", config.environment);

    let cli = Cli::parse();
    if let Err(e) = wiki_service::cli::run(cli, config).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::app::{app, AppState};
use crate::auth::{hash_password, UserRealm};
use crate::config::{AppConfig, Environment};

#[derive(Parser)]
#[command(name = "wiki-service")]
#[command(about = "Markdown wiki with capability-gated editing and gist backups")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overriding WIKI_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Print the SHA-256 digest to store for a password in the users file")]
    HashPassword { password: String },
}

pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password));
            Ok(())
        }
    }
}

/// Users come from WIKI_USERS_FILE; only development falls back to the built-in set.
pub fn load_realm(config: &AppConfig) -> anyhow::Result<UserRealm> {
    match &config.security.users_file {
        Some(path) => Ok(UserRealm::from_file(path)?),
        None if config.environment == Environment::Production => {
            anyhow::bail!("WIKI_USERS_FILE must be set in production")
        }
        None => {
            tracing::warn!("WIKI_USERS_FILE not set, using the built-in development users");
            Ok(UserRealm::development())
        }
    }
}

async fn serve(config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set");
    }

    let realm = load_realm(config)?;
    let state = AppState::build(config, Arc::new(realm)).await?;
    let source = state.source.clone();

    let bind_addr = format!(
        "{}:{}",
        config.server.bind_address,
        port.unwrap_or(config.server.port)
    );
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Wiki listening on http://{}", bind_addr);

    axum::serve(listener, app(state, config.server.enable_cors))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    source.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;

mod config;
mod error;
mod extract;
mod handlers;
mod models;
mod relay;
mod serverless;
mod validate;

use crate::config::Settings;
use crate::handlers::AppState;

#[derive(Debug, Parser)]
#[command(name = "yt-relay", version, about = "Relay video links through an extraction API")]
struct Cli {
    /// Config file; defaults to ./yt-relay.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Listen for HTTP requests (default).
    Serve,
    /// Handle one serverless proxy event and print the response as JSON.
    Invoke {
        /// Read the event from this file instead of stdin.
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    let state = AppState::from_settings(&settings).context("building http client")?;
    let app = handlers::router(state);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(app, &settings).await,
        Command::Invoke { event } => invoke(app, event).await,
    }
}

async fn serve(app: axum::Router, settings: &Settings) -> anyhow::Result<()> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(
        mode = ?settings.response_mode,
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn invoke(app: axum::Router, event: Option<PathBuf>) -> anyhow::Result<()> {
    let raw = match event {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading event from stdin")?;
            buf
        }
    };
    let event: serverless::ProxyEvent =
        serde_json::from_str(&raw).context("parsing serverless event")?;

    let response = serverless::handle_event(app, event).await;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use backend_lib::{config::Settings, logging, AppState};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

/// Planning-poker board server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file, layered under `POKERBOARD_*` environment variables
    #[arg(long, default_value = backend_lib::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override the log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }
    settings.validate()?;

    logging::init_tracing(&settings);

    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting pokerboard server");

    let state = Arc::new(AppState::new(settings));
    backend_lib::serve(listener, state).await?;

    Ok(())
}

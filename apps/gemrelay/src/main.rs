mod classify;
mod cli;
mod replay;
mod stdout_sink;

use std::error::Error;

use clap::Parser;
use gemrelay_common::{RelayConfig, RelayConfigPatch};
use tracing::info;

use crate::cli::{Cli, Command};

const DEFAULT_LOG_FILTER: &str =
    "gemrelay=info,gemrelay_provider_core=info,gemrelay_provider_impl=info";

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("gemrelay failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        auto_disable = config.automatic_disable_enabled,
        auto_enable = config.automatic_enable_enabled,
        disable_keywords = config.disable_keywords.len(),
        debug_body = config.debug_body,
        "config loaded"
    );

    match cli.command {
        Command::Replay(args) => replay::run(&config, args).await,
        Command::Classify(args) => classify::run(&config, args).await,
    }
}

/// CLI > ENV > defaults.
fn load_config(cli: &Cli) -> Result<RelayConfig, Box<dyn Error + Send + Sync>> {
    let mut patch = RelayConfigPatch::from_env()?;
    patch.overlay(cli.config.to_patch());
    Ok(patch.into_config())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

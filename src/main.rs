mod app;
mod config;
mod controller;
mod delivery;
mod host;
mod ipc;
mod protocol;
mod state;
mod store;
mod surface;
mod terminal;
#[cfg(test)]
mod testing;
mod util;
mod views;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Compose text in a panel and deliver it into the active terminal.
#[derive(Parser, Debug)]
#[command(name = "compose-relay")]
#[command(version = env!("COMPOSE_RELAY_VERSION"))]
struct Args {
    /// Config file (markdown)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// State file holding draft, history and split position
    #[arg(short, long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// tmux target to deliver into
    #[arg(short, long, value_name = "TARGET")]
    target: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_tracing(verbose: bool) {
    let fallback = if verbose {
        "compose_relay=debug"
    } else {
        "compose_relay=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(args.verbose);

    tracing::info!(
        version = env!("COMPOSE_RELAY_VERSION"),
        commit = env!("COMPOSE_RELAY_COMMIT"),
        "starting compose-relay"
    );

    let config_path = args.config.unwrap_or_else(config::config_file_path);
    let mut config = config::load_config(&config_path)?;
    if let Some(state) = args.state {
        config.state_file = Some(state);
    }
    if let Some(target) = args.target {
        config.target = target;
    }
    tracing::debug!(?config, "effective config");

    app::run(config).await;
    Ok(())
}

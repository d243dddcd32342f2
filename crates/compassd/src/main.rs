//! Compass daemon - career guidance generation core.
//!
//! Gates every request on recorded consent, de-identifies profiles in
//! both directions, and verifies generated guidance against structured
//! domain facts before anything reaches the caller.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use compass_common::StaticFactStore;
use compassd::config::Config;
use compassd::escalation::LogEscalationSink;
use compassd::orchestrator::Orchestrator;
use compassd::providers;
use compassd::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "compassd", version, about = "Career guidance daemon")]
struct Args {
    /// Path to a config file, overriding the default search locations
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Compass Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };

    let drivers = providers::build_providers(&config.providers);
    info!(
        "Providers ready: {} in order {:?}",
        drivers.len(),
        config.providers.order
    );

    // The production fact store is an external collaborator; the seeded
    // snapshot keeps a local daemon verifying against real-shaped data
    let fact_store = Arc::new(StaticFactStore::with_defaults());
    let escalation = Arc::new(LogEscalationSink);

    let bind_addr = config.daemon.bind_addr.clone();
    let orchestrator = Orchestrator::new(config, drivers, fact_store, escalation);
    let state = AppState::new(orchestrator);

    info!("Compass Daemon ready");
    server::run(state, &bind_addr).await
}

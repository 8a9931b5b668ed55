//! Tandem Poller
//!
//! A long-running service that watches GitHub repositories on fixed
//! intervals:
//! - Commit pollers trigger a workflow in a build repository whenever the
//!   head of a source branch moves.
//! - Artifact pollers pick up artifacts from successful build runs, upload
//!   them to content storage and register them with the tagging service.
//!
//! Each poller runs on its own task with its own schedule and durable state.
//! A poller that hits a fatal error stops alone; the process exits once all
//! pollers have stopped or shutdown is requested.

mod config;
mod error;
mod poller;
mod registry;
mod repository;
mod scheduler;
mod state;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::registry::PollerRegistry;
use crate::repository::HttpConnector;
use crate::state::FileStateStore;

#[derive(Parser)]
#[command(name = "tandem-poller")]
#[command(about = "Polls GitHub for new commits and build artifacts", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "TANDEM_CONFIG", default_value = "tandem.toml")]
    config: PathBuf,

    /// Overrides `[local] data_dir` from the configuration file
    #[arg(long, env = "TANDEM_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?
        .with_data_dir(cli.data_dir);

    // Initialize logging; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.default_log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tandem Poller");
    for warning in &config.warnings {
        warn!("{}", warning);
    }
    info!(
        "Loaded {} poller(s), data_dir={}, github={}",
        config.pollers.len(),
        config.local.data_dir.display(),
        config.github.service_url
    );

    let token = config.read_token()?;
    let http = tandem_client::default_http_client().context("Failed to build HTTP client")?;
    let connector = HttpConnector::new(
        http,
        &config.github.service_url,
        &config.github.api_auth_uid,
        &token,
    );

    let store = FileStateStore::open(&config.local.data_dir).with_context(|| {
        format!(
            "Failed to open state directory {}",
            config.local.data_dir.display()
        )
    })?;

    let registry = PollerRegistry::build(config.pollers, &connector, Arc::new(store))?;
    info!("Registry initialized with {} poller(s)", registry.len());

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let failures = registry.run(shutdown).await;
    if failures.is_empty() {
        info!("All pollers stopped");
        return Ok(());
    }

    for failure in &failures {
        error!(poller = %failure.poller, "Stopped with error: {}", failure.reason);
    }
    anyhow::bail!("{} poller(s) stopped on a fatal error", failures.len())
}

/// Cancels `shutdown` on Ctrl-C, or SIGTERM on unix
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown requested, waiting for pollers to finish their current tick");
    shutdown.cancel();
}

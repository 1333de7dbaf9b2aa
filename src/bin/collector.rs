//! Occupancy collector daemon.
//!
//! Polls the occupancy endpoint on a fixed interval, appends each reading to
//! the CSV log, and rotates the log weekly. Runs until Ctrl+C / SIGTERM.

use clap::Parser;
use occupancy::CollectorConfig;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Poll building occupancy and keep a weekly-rotated CSV log.
#[derive(Parser)]
#[command(name = "occupancy-collector", version, about)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("occupancy=info,occupancy_collector=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        CollectorConfig::from_file(path)?
    } else {
        CollectorConfig::default()
    };

    info!(
        url = %config.fetch.url,
        log = %config.log.path.display(),
        poll_interval_secs = config.fetch.poll_interval_secs,
        "occupancy collector v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let mut scheduler = occupancy::build_scheduler(&config)?;
    if let Err(e) = scheduler.start() {
        error!(error = %e, "failed to start scheduler");
        std::process::exit(1);
    }

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("received shutdown signal, stopping...");
        shutdown.cancel();
    });

    scheduler.wait().await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = until_signal("ctrl-c", tokio::signal::ctrl_c()) => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "cannot install SIGTERM handler, listening for Ctrl+C only");
            until_signal("ctrl-c", tokio::signal::ctrl_c()).await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    until_signal("ctrl-c", tokio::signal::ctrl_c()).await;
}

/// Resolve when `signal` fires. A listener that fails to register never
/// resolves, so it cannot trigger a shutdown.
async fn until_signal<F>(name: &str, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(signal = name, error = %e, "cannot listen for signal");
        std::future::pending::<()>().await;
    }
}

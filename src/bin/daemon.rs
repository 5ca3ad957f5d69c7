//! Long-running sync daemon.
//!
//! Loads configuration, opens the record store, seeds it if empty, and
//! then lets the runner tick refresh and prune runs forever. Each
//! settled run is logged from the report channel.

use anyhow::Context;
use cinefeed::feed::TmdbFeed;
use cinefeed::scheduler::StateFile;
use cinefeed::{Scheduler, SqliteStore, SyncConfig, SyncRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("cinefeed.toml"));
    let config = SyncConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let store = Arc::new(
        SqliteStore::open(&config.store.data_dir)
            .with_context(|| format!("opening store in {}", config.store.data_dir.display()))?,
    );
    info!(path = %store.path().display(), "record store open");

    let feed = Arc::new(TmdbFeed::new(&config.feed).context("building feed client")?);
    let state_file = StateFile::new(config.store.data_dir.join("scheduler.json"));

    let scheduler = Arc::new(
        Scheduler::new(store, feed, &config, state_file).context("building scheduler")?,
    );
    scheduler
        .load_initial_data(false)
        .await
        .context("initial load")?;

    let (report_tx, mut report_rx) = mpsc::unbounded_channel();
    let runner = SyncRunner::new(Arc::clone(&scheduler), report_tx);
    let runner_task = runner.run();

    info!("sync daemon started");
    while let Some(report) = report_rx.recv().await {
        if report.success {
            info!(kind = %report.kind, "run succeeded");
        } else {
            warn!(kind = %report.kind, "run failed");
        }
    }

    runner_task.await.context("runner task")?;
    Ok(())
}

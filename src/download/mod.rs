//! Mirror pipeline: one discovery walker feeding a bounded queue that a fixed
//! pool of workers drains, with a reporter redrawing the status line until
//! both sides are done.

pub mod discovery;
pub mod error;
pub mod file;
pub mod paths;
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::drive::{resolve_folder_id, RemoteEntry, RemoteStore};
use crate::progress::{self, Progress};

use self::discovery::{Discovery, DiscoveryStats};
use self::worker::FailedJob;

/// One file to materialize: the remote entry and where it goes locally.
///
/// For native documents `target` carries no extension yet; the executor
/// appends the export format's.
#[derive(Debug, Clone)]
pub struct Job {
    pub entry: RemoteEntry,
    pub target: PathBuf,
}

/// Subset of application config consumed by the pipeline.
/// Decoupled from CLI parsing so the pipeline can be tested independently.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub(crate) directory: PathBuf,
    pub(crate) folder: String,
    pub(crate) workers: usize,
    pub(crate) queue_capacity: usize,
    pub(crate) temp_suffix: String,
    pub(crate) no_progress_bar: bool,
}

/// Everything a finished run has to say about itself.
#[derive(Debug, Clone)]
pub struct MirrorReport {
    pub found: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub downloaded: u64,
    pub unsupported: u64,
    pub bytes: u64,
    pub failed_jobs: Vec<FailedJob>,
    pub discovery: DiscoveryStats,
    pub elapsed: Duration,
}

/// Mirror the remote folder `config.folder` into `config.directory`.
///
/// Only setup problems (the starting folder cannot be resolved) come back
/// as `Err`. Everything that goes wrong after the pipeline started is
/// counted in the report and logged instead.
pub async fn mirror(store: Arc<dyn RemoteStore>, config: &MirrorConfig) -> Result<MirrorReport> {
    let root_id = resolve_folder_id(store.as_ref(), &config.folder)
        .await
        .with_context(|| format!("Failed to resolve remote folder '{}'", config.folder))?;
    tracing::info!(
        "Mirroring '{}' ({}) into {}",
        config.folder,
        root_id,
        config.directory.display()
    );

    let (tx, rx) = async_channel::bounded(config.queue_capacity);
    let progress = Arc::new(Progress::new());

    let stop = CancellationToken::new();
    let reporter = tokio::spawn(progress::run_reporter(
        progress.clone(),
        stop.clone(),
        progress::create_progress_bar(config.no_progress_bar),
    ));

    let workers = worker::spawn(
        config.workers,
        store.clone(),
        rx,
        progress.clone(),
        &config.temp_suffix,
    );

    let discovery = Discovery {
        store: store.as_ref(),
        queue: &tx,
        progress: &progress,
        temp_suffix: &config.temp_suffix,
    }
    .run(&root_id, &config.directory)
    .await;
    progress.mark_discovery_done();
    tx.close();
    tracing::debug!(
        folders = discovery.folders,
        mkdir_errors = discovery.mkdir_errors,
        listing_errors = discovery.listing_errors,
        renamed = discovery.renamed,
        "discovery finished"
    );

    let tally = worker::join(workers).await;
    stop.cancel();
    if let Err(e) = reporter.await {
        tracing::warn!("Progress reporter ended abnormally: {}", e);
    }

    let snapshot = progress.snapshot();
    if !tally.failed.is_empty() {
        tracing::warn!(
            "{} of {} transfers failed; details are in the error log",
            tally.failed.len(),
            snapshot.found
        );
    }

    Ok(MirrorReport {
        found: snapshot.found,
        completed: snapshot.completed,
        skipped: snapshot.skipped,
        failed: snapshot.failed,
        downloaded: tally.downloaded,
        unsupported: tally.unsupported,
        bytes: tally.bytes,
        failed_jobs: tally.failed,
        discovery,
        elapsed: snapshot.elapsed,
    })
}

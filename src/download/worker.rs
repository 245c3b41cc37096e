//! Fixed-size pool of tasks draining the job queue.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::file::{self, Transfer};
use super::Job;
use crate::drive::RemoteStore;
use crate::logging::TRANSFER_LOG;
use crate::progress::{Finished, Progress};

/// A job that was abandoned, kept for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    pub target: PathBuf,
    pub reason: String,
}

/// Per-outcome totals across all workers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerTally {
    pub downloaded: u64,
    pub bytes: u64,
    pub skipped: u64,
    pub unsupported: u64,
    pub failed: Vec<FailedJob>,
}

impl WorkerTally {
    fn merge(&mut self, other: WorkerTally) {
        self.downloaded += other.downloaded;
        self.bytes += other.bytes;
        self.skipped += other.skipped;
        self.unsupported += other.unsupported;
        self.failed.extend(other.failed);
    }
}

/// Start `count` workers. Each one takes jobs until the queue is closed and
/// empty, so callers close the sender once discovery is over and then
/// [`join`] the returned set.
pub fn spawn(
    count: usize,
    store: Arc<dyn RemoteStore>,
    queue: async_channel::Receiver<Job>,
    progress: Arc<Progress>,
    temp_suffix: &str,
) -> JoinSet<WorkerTally> {
    let mut set = JoinSet::new();
    for _ in 0..count {
        let store = store.clone();
        let queue = queue.clone();
        let progress = progress.clone();
        let temp_suffix = temp_suffix.to_string();
        set.spawn(async move { run(store.as_ref(), queue, &progress, &temp_suffix).await });
    }
    set
}

/// Wait for every worker and add up what they did.
pub async fn join(mut set: JoinSet<WorkerTally>) -> WorkerTally {
    let mut total = WorkerTally::default();
    while let Some(result) = set.join_next().await {
        match result {
            Ok(tally) => total.merge(tally),
            Err(e) => tracing::error!("Worker task ended abnormally: {}", e),
        }
    }
    total
}

async fn run(
    store: &dyn RemoteStore,
    queue: async_channel::Receiver<Job>,
    progress: &Progress,
    temp_suffix: &str,
) -> WorkerTally {
    let mut tally = WorkerTally::default();
    while let Ok(job) = queue.recv().await {
        let finished = match file::transfer(store, &job, temp_suffix).await {
            Ok(Transfer::Downloaded { bytes }) => {
                tally.downloaded += 1;
                tally.bytes += bytes;
                Finished::Done
            }
            Ok(Transfer::Unsupported) => {
                tally.unsupported += 1;
                Finished::Done
            }
            Ok(Transfer::Skipped) => {
                tally.skipped += 1;
                Finished::Skipped
            }
            Err(e) => {
                tracing::error!(target: TRANSFER_LOG, "Transfer failed: {}", e);
                tally.failed.push(FailedJob {
                    target: job.target.clone(),
                    reason: e.to_string(),
                });
                Finished::Failed
            }
        };
        progress.job_finished(finished);
    }
    tally
}

//! Shared pipeline counters and the status line rendered from them.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

/// How often the status line is redrawn.
pub const REPORT_INTERVAL: Duration = Duration::from_millis(200);

/// The ETA stays hidden until more than this many real transfers finished...
const ETA_MIN_TRANSFERS: u64 = 5;
/// ...and more than this much time has passed.
const ETA_MIN_ELAPSED: Duration = Duration::from_secs(3);

/// Terminal state of a job, as far as the counters care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finished {
    /// Downloaded, exported, or nothing to do.
    Done,
    Skipped,
    Failed,
}

/// Counters shared by the discovery walker, the workers and the reporter.
///
/// Writers bump `found` before a job is queued and `completed` before
/// `skipped`/`failed`; [`Progress::snapshot`] loads in the opposite order,
/// so every snapshot has `skipped <= completed <= found`.
#[derive(Debug)]
pub struct Progress {
    found: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    discovery_done: AtomicBool,
    started: Instant,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            found: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            discovery_done: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    pub fn job_found(&self) {
        self.found.fetch_add(1, Ordering::SeqCst);
    }

    pub fn job_finished(&self, how: Finished) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        match how {
            Finished::Done => {}
            Finished::Skipped => {
                self.skipped.fetch_add(1, Ordering::SeqCst);
            }
            Finished::Failed => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn mark_discovery_done(&self) {
        self.discovery_done.store(true, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Snapshot {
        let skipped = self.skipped.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let completed = self.completed.load(Ordering::SeqCst);
        let found = self.found.load(Ordering::SeqCst);
        Snapshot {
            found,
            completed,
            skipped,
            failed,
            discovery_done: self.discovery_done.load(Ordering::SeqCst),
            elapsed: self.started.elapsed(),
        }
    }
}

/// Point-in-time copy of [`Progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub found: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub discovery_done: bool,
    pub elapsed: Duration,
}

impl Snapshot {
    pub fn percent(&self) -> f64 {
        if self.found == 0 {
            return 0.0;
        }
        self.completed as f64 / self.found as f64 * 100.0
    }

    /// Estimated time left, based on the rate of jobs that actually moved
    /// bytes. Skips finish instantly and would make the estimate useless.
    pub fn eta(&self) -> Option<Duration> {
        let transferred = self.completed.saturating_sub(self.skipped);
        if transferred <= ETA_MIN_TRANSFERS || self.elapsed <= ETA_MIN_ELAPSED {
            return None;
        }
        let rate = transferred as f64 / self.elapsed.as_secs_f64();
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.found.saturating_sub(self.completed) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    }
}

/// One-line status: counts, percentage, skips, failures, scan state and ETA.
pub fn render_status(snapshot: &Snapshot) -> String {
    let scanning = if snapshot.discovery_done {
        ""
    } else {
        " (scanning...)"
    };
    let eta = snapshot
        .eta()
        .map(format_hms)
        .unwrap_or_else(|| "--:--:--".to_string());
    format!(
        "Progress: {}/{} ({:.2}%) | Skipped: {} | Failed: {}{} | ETA: {}",
        snapshot.completed,
        snapshot.found,
        snapshot.percent(),
        snapshot.skipped,
        snapshot.failed,
        scanning,
        eta
    )
}

fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub(crate) fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Status line holder. Hidden when disabled or when stderr is not a TTY
/// (cron, pipes), where redraws would only garble the output.
pub fn create_progress_bar(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    match ProgressStyle::with_template("[{elapsed_precise}] {msg}") {
        Ok(style) => pb.set_style(style),
        Err(e) => tracing::debug!("Falling back to default progress style: {}", e),
    }
    pb
}

/// Redraw the status line every [`REPORT_INTERVAL`] until `stop` fires, then
/// clear it and log the final summary.
pub async fn run_reporter(progress: Arc<Progress>, stop: CancellationToken, bar: ProgressBar) {
    let mut ticker = tokio::time::interval(REPORT_INTERVAL);
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => bar.set_message(render_status(&progress.snapshot())),
        }
    }
    bar.finish_and_clear();

    let snapshot = progress.snapshot();
    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} found, {} completed ({} skipped, {} failed)",
        snapshot.found,
        snapshot.completed,
        snapshot.skipped,
        snapshot.failed
    );
    tracing::info!("  elapsed: {}", format_duration(snapshot.elapsed));
}

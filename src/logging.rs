//! Tracing setup: console output plus append-only transfer and error logs.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Target for per-job events. These go to the transfer log (and the error
/// log when they are failures) but never to the console, where they would
/// break up the status line.
pub const TRANSFER_LOG: &str = "transfer";

fn open_append(path: &Path) -> anyhow::Result<Arc<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok(Arc::new(file))
}

/// Console filter: `RUST_LOG` wins, otherwise `default_level`. Per-job
/// events are always switched off here.
fn console_filter(default_level: &str) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    match format!("{}=off", TRANSFER_LOG).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install the global subscriber.
///
/// - console (stderr): `default_level`, minus the [`TRANSFER_LOG`] target;
/// - `transfer_log`: everything on [`TRANSFER_LOG`] at INFO and above;
/// - `error_log`: every WARN and ERROR event.
pub fn init(default_level: &str, transfer_log: &Path, error_log: &Path) -> anyhow::Result<()> {
    let transfer_file = open_append(transfer_log)?;
    let error_file = open_append(error_log)?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_filter(default_level));

    let transfers = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(transfer_file)
        .with_filter(Targets::new().with_target(TRANSFER_LOG, LevelFilter::INFO));

    let errors = fmt::layer()
        .with_ansi(false)
        .with_writer(error_file)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(console)
        .with(transfers)
        .with(errors)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

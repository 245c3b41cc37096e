//! gdrive-mirror: recursively mirror a Google Drive folder into a local
//! directory.
//!
//! Discovery walks the remote tree depth-first and feeds a bounded queue;
//! a fixed pool of workers downloads regular files and exports native
//! documents (.docx, .xlsx, .pptx). Existing local files are skipped, so an
//! interrupted run can simply be started again.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod download;
mod drive;
mod logging;
mod progress;
pub mod retry;
mod types;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use drive::{DriveClient, RemoteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::from_cli(cli)?;

    logging::init(
        config.log_level.as_filter(),
        &config.transfer_log,
        &config.error_log,
    )?;
    tracing::debug!(?config, "configuration loaded");

    let token = auth::load_access_token(config.access_token.as_deref(), &config.token_file)
        .await
        .context("Failed to load Google Drive credentials")?;

    let client = DriveClient::new(&config.api_base, token, config.page_size, config.retry())
        .context("Failed to build HTTP client")?;
    let store: Arc<dyn RemoteStore> = Arc::new(client);

    let report = download::mirror(store, &config.mirror()).await?;
    tracing::info!(
        "  {} downloaded ({} bytes), {} unsupported, {} folders scanned",
        report.downloaded,
        report.bytes,
        report.unsupported,
        report.discovery.folders
    );
    for job in &report.failed_jobs {
        tracing::debug!("failed: {}: {}", job.target.display(), job.reason);
    }

    Ok(())
}

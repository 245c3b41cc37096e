use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::TransferError;
use super::paths::with_suffix;
use super::Job;
use crate::drive::{ByteStream, EntryKind, RemoteStore};
use crate::logging::TRANSFER_LOG;

/// Non-failure result of materializing one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Downloaded { bytes: u64 },
    /// The target already existed; the remote was not contacted.
    Skipped,
    /// Native kind with no export mapping; nothing written.
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Download,
    Export(&'static str),
}

impl Source {
    fn operation(self) -> &'static str {
        match self {
            Source::Download => "download",
            Source::Export(_) => "export",
        }
    }
}

/// Materialize `job` on disk.
///
/// Regular files are downloaded as-is to `job.target`. Native documents are
/// exported and written to `job.target` plus the export extension. Either way
/// the bytes land in `<target><temp_suffix>` first and are renamed into place
/// only after the whole body arrived, so the target never holds a partial
/// file. An existing target is left untouched.
pub async fn transfer(
    store: &dyn RemoteStore,
    job: &Job,
    temp_suffix: &str,
) -> Result<Transfer, TransferError> {
    match &job.entry.kind {
        EntryKind::File => fetch_to(store, job, &job.target, Source::Download, temp_suffix).await,
        EntryKind::Native(native) => match native.export_format() {
            Some(format) => {
                let target = with_suffix(&job.target, format.extension);
                fetch_to(store, job, &target, Source::Export(format.mime_type), temp_suffix).await
            }
            None => {
                tracing::debug!(
                    target: TRANSFER_LOG,
                    mime_type = %job.entry.mime_type,
                    "no export format for {}, skipping",
                    job.target.display()
                );
                Ok(Transfer::Unsupported)
            }
        },
        EntryKind::Folder => Ok(Transfer::Unsupported),
    }
}

async fn fetch_to(
    store: &dyn RemoteStore,
    job: &Job,
    target: &Path,
    source: Source,
    temp_suffix: &str,
) -> Result<Transfer, TransferError> {
    if fs::metadata(target).await.is_ok() {
        return Ok(Transfer::Skipped);
    }

    tracing::info!(
        target: TRANSFER_LOG,
        id = %job.entry.id,
        "{} {}",
        source.operation(),
        target.display()
    );

    let remote_err = |source_err| TransferError::Remote {
        operation: source.operation(),
        name: job.entry.name.clone(),
        source: source_err,
    };
    let stream = match source {
        Source::Download => store.download(&job.entry.id).await,
        Source::Export(mime_type) => store.export(&job.entry.id, mime_type).await,
    }
    .map_err(remote_err)?;

    let part_path = with_suffix(target, temp_suffix);
    let bytes = match write_stream(stream, &part_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&part_path).await;
            return Err(match e {
                WriteFailure::Remote(e) => remote_err(e),
                WriteFailure::Disk(e) => TransferError::Write {
                    path: part_path.display().to_string(),
                    source: e,
                },
            });
        }
    };

    if let Err(e) = fs::rename(&part_path, target).await {
        let _ = fs::remove_file(&part_path).await;
        return Err(TransferError::Rename {
            path: target.display().to_string(),
            source: e,
        });
    }

    Ok(Transfer::Downloaded { bytes })
}

enum WriteFailure {
    Remote(crate::drive::DriveError),
    Disk(std::io::Error),
}

/// Drain `stream` into a freshly truncated file at `path`.
async fn write_stream(mut stream: ByteStream, path: &Path) -> Result<u64, WriteFailure> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(WriteFailure::Disk)?;

    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(WriteFailure::Remote)?;
        file.write_all(&chunk).await.map_err(WriteFailure::Disk)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(WriteFailure::Disk)?;
    Ok(written)
}

//! Google Drive access: the [`RemoteStore`] seam the mirror pipeline talks to,
//! the REST-backed [`DriveClient`] implementation, and folder path resolution.

mod client;
pub mod error;
pub mod resolve;
pub mod types;

pub use client::{DriveClient, DEFAULT_API_BASE};
pub use error::DriveError;
pub use resolve::resolve_folder_id;
pub use types::{EntryKind, ListPage, RemoteEntry};

use bytes::Bytes;
use futures_util::stream::BoxStream;

/// Body of a download or export response, yielded chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, DriveError>>;

/// Minimal async view of the remote directory service.
///
/// The pipeline only ever lists folders, looks up a folder by name, and
/// streams file contents. Anything else the service offers stays behind
/// the implementation.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// List one page of the children of `folder_id`. Pass the previous
    /// page's `next_page_token` to continue; `None` starts from the top.
    async fn list(&self, folder_id: &str, page_token: Option<&str>)
        -> Result<ListPage, DriveError>;

    /// Stream the raw bytes of a regular file.
    async fn download(&self, file_id: &str) -> Result<ByteStream, DriveError>;

    /// Stream a native document converted to `mime_type`.
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<ByteStream, DriveError>;

    /// Find a direct child folder of `parent_id` named exactly `name`.
    async fn find_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<RemoteEntry>, DriveError>;
}

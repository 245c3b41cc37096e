//! In-memory [`RemoteStore`] for exercising the pipeline without a network.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use crate::drive::types::FOLDER_MIME;
use crate::drive::{ByteStream, DriveError, ListPage, RemoteEntry, RemoteStore};

pub(crate) const DOC_MIME: &str = "application/vnd.google-apps.document";
pub(crate) const SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Chunk size used when streaming contents, small enough that most test
/// files arrive in several pieces.
const CHUNK: usize = 4;

pub(crate) struct MemoryStore {
    children: HashMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, Vec<u8>>,
    page_size: usize,
    broken_streams: HashSet<String>,
    broken_listings: HashSet<String>,
    occupied_on_finish: HashMap<String, PathBuf>,
    lists: AtomicUsize,
    downloads: AtomicUsize,
    exports: AtomicUsize,
    export_requests: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        let mut children = HashMap::new();
        children.insert("root".to_string(), Vec::new());
        Self {
            children,
            contents: HashMap::new(),
            page_size: 100,
            broken_streams: HashSet::new(),
            broken_listings: HashSet::new(),
            occupied_on_finish: HashMap::new(),
            lists: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            exports: AtomicUsize::new(0),
            export_requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub(crate) fn folder(&mut self, parent: &str, id: &str, name: &str) -> &mut Self {
        self.push(parent, RemoteEntry::new(id, name, FOLDER_MIME));
        self.children.entry(id.to_string()).or_default();
        self
    }

    pub(crate) fn file(&mut self, parent: &str, id: &str, name: &str, body: &[u8]) -> &mut Self {
        let entry = RemoteEntry::new(id, name, "application/octet-stream").with_size(body.len() as u64);
        self.push(parent, entry);
        self.contents.insert(id.to_string(), body.to_vec());
        self
    }

    /// Add a native document whose export yields `exported`.
    pub(crate) fn native(
        &mut self,
        parent: &str,
        id: &str,
        name: &str,
        mime: &str,
        exported: &[u8],
    ) -> &mut Self {
        self.push(parent, RemoteEntry::new(id, name, mime));
        self.contents.insert(id.to_string(), exported.to_vec());
        self
    }

    /// Make the content stream of `id` fail after its first chunk.
    pub(crate) fn break_stream(&mut self, id: &str) -> &mut Self {
        self.broken_streams.insert(id.to_string());
        self
    }

    /// Make every listing of `folder_id` fail.
    pub(crate) fn break_listing(&mut self, folder_id: &str) -> &mut Self {
        self.broken_listings.insert(folder_id.to_string());
        self
    }

    /// Once the whole body of `id` has been yielded, create a non-empty
    /// directory at `path` before the stream reports its end.
    pub(crate) fn occupy_on_finish(&mut self, id: &str, path: &Path) -> &mut Self {
        self.occupied_on_finish.insert(id.to_string(), path.to_path_buf());
        self
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub(crate) fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub(crate) fn export_calls(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }

    pub(crate) fn export_requests(&self) -> Vec<(String, String)> {
        self.export_requests.lock().unwrap().clone()
    }

    fn push(&mut self, parent: &str, entry: RemoteEntry) {
        self.children
            .get_mut(parent)
            .unwrap_or_else(|| panic!("unknown parent folder {}", parent))
            .push(entry);
    }

    fn stream_of(&self, id: &str) -> Result<ByteStream, DriveError> {
        let body = self.contents.get(id).cloned().ok_or_else(|| DriveError::HttpStatus {
            status: 404,
            operation: "files.get",
            message: format!("File not found: {}", id),
        })?;
        let mut chunks: Vec<Result<Bytes, DriveError>> = body
            .chunks(CHUNK)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if self.broken_streams.contains(id) {
            chunks.truncate(1);
            chunks.push(Err(DriveError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))));
        }
        let body = stream::iter(chunks);
        match self.occupied_on_finish.get(id).cloned() {
            Some(path) => {
                let tail = stream::once(async move {
                    std::fs::create_dir_all(path.join("occupant")).unwrap();
                })
                .filter_map(|()| async { None::<Result<Bytes, DriveError>> });
                Ok(body.chain(tail).boxed())
            }
            None => Ok(body.boxed()),
        }
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn list(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListPage, DriveError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.broken_listings.contains(folder_id) {
            return Err(DriveError::HttpStatus {
                status: 500,
                operation: "files.list",
                message: "backend error".into(),
            });
        }
        let all = self.children.get(folder_id).ok_or_else(|| DriveError::HttpStatus {
            status: 404,
            operation: "files.list",
            message: format!("File not found: {}", folder_id),
        })?;
        let start: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(all.len());
        Ok(ListPage {
            entries: all[start..end].to_vec(),
            next_page_token: (end < all.len()).then(|| end.to_string()),
        })
    }

    async fn download(&self, file_id: &str) -> Result<ByteStream, DriveError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.stream_of(file_id)
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<ByteStream, DriveError> {
        self.exports.fetch_add(1, Ordering::SeqCst);
        self.export_requests
            .lock()
            .unwrap()
            .push((file_id.to_string(), mime_type.to_string()));
        self.stream_of(file_id)
    }

    async fn find_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<RemoteEntry>, DriveError> {
        Ok(self
            .children
            .get(parent_id)
            .and_then(|entries| entries.iter().find(|e| e.is_folder() && e.name == name))
            .cloned())
    }
}

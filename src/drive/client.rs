use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, Response};

use super::error::DriveError;
use super::types::{FileList, ListPage, RemoteEntry, FOLDER_MIME};
use super::{ByteStream, RemoteStore};
use crate::retry::{self, RetryConfig};

/// Drive v3 REST root.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// A content stream that yields nothing for this long is abandoned.
const STALL_TIMEOUT: Duration = Duration::from_secs(120);

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size)";

/// [`RemoteStore`] backed by the Drive v3 REST API with a bearer token.
///
/// Metadata calls (listing, folder lookup) are retried on transient errors.
/// Content streams are not: a failed transfer is the caller's to report.
pub struct DriveClient {
    http: Client,
    api_base: String,
    access_token: String,
    page_size: u32,
    retry: RetryConfig,
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("api_base", &self.api_base)
            .field("access_token", &"<redacted>")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl DriveClient {
    pub fn new(
        api_base: &str,
        access_token: String,
        page_size: u32,
        retry: RetryConfig,
    ) -> Result<Self, DriveError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
            page_size,
            retry,
        })
    }

    async fn query_files(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FileList, DriveError> {
        let url = format!("{}/files", self.api_base);
        let page_size = page_size.to_string();
        let mut params = vec![
            ("q", query),
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;
        let response = check_status(response, "files.list").await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn open_stream(
        &self,
        url: String,
        query: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<ByteStream, DriveError> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        let response = check_status(response, operation).await?;
        Ok(with_stall_timeout(response.bytes_stream(), STALL_TIMEOUT))
    }
}

#[async_trait::async_trait]
impl RemoteStore for DriveClient {
    async fn list(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListPage, DriveError> {
        let query = children_query(folder_id);
        let what = format!("listing folder {}", folder_id);
        let list = retry::retry_with_backoff(&self.retry, &what, || {
            self.query_files(&query, self.page_size, page_token)
        })
        .await?;
        Ok(list.into())
    }

    async fn download(&self, file_id: &str) -> Result<ByteStream, DriveError> {
        let url = format!("{}/files/{}", self.api_base, file_id);
        self.open_stream(url, &[("alt", "media")], "files.get").await
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<ByteStream, DriveError> {
        let url = format!("{}/files/{}/export", self.api_base, file_id);
        self.open_stream(url, &[("mimeType", mime_type)], "files.export")
            .await
    }

    async fn find_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<Option<RemoteEntry>, DriveError> {
        let query = folder_query(name, parent_id);
        let what = format!("looking up folder '{}'", name);
        let list = retry::retry_with_backoff(&self.retry, &what, || {
            self.query_files(&query, 1, None)
        })
        .await?;
        Ok(list.files.into_iter().next().map(RemoteEntry::from))
    }
}

/// End `stream` with a `TimedOut` I/O error when no chunk arrives within
/// `limit`.
fn with_stall_timeout<S, E>(stream: S, limit: Duration) -> ByteStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<DriveError> + Send + 'static,
{
    futures_util::stream::unfold(Some(Box::pin(stream)), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout(limit, stream.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(stream))),
            Ok(Some(Err(e))) => Some((Err(e.into()), None)),
            Ok(None) => None,
            Err(_) => {
                let stalled = std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no data received for {}s", limit.as_secs()),
                );
                Some((Err(DriveError::Io(stalled)), None))
            }
        }
    })
    .boxed()
}

/// Turn a non-2xx response into [`DriveError::HttpStatus`], keeping a short
/// slice of the body since Drive explains rate limits and export limits there.
async fn check_status(response: Response, operation: &'static str) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > 512 {
        let mut cut = 512;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    Err(DriveError::HttpStatus {
        status: status.as_u16(),
        operation,
        message,
    })
}

/// Escape a value for use inside a single-quoted Drive query string.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn children_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and trashed=false",
        escape_query_value(folder_id)
    )
}

fn folder_query(name: &str, parent_id: &str) -> String {
    format!(
        "mimeType='{}' and name='{}' and '{}' in parents and trashed=false",
        FOLDER_MIME,
        escape_query_value(name),
        escape_query_value(parent_id)
    )
}

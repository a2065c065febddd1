//! Stream mode: the direct link is fetched server-side into a scoped temp
//! file, which is then sent back as an attachment. The file lives exactly as
//! long as the response body that reads it.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::error::RelayError;
use crate::extract::describe_request_error;

pub const ATTACHMENT_NAME: &str = "video.mp4";
pub const ATTACHMENT_MIME: &str = "video/mp4";

// ── Scoped temp file ─────────────────────────────────────────────────────────

/// Owns a uniquely named temp file and deletes it on drop.
pub struct ScopedTempFile {
    path: PathBuf,
}

impl ScopedTempFile {
    pub fn create_in(dir: &Path) -> io::Result<(Self, std::fs::File)> {
        // Removal belongs to `Drop` below.
        let (file, path) = tempfile::Builder::new()
            .prefix("yt-relay-")
            .suffix(".mp4")
            .tempfile_in(dir)?
            .keep()?;
        Ok((Self { path }, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedTempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed temp file"),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temp file")
            }
        }
    }
}

/// Body stream that keeps the temp file alive until the body is finished or
/// dropped.
struct GuardedStream<S> {
    inner: S,
    _guard: ScopedTempFile,
}

impl<S> Stream for GuardedStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

// ── Download ─────────────────────────────────────────────────────────────────

pub struct TempDownload {
    guard: ScopedTempFile,
    file: tokio::fs::File,
    len: u64,
}

impl TempDownload {
    pub fn content_length(&self) -> u64 {
        self.len
    }

    pub fn into_body(self) -> Body {
        Body::from_stream(GuardedStream {
            inner: ReaderStream::new(self.file),
            _guard: self.guard,
        })
    }
}

/// Fetches `link` chunk by chunk into a fresh file under `dir`. On any error
/// the partially written file is removed before returning.
pub async fn download_to_temp(
    client: &reqwest::Client,
    link: &str,
    dir: &Path,
    timeout: Duration,
) -> Result<TempDownload, RelayError> {
    let (guard, file) = ScopedTempFile::create_in(dir)
        .map_err(|e| RelayError::Unexpected(format!("could not create temp file: {}", e)))?;
    let mut file = tokio::fs::File::from_std(file);

    let response = client
        .get(link)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| RelayError::Connection(describe_request_error(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::Connection(format!(
            "download returned status {}",
            status
        )));
    }

    let mut chunks = response.bytes_stream();
    let mut len: u64 = 0;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| RelayError::Connection(describe_request_error(&e)))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| RelayError::Unexpected(format!("could not write temp file: {}", e)))?;
        len += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| RelayError::Unexpected(format!("could not write temp file: {}", e)))?;
    drop(file);

    let file = tokio::fs::File::open(guard.path())
        .await
        .map_err(|e| RelayError::Unexpected(format!("could not reopen temp file: {}", e)))?;

    tracing::debug!(path = %guard.path().display(), bytes = len, "download buffered");

    Ok(TempDownload { guard, file, len })
}

/// Downloads `link` and answers with it as a `video.mp4` attachment.
pub async fn stream_download(
    client: &reqwest::Client,
    link: &str,
    dir: &Path,
    timeout: Duration,
) -> Result<Response, RelayError> {
    let download = download_to_temp(client, link, dir, timeout).await?;
    let len = download.content_length();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ATTACHMENT_MIME)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", ATTACHMENT_NAME),
        )
        .header(header::CONTENT_LENGTH, len)
        .body(download.into_body())
        .map_err(|e| RelayError::Unexpected(e.to_string()))
}

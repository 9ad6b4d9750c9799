//! Chunked file downloader.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::error::FileDownloadError;
use crate::plan::DownloadTask;
use crate::progress::{ProgressEvent, ProgressReporter, human_readable_size};
use crate::session::{Session, WorkerId};

/// Maximum bytes handed to a single write (1 MiB).
pub const DOWNLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// Result of a completed file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Where the file was written.
    pub path: PathBuf,
    /// Bytes written to disk.
    pub bytes_written: u64,
    /// Declared `Content-Length`, if the server sent one.
    pub content_length: Option<u64>,
}

/// Streams planned files to disk.
#[derive(Debug, Clone, Copy)]
pub struct FileDownloader {
    chunk_size: usize,
}

impl Default for FileDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileDownloader {
    /// Creates a downloader using [`DOWNLOAD_CHUNK_SIZE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DOWNLOAD_CHUNK_SIZE,
        }
    }

    /// Overrides the write chunk size. Zero is treated as one byte.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Downloads `task.url` into `task.destination`, replacing any existing file.
    ///
    /// The parent directory is created if needed. A partially written file is
    /// removed on failure.
    ///
    /// # Errors
    ///
    /// Returns a [`FileDownloadError`] for transport failures, non-success
    /// statuses, filesystem errors and short writes.
    #[instrument(skip(self, session, progress), fields(kind = %task.kind, path = %task.destination.display()))]
    pub async fn download(
        &self,
        task: &DownloadTask,
        session: &Session,
        worker: WorkerId,
        progress: &ProgressReporter,
    ) -> Result<DownloadedFile, FileDownloadError> {
        let url = task.url.as_str();
        let response = session
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| FileDownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FileDownloadError::http_status(url, status.as_u16()));
        }
        let content_length = response.content_length();

        let path = task.destination.as_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileDownloadError::io(parent, e))?;
        }
        let mut file = File::create(path)
            .await
            .map_err(|e| FileDownloadError::io(path, e))?;

        progress.emit(ProgressEvent::FileStarted {
            worker,
            path: path.to_path_buf(),
            total_bytes: content_length,
        });
        debug!(
            size = %content_length.map_or_else(|| "unknown".to_string(), human_readable_size),
            "downloading"
        );

        let result = self
            .stream_to_file(&mut file, response, url, path, worker, content_length, progress)
            .await;
        drop(file);

        let bytes_written = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("cleaning up partial file after error");
                let _ = tokio::fs::remove_file(path).await;
                return Err(e);
            }
        };

        info!(size = %human_readable_size(bytes_written), "download complete");
        Ok(DownloadedFile {
            path: path.to_path_buf(),
            bytes_written,
            content_length,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn stream_to_file(
        &self,
        file: &mut File,
        response: reqwest::Response,
        url: &str,
        path: &Path,
        worker: WorkerId,
        total_bytes: Option<u64>,
        progress: &ProgressReporter,
    ) -> Result<u64, FileDownloadError> {
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FileDownloadError::network(url, e))?;
            for piece in chunk.chunks(self.chunk_size) {
                let written = file
                    .write(piece)
                    .await
                    .map_err(|e| FileDownloadError::io(path, e))?;
                if written != piece.len() {
                    return Err(FileDownloadError::short_write(path, piece.len(), written));
                }
                bytes_written += piece.len() as u64;
                progress.emit(ProgressEvent::FileProgress {
                    worker,
                    bytes_written,
                    total_bytes,
                });
            }
        }

        file.flush()
            .await
            .map_err(|e| FileDownloadError::io(path, e))?;
        Ok(bytes_written)
    }
}

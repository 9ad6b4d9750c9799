//! Streaming of planned media files to disk.
//!
//! Each [`DownloadTask`](crate::plan::DownloadTask) is fetched through the
//! worker's session and written in bounded chunks. A failed file is removed
//! and reported as a [`FileDownloadError`]; retrying is up to the caller (the
//! pipeline does not retry individual files).

mod downloader;
mod error;

pub use downloader::{DOWNLOAD_CHUNK_SIZE, DownloadedFile, FileDownloader};
pub use error::FileDownloadError;

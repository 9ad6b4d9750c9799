//! Error types for file downloads.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while streaming one planned file to disk.
#[derive(Debug, Error)]
pub enum FileDownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (create directory, create file, write, flush).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A write accepted fewer bytes than the chunk held.
    #[error("short write to {path}: chunk of {expected} bytes, {written} written")]
    ShortWrite {
        /// Destination file.
        path: PathBuf,
        /// Chunk length.
        expected: usize,
        /// Bytes the write reported.
        written: usize,
    },
}

impl FileDownloadError {
    /// Creates a network error from a reqwest error, folding timeouts into
    /// [`FileDownloadError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a short write error.
    pub fn short_write(path: impl Into<PathBuf>, expected: usize, written: usize) -> Self {
        Self::ShortWrite {
            path: path.into(),
            expected,
            written,
        }
    }
}

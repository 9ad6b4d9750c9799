//! Error types for session acquisition.

use thiserror::Error;

/// Errors establishing a worker session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Every preferred and fallback proxy was rejected.
    #[error("no working proxy found after trying {tried} candidates")]
    ProxiesExhausted {
        /// Number of candidates probed.
        tried: usize,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The fallback proxy list could not be fetched.
    #[error("failed to fetch proxy list from {url}: {source}")]
    ProxyList {
        /// List URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
}

impl SessionError {
    /// Creates a client build error.
    pub fn client_build(source: reqwest::Error) -> Self {
        Self::ClientBuild { source }
    }

    /// Creates a proxy list fetch error.
    pub fn proxy_list(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::ProxyList {
            url: url.into(),
            source,
        }
    }
}

/// Reason a proxy candidate was rejected.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The candidate is not a usable proxy address.
    #[error("invalid proxy {proxy}: {source}")]
    InvalidProxy {
        /// Candidate address.
        proxy: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The probe request failed or timed out.
    #[error("probe of {url} through {proxy} failed: {source}")]
    Request {
        /// Candidate address.
        proxy: String,
        /// Probe URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The probe response carried a ban marker.
    #[error("probe of {url} through {proxy} hit ban marker {marker:?}")]
    Banned {
        /// Candidate address.
        proxy: String,
        /// Probe URL.
        url: String,
        /// Marker found in the body.
        marker: String,
    },
}

//! Resolved run configuration.
//!
//! [`RunConfig`] is the single record the pipeline reads its knobs from. The
//! CLI builds one from flags; tests build one with [`RunConfig::default`] and
//! override the fields they care about.

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::EngineError;

/// Default maximum number of re-fetches when the embedded data block is missing.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default fixed delay between page fetch attempts (5 seconds).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default timeout for a single proxy probe request (5 seconds).
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default HTTP connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default HTTP read timeout (5 minutes for large media files).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Lower bound on the default worker count.
pub const MIN_DEFAULT_WORKERS: usize = 32;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 128;

/// Endpoints a proxy must serve cleanly before it is bound to a worker.
pub const DEFAULT_PROBE_URLS: &[&str] = &["https://tiktok.com"];

/// Response body markers (matched case-insensitively) that reject a proxy.
pub const DEFAULT_BAN_MARKERS: &[&str] = &["geoblocking_page", "<title>error</title>"];

/// Free proxy list consulted once the preferred proxies are exhausted.
pub const DEFAULT_PROXY_LIST_URL: &str = "https://api.proxyscrape.com/v4/free-proxy-list/get?request=display_proxies&protocol=http&proxy_format=protocolipport&format=text&anonymity=Elite&timeout=20000";

/// Default worker count: `max(32, available cores)`, capped at [`MAX_WORKERS`].
#[must_use]
pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    cores.max(MIN_DEFAULT_WORKERS).min(MAX_WORKERS)
}

/// Parses a comma separated proxy list.
///
/// Blank entries are dropped. Returns `None` when nothing usable remains, which
/// means "no proxies configured" rather than "an empty preferred list".
#[must_use]
pub fn parse_proxy_list(raw: &str) -> Option<Vec<String>> {
    let proxies: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect();
    (!proxies.is_empty()).then_some(proxies)
}

/// Resolved configuration for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of parallel workers (1-128).
    pub worker_count: usize,
    /// Root directory that receives the per-list output folders and reports.
    pub download_root: PathBuf,
    /// Preferred proxies, tried in order. `None` disables proxying entirely.
    pub preferred_proxies: Option<Vec<String>>,
    /// Timeout for each proxy probe request.
    pub proxy_timeout: Duration,
    /// HTTP connect timeout for worker sessions.
    pub connect_timeout: Duration,
    /// HTTP read timeout for worker sessions.
    pub read_timeout: Duration,
    /// Additional page fetch attempts after the first one.
    pub max_retries: u32,
    /// Fixed delay between page fetch attempts.
    pub retry_delay: Duration,
    /// Endpoints probed through a candidate proxy.
    pub probe_urls: Vec<String>,
    /// Body markers that disqualify a candidate proxy.
    pub ban_markers: Vec<String>,
    /// Where the fallback free proxy list is fetched from.
    pub proxy_list_url: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            download_root: PathBuf::from("./DownloadedFiles"),
            preferred_proxies: None,
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            probe_urls: DEFAULT_PROBE_URLS.iter().map(ToString::to_string).collect(),
            ban_markers: DEFAULT_BAN_MARKERS.iter().map(ToString::to_string).collect(),
            proxy_list_url: DEFAULT_PROXY_LIST_URL.to_string(),
        }
    }
}

impl RunConfig {
    /// Checks the values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkerCount`] if the worker count is
    /// outside 1-128.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.worker_count) {
            return Err(EngineError::InvalidWorkerCount {
                value: self.worker_count,
            });
        }
        Ok(())
    }

    /// Output folder for the favorites list.
    #[must_use]
    pub fn favorites_dir(&self) -> PathBuf {
        self.download_root.join("favoriteVideos")
    }

    /// Report path for the favorites list.
    #[must_use]
    pub fn favorites_report(&self) -> PathBuf {
        self.download_root.join("favoriteVideos.log")
    }

    /// Output folder for the likes list.
    #[must_use]
    pub fn likes_dir(&self) -> PathBuf {
        self.download_root.join("likedVideos")
    }

    /// Report path for the likes list.
    #[must_use]
    pub fn likes_report(&self) -> PathBuf {
        self.download_root.join("likedVideos.log")
    }
}

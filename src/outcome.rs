//! Outcome buckets, aggregation and reports.
//!
//! Every input URL ends in exactly one [`OutcomeBucket`]. Workers record into a
//! shared [`ResultAggregator`]; once the pool has drained the aggregator is
//! turned into an immutable [`ResultSet`] that can be summarized and persisted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, instrument};

const BUCKET_COUNT: usize = 10;

/// Terminal classification of one item's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutcomeBucket {
    /// Video (and any music) downloaded.
    DownloadedVideo,
    /// Image gallery (and any music) downloaded.
    DownloadedImage,
    /// Both a video and an image gallery downloaded.
    DownloadedBoth,
    /// Neither video nor images present; metadata and music still archived.
    DownloadedNeither,
    /// The page or its data did not match expectations.
    ParseError,
    /// Metadata succeeded but at least one media file failed.
    DownloadError,
    /// The item was removed or is otherwise unavailable.
    NotAvailable,
    /// The item is classified (age restricted).
    Restricted,
    /// The item is private.
    Private,
    /// No working network path could be established.
    ProxyError,
}

impl OutcomeBucket {
    /// Every bucket, in report order.
    pub const ALL: [OutcomeBucket; BUCKET_COUNT] = [
        Self::DownloadedVideo,
        Self::DownloadedImage,
        Self::DownloadedBoth,
        Self::DownloadedNeither,
        Self::ParseError,
        Self::DownloadError,
        Self::NotAvailable,
        Self::Restricted,
        Self::Private,
        Self::ProxyError,
    ];

    /// Name used in summaries and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DownloadedVideo => "DownloadedVideo",
            Self::DownloadedImage => "DownloadedImage",
            Self::DownloadedBoth => "DownloadedBoth",
            Self::DownloadedNeither => "DownloadedNeither",
            Self::ParseError => "ParseError",
            Self::DownloadError => "DownloadError",
            Self::NotAvailable => "NotAvailable",
            Self::Restricted => "Restricted",
            Self::Private => "Private",
            Self::ProxyError => "ProxyError",
        }
    }

    /// Returns true for the four successful download outcomes.
    #[must_use]
    pub fn is_downloaded(self) -> bool {
        matches!(
            self,
            Self::DownloadedVideo
                | Self::DownloadedImage
                | Self::DownloadedBoth
                | Self::DownloadedNeither
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for OutcomeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report file could not be written.
    #[error("failed to write report {path}: {source}")]
    Io {
        /// Report path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-bucket counts and their total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    counts: [usize; BUCKET_COUNT],
}

impl Summary {
    /// Number of URLs in `bucket`.
    #[must_use]
    pub fn count(&self, bucket: OutcomeBucket) -> usize {
        self.counts[bucket.index()]
    }

    /// Number of URLs across all buckets.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Num Urls: {}", self.total())?;
        for bucket in OutcomeBucket::ALL {
            write!(f, " | {}: {}", bucket.name(), self.count(bucket))?;
        }
        Ok(())
    }
}

/// Mapping from bucket to the URLs assigned to it, in recording order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    buckets: [Vec<String>; BUCKET_COUNT],
}

impl ResultSet {
    /// URLs assigned to `bucket`.
    #[must_use]
    pub fn urls(&self, bucket: OutcomeBucket) -> &[String] {
        &self.buckets[bucket.index()]
    }

    /// Number of URLs assigned to `bucket`.
    #[must_use]
    pub fn count(&self, bucket: OutcomeBucket) -> usize {
        self.urls(bucket).len()
    }

    /// Per-bucket counts.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for bucket in OutcomeBucket::ALL {
            summary.counts[bucket.index()] = self.count(bucket);
        }
        summary
    }

    /// Iterates over all `(bucket, url)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (OutcomeBucket, &str)> {
        OutcomeBucket::ALL.into_iter().flat_map(move |bucket| {
            self.urls(bucket)
                .iter()
                .map(move |url| (bucket, url.as_str()))
        })
    }

    /// Renders the human readable report.
    #[must_use]
    pub fn render_report(&self) -> String {
        let mut report = format!("Result Summary - {}\n\n", self.summary());
        for bucket in OutcomeBucket::ALL {
            let urls = self.urls(bucket);
            report.push_str(&format!(
                "{} Urls [{}]:\n\t{}\n\n",
                bucket.name(),
                urls.len(),
                urls.join("\n\t")
            ));
        }
        report
    }

    /// Writes the report to `path`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the file cannot be written.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn persist(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ReportError::io(parent, e))?;
        }
        tokio::fs::write(path, self.render_report())
            .await
            .map_err(|e| ReportError::io(path, e))?;
        info!(summary = %self.summary(), "report written");
        Ok(())
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.summary(), f)
    }
}

/// Thread-safe collector of per-item outcomes.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Mutex<ResultSet>,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `url` to the bucket for `outcome`.
    pub fn record(&self, url: impl Into<String>, outcome: OutcomeBucket) {
        let url = url.into();
        debug!(url = %url, %outcome, "recording outcome");
        // A panicking recorder cannot leave the set half-updated: push is the only mutation.
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        results.buckets[outcome.index()].push(url);
    }

    /// Current per-bucket counts.
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.snapshot().summary()
    }

    /// Copy of the current results.
    #[must_use]
    pub fn snapshot(&self) -> ResultSet {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes the current results as a report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the file cannot be written.
    pub async fn persist(&self, path: &Path) -> Result<(), ReportError> {
        self.snapshot().persist(path).await
    }

    /// Consumes the aggregator and returns the collected results.
    #[must_use]
    pub fn into_result_set(self) -> ResultSet {
        self.results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_record_and_summary() {
        let aggregator = ResultAggregator::new();
        aggregator.record("u1", OutcomeBucket::DownloadedVideo);
        aggregator.record("u2", OutcomeBucket::Private);
        aggregator.record("u3", OutcomeBucket::DownloadedVideo);

        let summary = aggregator.summary();
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.count(OutcomeBucket::DownloadedVideo), 2);
        assert_eq!(summary.count(OutcomeBucket::ProxyError), 0);

        let results = aggregator.into_result_set();
        assert_eq!(results.urls(OutcomeBucket::DownloadedVideo), ["u1", "u3"]);
    }

    #[test]
    fn test_summary_display_lists_every_bucket_in_order() {
        let aggregator = ResultAggregator::new();
        aggregator.record("u1", OutcomeBucket::DownloadedVideo);
        let line = aggregator.summary().to_string();
        assert!(line.starts_with("Num Urls: 1 | DownloadedVideo: 1 | DownloadedImage: 0"));
        assert!(line.ends_with("Private: 0 | ProxyError: 0"), "Got: {line}");
    }

    #[test]
    fn test_concurrent_records_are_all_kept() {
        let aggregator = Arc::new(ResultAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let bucket = OutcomeBucket::ALL[(t + i) % OutcomeBucket::ALL.len()];
                        aggregator.record(format!("u-{t}-{i}"), bucket);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let results = Arc::try_unwrap(aggregator).unwrap().into_result_set();
        assert_eq!(results.summary().total(), 400);
        let mut urls: Vec<_> = results.iter().map(|(_, url)| url.to_string()).collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 400);
    }

    #[test]
    fn test_render_report_format() {
        let aggregator = ResultAggregator::new();
        aggregator.record("https://a", OutcomeBucket::NotAvailable);
        aggregator.record("https://b", OutcomeBucket::NotAvailable);
        let report = aggregator.into_result_set().render_report();
        assert!(report.starts_with("Result Summary - Num Urls: 2 | "));
        assert!(report.contains("NotAvailable Urls [2]:\n\thttps://a\n\thttps://b\n\n"));
        assert!(report.contains("DownloadedVideo Urls [0]:\n\t\n\n"));
    }

    #[tokio::test]
    async fn test_persist_writes_report() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("favoriteVideos.log");
        let aggregator = ResultAggregator::new();
        aggregator.record("https://a", OutcomeBucket::DownloadedVideo);
        aggregator.persist(&path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("DownloadedVideo: 1"), "Expected count in: {text}");
    }
}

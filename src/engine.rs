//! Bounded worker pool driving the per-item pipeline.
//!
//! [`ArchiveEngine::run`] spawns one Tokio task per worker. Workers pull the
//! next URL index from a shared counter and take each item through
//! fetch, extract, classify, plan and download, ending in exactly one
//! [`OutcomeBucket`]. Nothing that happens to one item, panics included, can
//! stop the pool or affect another item.
//!
//! # Concurrency Model
//!
//! - Each worker owns a [`WorkerContext`] holding its identity and session
//! - Sessions come from the shared [`SessionProvider`] and are never shared
//! - The result aggregator is the only state workers mutate together
//! - Files of one item are downloaded serially by that item's worker

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::classify::{Verdict, classify};
use crate::config::{MAX_WORKERS, MIN_WORKERS, RunConfig};
use crate::download::FileDownloader;
use crate::item::ExtractionRecord;
use crate::metadata::write_metadata;
use crate::outcome::{OutcomeBucket, ResultAggregator, ResultSet};
use crate::page::PageFetcher;
use crate::plan::DownloadPlanner;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::session::{Session, SessionError, SessionProvider, WorkerId};

/// Characters of raw page content kept in diagnostics.
const RAW_PREVIEW_CHARS: usize = 2000;

/// Error type for engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The session provider could not be created.
    #[error("session setup failed: {0}")]
    Session(#[from] SessionError),
}

/// Runs item lists through the acquisition pipeline.
#[derive(Debug)]
pub struct ArchiveEngine {
    worker_count: usize,
    sessions: Arc<SessionProvider>,
    fetcher: PageFetcher,
    downloader: FileDownloader,
}

impl ArchiveEngine {
    /// Creates an engine sharing `sessions` across runs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkerCount`] if the configured worker
    /// count is outside 1-128.
    #[instrument(level = "debug", skip_all, fields(workers = config.worker_count))]
    pub fn new(config: &RunConfig, sessions: Arc<SessionProvider>) -> Result<Self, EngineError> {
        config.validate()?;
        debug!(
            max_retries = config.max_retries,
            proxies = sessions.uses_proxies(),
            "creating archive engine"
        );
        Ok(Self {
            worker_count: config.worker_count,
            sessions,
            fetcher: PageFetcher::from_config(config),
            downloader: FileDownloader::new(),
        })
    }

    /// Creates an engine with its own session provider.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the configuration is invalid or the provider
    /// cannot be created.
    pub fn from_config(config: &RunConfig) -> Result<Self, EngineError> {
        let sessions = Arc::new(SessionProvider::new(config)?);
        Self::new(config, sessions)
    }

    /// Configured number of workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Session provider shared by the workers.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionProvider> {
        &self.sessions
    }

    /// Processes every URL and returns where each one ended up.
    ///
    /// Items are archived under `destination`. The returned set partitions
    /// `urls`: each input appears in exactly one bucket.
    #[instrument(skip(self, urls, progress), fields(items = urls.len(), destination = %destination.display()))]
    pub async fn run(
        &self,
        urls: Vec<String>,
        destination: &Path,
        progress: ProgressReporter,
    ) -> ResultSet {
        let workers = self.worker_count.min(urls.len());
        info!(workers, "starting run");

        let shared = Arc::new(SharedState {
            urls,
            next: AtomicUsize::new(0),
            results: ResultAggregator::new(),
            sessions: Arc::clone(&self.sessions),
            fetcher: self.fetcher,
            downloader: self.downloader,
            planner: DownloadPlanner::new(destination),
            progress,
        });

        let handles: Vec<_> = (0..workers)
            .map(|i| {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    let mut context = WorkerContext::new(WorkerId(i));
                    context.run(&shared).await;
                })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task failed");
            }
        }

        let results = match Arc::try_unwrap(shared) {
            Ok(shared) => shared.results.into_result_set(),
            Err(shared) => shared.results.snapshot(),
        };
        info!(summary = %results.summary(), "run complete");
        results
    }
}

/// State every worker of one run reads.
#[derive(Debug)]
struct SharedState {
    urls: Vec<String>,
    next: AtomicUsize,
    results: ResultAggregator,
    sessions: Arc<SessionProvider>,
    fetcher: PageFetcher,
    downloader: FileDownloader,
    planner: DownloadPlanner,
    progress: ProgressReporter,
}

impl SharedState {
    fn next_url(&self) -> Option<&str> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.urls.get(index).map(String::as_str)
    }
}

/// Per-worker context threaded through the pipeline.
#[derive(Debug)]
struct WorkerContext {
    id: WorkerId,
    session: Option<Session>,
}

impl WorkerContext {
    fn new(id: WorkerId) -> Self {
        Self { id, session: None }
    }

    async fn run(&mut self, shared: &SharedState) {
        let id = self.id;
        while let Some(url) = shared.next_url() {
            shared.progress.emit(ProgressEvent::ItemStarted {
                worker: id,
                url: url.to_string(),
            });

            let outcome = AssertUnwindSafe(self.process(shared, url))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(worker = %id, url, "item processing panicked");
                    OutcomeBucket::ParseError
                });

            shared.results.record(url, outcome);
            shared.progress.emit(ProgressEvent::ItemFinished {
                worker: id,
                url: url.to_string(),
                outcome,
            });
        }
        debug!(worker = %id, "worker finished");
    }

    async fn session(&mut self, shared: &SharedState) -> Result<Session, SessionError> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        let session = shared.sessions.acquire(self.id).await?;
        self.session = Some(session.clone());
        Ok(session)
    }

    #[instrument(skip(self, shared), fields(worker = %self.id))]
    async fn process(&mut self, shared: &SharedState, url: &str) -> OutcomeBucket {
        if let Err(e) = Url::parse(url) {
            warn!(error = %e, "not a valid item URL");
            return OutcomeBucket::ParseError;
        }

        let session = match self.session(shared).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "no session available");
                return OutcomeBucket::ProxyError;
            }
        };

        let block = match shared.fetcher.fetch(url, &session).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, "page fetch failed");
                if let Some(raw) = e.last_response() {
                    debug!(raw = %preview(raw), "last page content");
                }
                return OutcomeBucket::ParseError;
            }
        };

        let record = match ExtractionRecord::from_json(block.text()) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "data block did not decode");
                debug!(raw = %preview(block.text()), "offending data block");
                return OutcomeBucket::ParseError;
            }
        };

        if let Verdict::Terminal(outcome) = classify(&record) {
            info!(status_code = record.status_code, %outcome, "item not archived");
            return outcome;
        }
        let Some(item) = record.item else {
            warn!("cleared item carries no content");
            return OutcomeBucket::ParseError;
        };

        let plan = match shared.planner.plan(&item) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "item cannot be planned");
                debug!(raw = %preview(block.text()), "offending data block");
                return OutcomeBucket::ParseError;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&plan.directory).await {
            warn!(error = %e, path = %plan.directory.display(), "cannot create item directory");
            return OutcomeBucket::DownloadError;
        }
        if let Err(e) = write_metadata(&plan.directory, url, &item).await {
            warn!(error = %e, "metadata write failed");
            return OutcomeBucket::DownloadError;
        }

        let mut failed = 0_usize;
        for task in &plan.tasks {
            if let Err(e) = shared
                .downloader
                .download(task, &session, self.id, &shared.progress)
                .await
            {
                warn!(error = %e, kind = %task.kind, "file download failed");
                failed += 1;
            }
        }
        if failed > 0 {
            warn!(failed, total = plan.tasks.len(), "item incomplete");
            return OutcomeBucket::DownloadError;
        }

        info!(outcome = %plan.outcome, path = %plan.directory.display(), "item archived");
        plan.outcome
    }
}

/// Prefix of `text` suitable for a log line.
fn preview(text: &str) -> &str {
    match text.char_indices().nth(RAW_PREVIEW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::ProxyListSource;
    use crate::test_support::fixtures::{item_page, status_block, video_block};
    use crate::test_support::socket_guard::start_mock_server_or_skip;

    fn test_config(workers: usize) -> RunConfig {
        RunConfig {
            worker_count: workers,
            max_retries: 1,
            retry_delay: std::time::Duration::from_millis(5),
            ..RunConfig::default()
        }
    }

    async fn mount_page(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_invalid_worker_count_rejected() {
        for value in [0, 129] {
            let err = ArchiveEngine::from_config(&test_config(value)).unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidWorkerCount { value: v } if v == value),
                "Got: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_parse_error_without_network() {
        let config = RunConfig {
            preferred_proxies: Some(vec!["not a proxy".into()]),
            ..test_config(1)
        };
        let sessions = Arc::new(SessionProvider::with_proxy_list(&config, Arc::new(EmptyList)));
        let engine = ArchiveEngine::new(&config, sessions).unwrap();
        let temp_dir = TempDir::new().unwrap();
        let results = engine
            .run(vec!["no scheme here".into()], temp_dir.path(), ProgressReporter::disabled())
            .await;
        assert_eq!(results.count(OutcomeBucket::ParseError), 1);
        assert_eq!(engine.sessions().session_count(), 0);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(RAW_PREVIEW_CHARS + 10);
        assert_eq!(preview(&text).chars().count(), RAW_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_results() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ArchiveEngine::from_config(&test_config(4)).unwrap();
        let results = engine
            .run(Vec::new(), temp_dir.path(), ProgressReporter::disabled())
            .await;
        assert_eq!(results.summary().total(), 0);
    }

    #[tokio::test]
    async fn test_run_partitions_urls_across_buckets() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let base = server.uri();
        mount_page(&server, "/removed", item_page(&status_block(10204))).await;
        mount_page(&server, "/private", item_page(&status_block(10222))).await;
        mount_page(&server, "/odd", item_page(&status_block(77))).await;
        mount_page(&server, "/challenge", "<html>verify</html>".to_string()).await;
        mount_page(&server, "/ok", item_page(&video_block("7", "bob", "Clip", &base))).await;
        for route in ["/video/7", "/music/7", "/cover/7"] {
            mount_page(&server, route, "bytes".to_string()).await;
        }

        let urls: Vec<String> = ["/removed", "/private", "/odd", "/challenge", "/ok"]
            .iter()
            .map(|route| format!("{base}{route}"))
            .collect();
        let temp_dir = TempDir::new().unwrap();
        let engine = ArchiveEngine::from_config(&test_config(3)).unwrap();
        let results = engine
            .run(urls.clone(), temp_dir.path(), ProgressReporter::disabled())
            .await;

        let seen: Vec<&str> = results.iter().map(|(_, url)| url).collect();
        assert_eq!(seen.len(), urls.len());
        let unique: HashSet<&str> = seen.iter().copied().collect();
        let expected: HashSet<&str> = urls.iter().map(String::as_str).collect();
        assert_eq!(unique, expected);

        assert_eq!(results.urls(OutcomeBucket::NotAvailable), [format!("{base}/removed")]);
        assert_eq!(results.urls(OutcomeBucket::Private), [format!("{base}/private")]);
        assert_eq!(results.count(OutcomeBucket::ParseError), 2);
        assert_eq!(results.urls(OutcomeBucket::DownloadedVideo), [format!("{base}/ok")]);

        let item_dir = temp_dir.path().join("bob").join("Clip - 7");
        assert!(item_dir.join("metadata.txt").exists());
        assert_eq!(std::fs::read(item_dir.join("video.mp4")).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_failed_media_download_is_download_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let base = server.uri();
        mount_page(&server, "/item", item_page(&video_block("9", "carol", "Hi", &base))).await;
        mount_page(&server, "/video/9", "v".to_string()).await;
        mount_page(&server, "/cover/9", "c".to_string()).await;
        Mock::given(method("GET"))
            .and(path("/music/9"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let engine = ArchiveEngine::from_config(&test_config(1)).unwrap();
        let results = engine
            .run(vec![format!("{base}/item")], temp_dir.path(), ProgressReporter::disabled())
            .await;

        assert_eq!(results.count(OutcomeBucket::DownloadError), 1);
        let item_dir = temp_dir.path().join("carol").join("Hi - 9");
        assert!(item_dir.join("metadata.txt").exists());
        // Remaining files are still fetched.
        assert!(item_dir.join("video.mp4").exists());
    }

    #[derive(Debug)]
    struct EmptyList;

    #[async_trait::async_trait]
    impl ProxyListSource for EmptyList {
        async fn fetch(&self) -> Result<Vec<String>, SessionError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_no_working_proxy_is_proxy_error() {
        let config = RunConfig {
            preferred_proxies: Some(vec!["not a proxy".into()]),
            ..test_config(2)
        };
        let sessions = Arc::new(SessionProvider::with_proxy_list(&config, Arc::new(EmptyList)));
        let engine = ArchiveEngine::new(&config, sessions).unwrap();
        let temp_dir = TempDir::new().unwrap();
        let urls = vec!["https://a.invalid/1".to_string(), "https://a.invalid/2".to_string()];

        let (progress, mut events) = ProgressReporter::channel();
        let results = engine.run(urls, temp_dir.path(), progress).await;
        assert_eq!(results.count(OutcomeBucket::ProxyError), 2);

        let mut finished = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, ProgressEvent::ItemFinished { outcome: OutcomeBucket::ProxyError, .. }) {
                finished += 1;
            }
        }
        assert_eq!(finished, 2);
    }
}

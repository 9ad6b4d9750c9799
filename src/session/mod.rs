//! Per-worker HTTP sessions with optional validated proxies.
//!
//! Each worker owns exactly one [`Session`] for the whole run. Without a proxy
//! list the session is a plain client. With one, candidates are probed in
//! order (preferred list first, then a fetched fallback list) and the first
//! candidate that serves every probe URL without a ban marker is bound to the
//! worker. A bound session is never replaced.
//!
//! The worker-to-session map is guarded by a single lock that is only held for
//! lookups and inserts; probing happens outside it.

mod error;
mod proxy_list;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

pub use error::{ProbeError, SessionError};
pub use proxy_list::{ProxyListSource, RemoteProxyList, parse_proxy_lines};

use crate::config::RunConfig;

/// Browser User-Agent sent on every request.
///
/// Item pages served to non-browser agents omit the embedded data block.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Identity of a worker in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// A reusable HTTP client, optionally routed through a proxy.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    proxy: Option<String>,
}

impl Session {
    /// Wraps an existing client as a direct (unproxied) session.
    #[must_use]
    pub fn direct(client: Client) -> Self {
        Self {
            client,
            proxy: None,
        }
    }

    /// HTTP client for page and media requests.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Proxy the session is bound to, if any.
    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }
}

/// Builder shared by plain and proxied sessions.
pub(crate) fn base_client_builder(connect_timeout: Duration, read_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(read_timeout)
        .gzip(true)
        .cookie_store(true)
        .user_agent(BROWSER_USER_AGENT)
}

/// Supplies each worker its session.
#[derive(Debug)]
pub struct SessionProvider {
    preferred_proxies: Option<Vec<String>>,
    proxy_timeout: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
    probe_urls: Vec<String>,
    ban_markers: Vec<String>,
    proxy_list: Arc<dyn ProxyListSource>,
    fallback: OnceCell<Vec<String>>,
    sessions: Mutex<HashMap<WorkerId, Session>>,
}

impl SessionProvider {
    /// Creates a provider from the run configuration, using the configured
    /// remote list as the fallback proxy source.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ClientBuild`] if the list client cannot be built.
    pub fn new(config: &RunConfig) -> Result<Self, SessionError> {
        let list_client = base_client_builder(config.connect_timeout, config.read_timeout)
            .build()
            .map_err(SessionError::client_build)?;
        let source = RemoteProxyList::new(config.proxy_list_url.clone(), list_client);
        Ok(Self::with_proxy_list(config, Arc::new(source)))
    }

    /// Creates a provider with an explicit fallback proxy source.
    #[must_use]
    pub fn with_proxy_list(config: &RunConfig, proxy_list: Arc<dyn ProxyListSource>) -> Self {
        // Lower-case once; bodies are lower-cased before matching.
        let ban_markers = config
            .ban_markers
            .iter()
            .map(|m| m.to_lowercase())
            .collect();
        Self {
            preferred_proxies: config.preferred_proxies.clone(),
            proxy_timeout: config.proxy_timeout,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            probe_urls: config.probe_urls.clone(),
            ban_markers,
            proxy_list,
            fallback: OnceCell::new(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if sessions are routed through proxies.
    #[must_use]
    pub fn uses_proxies(&self) -> bool {
        self.preferred_proxies.is_some()
    }

    /// Number of workers with a bound session.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(&self, worker: WorkerId) -> Option<Session> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&worker)
            .cloned()
    }

    /// Binds `session` to `worker` unless one is already bound, and returns
    /// the bound session.
    fn bind(&self, worker: WorkerId, session: Session) -> Session {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(worker)
            .or_insert(session)
            .clone()
    }

    /// Returns the worker's session, creating and validating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ProxiesExhausted`] if proxies are configured and
    /// none passes the probe, or [`SessionError::ClientBuild`] if the plain
    /// client cannot be built.
    #[instrument(skip(self))]
    pub async fn acquire(&self, worker: WorkerId) -> Result<Session, SessionError> {
        if let Some(session) = self.cached(worker) {
            return Ok(session);
        }

        let Some(preferred) = &self.preferred_proxies else {
            let client = base_client_builder(self.connect_timeout, self.read_timeout)
                .build()
                .map_err(SessionError::client_build)?;
            debug!("created plain session");
            return Ok(self.bind(worker, Session { client, proxy: None }));
        };

        let mut tried = 0;
        for candidate in preferred {
            tried += 1;
            if let Some(session) = self.try_candidate(candidate).await {
                return Ok(self.bind(worker, session));
            }
        }

        debug!("preferred proxies exhausted, trying fallback list");
        for candidate in self.fallback_candidates().await {
            tried += 1;
            if let Some(session) = self.try_candidate(candidate).await {
                return Ok(self.bind(worker, session));
            }
        }

        warn!(tried, "no working proxy found");
        Err(SessionError::ProxiesExhausted { tried })
    }

    /// Fallback candidates, fetched at most once per provider.
    async fn fallback_candidates(&self) -> &[String] {
        self.fallback
            .get_or_init(|| async {
                match self.proxy_list.fetch().await {
                    Ok(list) => list,
                    Err(e) => {
                        warn!(error = %e, "failed to fetch fallback proxy list");
                        Vec::new()
                    }
                }
            })
            .await
    }

    async fn try_candidate(&self, candidate: &str) -> Option<Session> {
        match self.probe(candidate).await {
            Ok(session) => {
                info!(proxy = candidate, "bound proxy");
                Some(session)
            }
            Err(e) => {
                debug!(error = %e, "rejected proxy");
                None
            }
        }
    }

    /// Probes a candidate against every probe URL.
    ///
    /// # Errors
    ///
    /// Returns the [`ProbeError`] explaining why the candidate was rejected.
    pub async fn probe(&self, candidate: &str) -> Result<Session, ProbeError> {
        let invalid = |source| ProbeError::InvalidProxy {
            proxy: candidate.to_string(),
            source,
        };
        let proxy = Proxy::all(candidate).map_err(invalid)?;
        let client = base_client_builder(self.connect_timeout, self.read_timeout)
            .proxy(proxy)
            .build()
            .map_err(invalid)?;

        for url in &self.probe_urls {
            debug!(proxy = candidate, url = %url, "probing proxy");
            let request_error = |source| ProbeError::Request {
                proxy: candidate.to_string(),
                url: url.clone(),
                source,
            };
            let body = client
                .get(url)
                .timeout(self.proxy_timeout)
                .send()
                .await
                .map_err(request_error)?
                .text()
                .await
                .map_err(request_error)?
                .to_lowercase();
            if let Some(marker) = self.ban_markers.iter().find(|m| body.contains(m.as_str())) {
                return Err(ProbeError::Banned {
                    proxy: candidate.to_string(),
                    url: url.clone(),
                    marker: marker.clone(),
                });
            }
        }

        Ok(Session {
            client,
            proxy: Some(candidate.to_string()),
        })
    }
}

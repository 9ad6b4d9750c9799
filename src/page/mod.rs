//! Item page fetching and embedded data block extraction.
//!
//! Item pages carry their state as JSON inside a single
//! `<script id="__UNIVERSAL_DATA_FOR_REHYDRATION__">` element. Pages served as
//! an anti-automation challenge lack it; those are fetched again under a
//! [`RetryPolicy`]. Transport failures are not retried.

mod retry;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use retry::{RetryDecision, RetryPolicy};

use crate::config::RunConfig;
use crate::session::Session;

/// Id of the script element holding the page state.
pub const DATA_BLOCK_ID: &str = "__UNIVERSAL_DATA_FOR_REHYDRATION__";

#[allow(clippy::expect_used)]
static DATA_BLOCK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("script#{DATA_BLOCK_ID}")).expect("data block selector is valid")
});

/// Raw text of the embedded data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    text: String,
}

impl RawBlock {
    /// Wraps block text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Block text, expected to be JSON.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the block and returns its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Errors fetching an item page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request or body read failed.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// Page URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// No attempt produced exactly one data block.
    #[error("data block not found in {url} after {attempts} attempts ({found} matching elements in last response)")]
    BlockMissing {
        /// Page URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Matching elements in the last response.
        found: usize,
        /// Last response body, for diagnostics.
        last_response: String,
    },
}

impl FetchError {
    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Last raw content seen, if any.
    #[must_use]
    pub fn last_response(&self) -> Option<&str> {
        match self {
            Self::Network { .. } => None,
            Self::BlockMissing { last_response, .. } => Some(last_response),
        }
    }
}

/// Finds the single data block in `html`.
///
/// # Errors
///
/// Returns the number of matching elements when it is not exactly one.
pub fn extract_block(html: &str) -> Result<RawBlock, usize> {
    let document = Html::parse_document(html);
    let mut matches = document.select(&DATA_BLOCK_SELECTOR);
    match (matches.next(), matches.next()) {
        (Some(element), None) => Ok(RawBlock::new(element.text().collect::<String>())),
        (None, _) => Err(0),
        (Some(_), Some(_)) => Err(2 + matches.count()),
    }
}

/// Fetches item pages and extracts their data block.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageFetcher {
    policy: RetryPolicy,
}

impl PageFetcher {
    /// Creates a fetcher that retries up to `max_retries` times, `delay` apart.
    #[must_use]
    pub fn new(max_retries: u32, delay: std::time::Duration) -> Self {
        Self {
            policy: RetryPolicy::new(max_retries, delay),
        }
    }

    /// Creates a fetcher from the run configuration.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }

    /// Retry policy in use.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches `url` through `session` and returns its data block.
    ///
    /// The response status is not checked: challenge pages are recognised by
    /// the missing block, not by status.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] on the first transport failure, or
    /// [`FetchError::BlockMissing`] once the retry budget is spent.
    #[instrument(skip(self, session), fields(proxy = session.proxy()))]
    pub async fn fetch(&self, url: &str, session: &Session) -> Result<RawBlock, FetchError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;
        loop {
            let body = session
                .client()
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::network(url, e))?
                .text()
                .await
                .map_err(|e| FetchError::network(url, e))?;

            let found = match extract_block(&body) {
                Ok(block) => {
                    debug!(attempt, bytes = block.text().len(), "data block extracted");
                    return Ok(block);
                }
                Err(found) => found,
            };

            match self.policy.should_retry(attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        found,
                        "[{attempt}/{max_attempts}] data block missing, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(found, reason = %reason, "data block missing");
                    return Err(FetchError::BlockMissing {
                        url: url.to_string(),
                        attempts: attempt,
                        found,
                        last_response: body,
                    });
                }
            }
        }
    }
}

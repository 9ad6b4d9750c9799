//! Sources of fallback proxy candidates.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::SessionError;

/// Supplies proxy candidates once the preferred list is exhausted.
///
/// Uses `async_trait` so providers can hold it as `Arc<dyn ProxyListSource>`.
#[async_trait]
pub trait ProxyListSource: Send + Sync + Debug {
    /// Returns candidate proxy addresses in the order they should be tried.
    async fn fetch(&self) -> Result<Vec<String>, SessionError>;
}

/// Plain-text proxy list served over HTTP, one address per line.
#[derive(Debug, Clone)]
pub struct RemoteProxyList {
    url: String,
    client: Client,
}

impl RemoteProxyList {
    /// Creates a source reading `url` with `client`.
    #[must_use]
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// List URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Splits a plain-text list into trimmed, non-empty entries.
#[must_use]
pub fn parse_proxy_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[async_trait]
impl ProxyListSource for RemoteProxyList {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<String>, SessionError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SessionError::proxy_list(&self.url, e))?
            .text()
            .await
            .map_err(|e| SessionError::proxy_list(&self.url, e))?;
        let proxies = parse_proxy_lines(&body);
        debug!(count = proxies.len(), "fetched fallback proxy list");
        Ok(proxies)
    }
}

//! Page retrieval.
//!
//! `HttpFetcher` is the production implementation; `MockFetcher` serves
//! canned pages for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Url;
use tracing::debug;

use newslens_core::config::IngestConfig;
use newslens_core::error::NewslensError;

/// Fetches the body of a page as text.
pub trait PageFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<String, NewslensError>> + Send;

    /// Whether `url` may be fetched at all. Links failing this check are
    /// skipped rather than treated as errors.
    fn allows(&self, _url: &str) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Fetcher backed by a shared reqwest client.
///
/// Only `http` and `https` URLs are fetched. When `allowed_hosts` is
/// non-empty, a URL's host must equal one of the entries or be a subdomain
/// of one.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    allowed_hosts: Vec<String>,
}

impl HttpFetcher {
    pub fn from_config(config: &IngestConfig) -> Result<Self, NewslensError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| NewslensError::Fetch(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            allowed_hosts: config
                .allowed_hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        })
    }

    fn check_url(&self, url: &str) -> Result<Url, NewslensError> {
        let parsed = Url::parse(url)
            .map_err(|e| NewslensError::Fetch(format!("Invalid URL {}: {}", url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(NewslensError::Fetch(format!(
                "Unsupported scheme '{}' in {}",
                parsed.scheme(),
                url
            )));
        }

        if !self.allowed_hosts.is_empty() {
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            if !host_allowed(&host, &self.allowed_hosts) {
                return Err(NewslensError::Fetch(format!("Host '{}' is not allowed", host)));
            }
        }

        Ok(parsed)
    }
}

fn host_allowed(host: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|a| {
        host == a
            || host
                .strip_suffix(a.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, NewslensError> {
        let parsed = self.check_url(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| NewslensError::Fetch(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewslensError::Fetch(format!("GET {} returned {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NewslensError::Fetch(format!("Reading {} failed: {}", url, e)))?;

        debug!(url, bytes = body.len(), "Page fetched");
        Ok(body)
    }

    fn allows(&self, url: &str) -> bool {
        self.check_url(url).is_ok()
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Serves pages from memory and records every URL requested.
#[derive(Debug, Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    /// Make requests for `url` fail with a fetch error.
    pub fn with_failure(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, NewslensError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        if self.failing.contains(url) {
            return Err(NewslensError::Fetch(format!("GET {} failed: mock failure", url)));
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| NewslensError::Fetch(format!("GET {} returned 404 Not Found", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher_with_hosts(hosts: &[&str]) -> HttpFetcher {
        HttpFetcher::from_config(&IngestConfig {
            allowed_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        let fetcher = fetcher_with_hosts(&[]);
        assert!(fetcher.allows("https://example.com/a"));
        assert!(fetcher.allows("http://example.com/a"));
        assert!(!fetcher.allows("file:///etc/passwd"));
        assert!(!fetcher.allows("ftp://example.com/a"));
        assert!(!fetcher.allows("not a url"));
    }

    #[test]
    fn test_allowed_hosts_match_subdomains() {
        let fetcher = fetcher_with_hosts(&["example.com"]);
        assert!(fetcher.allows("https://example.com/"));
        assert!(fetcher.allows("https://www.example.com/post"));
        assert!(!fetcher.allows("https://badexample.com/"));
        assert!(!fetcher.allows("https://other.org/"));
    }

    #[tokio::test]
    async fn test_disallowed_fetch_is_error() {
        let fetcher = fetcher_with_hosts(&["example.com"]);
        let err = fetcher.fetch("https://other.org/").await.unwrap_err();
        assert!(matches!(err, NewslensError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.example/", "<p>hi</p>")
            .with_failure("https://b.example/");

        assert_eq!(fetcher.fetch("https://a.example/").await.unwrap(), "<p>hi</p>");
        assert!(fetcher.fetch("https://b.example/").await.is_err());
        assert!(fetcher.fetch("https://missing.example/").await.is_err());
        assert_eq!(fetcher.calls().len(), 3);
    }
}

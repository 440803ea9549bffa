//! # notepack-fetch
//!
//! Text-fetch abstraction over HTTP.
//!
//! Both the version resolver (package metadata) and the module loader
//! (module bodies) go through the [`Fetcher`] trait, so tests can substitute
//! a canned-response fetcher and assert on request counts instead of hitting
//! the network.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// A fetched text body plus the URL it was finally served from.
///
/// `final_url` reflects redirects; the loader derives the resolve directory
/// for nested relative imports from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedText {
    pub body: String,
    pub final_url: String,
}

/// Error cases for a text fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("request to {url} failed with status {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        url: String,
    },

    /// The request never produced a usable response.
    #[error("request to {url} failed: {message}")]
    Transport { message: String, url: String },
}

/// Asynchronous text fetcher over HTTP.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL and return its body as text.
    ///
    /// Non-2xx responses are an error; the implementation never panics.
    async fn fetch_text(&self, url: &str) -> Result<FetchedText, FetchError>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build on top of a preconfigured client (timeouts, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<FetchedText, FetchError> {
        tracing::trace!(url, "fetching");
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|err| FetchError::Transport {
                    message: err.to_string(),
                    url: url.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|err| FetchError::Transport {
            message: err.to_string(),
            url: url.to_string(),
        })?;

        Ok(FetchedText { body, final_url })
    }
}

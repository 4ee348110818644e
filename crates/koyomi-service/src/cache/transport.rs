//! Retrieval of raw feed text.

use std::future::Future;
use std::time::Duration;

use koyomi_core::constants::USER_AGENT;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed {url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("Transport error: {0}")]
    Other(String),
}

/// Fetches the raw text of a feed.
pub trait FeedTransport: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Rewrites `webcal://` and `webcals://` links to HTTPS.
#[must_use]
pub fn normalize_feed_url(url: &str) -> String {
    let url = url.trim();
    ["webcals://", "webcal://"]
        .iter()
        .find_map(|scheme| url.strip_prefix(scheme))
        .map_or_else(|| url.to_string(), |rest| format!("https://{rest}"))
}

/// HTTP(S) transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// ## Summary
    /// Builds a client with the crate user agent and a whole-request timeout.
    ///
    /// ## Errors
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FeedTransport for HttpTransport {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        let url = normalize_feed_url(url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        tracing::debug!(bytes = body.len(), "Fetched feed");
        Ok(body)
    }
}

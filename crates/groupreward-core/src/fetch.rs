//! Remote member list retrieval.
//!
//! [`MemberListFetcher`] performs exactly one bounded HTTP GET per call and
//! hands back the body text. It never retries; the refresh scheduler owns
//! the retry cadence. Every failure path is a [`FetchError`] value.

use std::time::Duration;

use tracing::debug;

/// User agent sent with member list requests.
const USER_AGENT: &str = concat!("groupreward/", env!("CARGO_PKG_VERSION"));

/// Network-level failure while retrieving the member list.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The endpoint was unreachable or did not answer within the timeout.
    #[error("request to {url} failed: {message}")]
    Request {
        /// The requested URL.
        url: String,
        /// Description of the transport failure.
        message: String,
        /// Whether the failure was the request timeout elapsing.
        timed_out: bool,
    },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be read as text.
    #[error("failed to read body from {url}: {message}")]
    Body {
        /// The requested URL.
        url: String,
        /// Description of the read failure.
        message: String,
    },
}

impl FetchError {
    /// Whether the request was abandoned because the timeout elapsed.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Request { timed_out: true, .. })
    }
}

/// A source of raw member list documents.
///
/// The scheduler is generic over this trait so cycles can be driven by a
/// canned source in tests.
pub trait DirectorySource: Send + Sync {
    /// Retrieve the raw member list document.
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// HTTP fetcher bound to one fully-resolved member list URL.
#[derive(Debug, Clone)]
pub struct MemberListFetcher {
    client: reqwest::Client,
    url: String,
}

impl MemberListFetcher {
    /// Create a fetcher for `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot initialize.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(format!("{e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The URL this fetcher requests.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Perform a single GET and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Request`] on connection failure or timeout,
    /// [`FetchError::Status`] for non-2xx responses, and
    /// [`FetchError::Body`] if the body cannot be decoded.
    pub async fn fetch_members(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: self.url.clone(),
                timed_out: e.is_timeout(),
                message: format!("{e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Request {
                    url: self.url.clone(),
                    timed_out: true,
                    message: format!("{e}"),
                }
            } else {
                FetchError::Body {
                    url: self.url.clone(),
                    message: format!("{e}"),
                }
            }
        })?;

        debug!(url = %self.url, bytes = body.len(), "member list fetched");
        Ok(body)
    }
}

impl DirectorySource for MemberListFetcher {
    async fn fetch(&self) -> Result<String, FetchError> {
        self.fetch_members().await
    }
}

// src/error.rs
use thiserror::Error;

/// Everything the scraper can fail with.
///
/// Parse ambiguities (bad timestamps, non-numeric cells) are not represented here:
/// parsers resolve them to `None` or a documented fallback instead.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Timeout, connection reset, or a 5xx the executor treats as transient.
    /// Only surfaced after the retry budget is spent.
    #[error("transient network fault at {url}: {message}")]
    TransientNetwork { url: String, message: String },

    /// Non-retryable HTTP status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Login rejected. Fatal for the run.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Missing/stale form state, no show-all target, no table.
    /// Fatal for one station/day only.
    #[error("protocol state: {0}")]
    ProtocolState(String),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(String),

    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    pub fn transient(url: &str, message: impl Into<String>) -> Self {
        ScrapeError::TransientNetwork { url: s!(url), message: message.into() }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::TransientNetwork { .. })
    }

    /// Errors that must abort a whole run rather than one unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::Authentication(_) | ScrapeError::Config(_))
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if err.is_timeout() {
            ScrapeError::TransientNetwork { url, message: s!("request timed out") }
        } else if err.is_connect() {
            ScrapeError::TransientNetwork { url, message: s!("could not connect") }
        } else if let Some(status) = err.status() {
            ScrapeError::Http { status: status.as_u16(), url }
        } else if err.is_request() || err.is_body() {
            // reset mid-body and friends
            ScrapeError::TransientNetwork { url, message: err.to_string() }
        } else {
            ScrapeError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(err: serde_json::Error) -> Self {
        ScrapeError::Serialization(err.to_string())
    }
}

// src/error.rs
//! Error taxonomy. Everything except `ConfigError` is absorbed at the layer
//! that produces it; see the scheduler for how leftovers are handled.

/// Upstream feed unreachable, returned a non-success status, or sent a body we
/// could not decode. Sources turn this into an empty cycle.
#[derive(Debug, thiserror::Error)]
pub enum SourceFetchError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode upstream payload: {0}")]
    Decode(String),
}

/// Reference lookup failed. Degrades to "no references".
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("lookup returned status {0}")]
    Status(u16),
}

/// The messaging sink rejected or failed to deliver a message.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("messaging API error: {0}")]
    Api(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

// Request URLs carry credentials (bot token in the path, API keys in the
// query), and reqwest renders the URL in `Display`. Strip it on the way in.
impl From<reqwest::Error> for SourceFetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// Required settings absent or malformed at startup. Fatal.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

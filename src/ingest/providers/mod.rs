//! Upstream feed queries. Each trait is the boundary a source consumes; the
//! submodules hold the HTTP implementations.

pub mod github;
pub mod nvd;
pub mod youtube;

use chrono::{DateTime, Utc};

use crate::error::{EnrichmentError, SourceFetchError};

#[derive(Debug, Clone, PartialEq)]
pub struct VulnRecord {
    pub id: String,
    pub description: String,
    pub score: Option<f64>,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
}

/// Records published within `[start, end]`, in feed order.
#[async_trait::async_trait]
pub trait VulnerabilityFeed: Send + Sync {
    async fn published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VulnRecord>, SourceFetchError>;
}

/// Most recent upload of one channel, if any.
#[async_trait::async_trait]
pub trait VideoFeed: Send + Sync {
    async fn latest(&self, channel_id: &str) -> Result<Option<VideoRecord>, SourceFetchError>;
}

/// URLs of public repositories matching a search term.
#[async_trait::async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<String>, EnrichmentError>;
}

/// Shared by the HTTP adapters: turn a non-2xx response into a status error
/// carrying a truncated body for the log line.
pub(crate) async fn error_for_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, SourceFetchError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SourceFetchError::Status {
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}

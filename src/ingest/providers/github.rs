// src/ingest/providers/github.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::ReferenceLookup;
use crate::error::EnrichmentError;

pub const GITHUB_SEARCH_URL: &str = "https://api.github.com/search/repositories";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    html_url: String,
}

/// Extract repository URLs from a search response. Unknown shapes yield none.
pub fn parse_search_response(body: &str) -> Vec<String> {
    serde_json::from_str::<SearchResponse>(body)
        .map(|r| r.items.into_iter().map(|repo| repo.html_url).collect())
        .unwrap_or_default()
}

/// Repository search used to find public proof-of-concept code for a CVE.
/// Without a token the API still answers, at a much lower rate limit.
pub struct GithubSearch {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl GithubSearch {
    pub fn new(token: Option<String>) -> Self {
        Self {
            url: GITHUB_SEARCH_URL.to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl ReferenceLookup for GithubSearch {
    async fn search(&self, term: &str) -> Result<Vec<String>, EnrichmentError> {
        let mut req = self
            .client
            .get(&self.url)
            .query(&[("q", term)])
            // GitHub rejects requests without a user agent.
            .header(reqwest::header::USER_AGENT, "feed-sentinel")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        Ok(parse_search_response(&body))
    }
}

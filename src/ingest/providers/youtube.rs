// src/ingest/providers/youtube.rs
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use super::{error_for_status, VideoFeed, VideoRecord};
use crate::error::SourceFetchError;

pub const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: Option<String>,
}

/// First video of a search response. Results without a `videoId` (playlists,
/// channel hits) count as no video.
pub fn parse_latest_video(body: &str) -> Result<Option<VideoRecord>, SourceFetchError> {
    let resp: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceFetchError::Decode(e.to_string()))?;
    let Some(first) = resp.items.into_iter().next() else {
        return Ok(None);
    };
    Ok(first.id.video_id.map(|id| VideoRecord {
        id,
        title: first
            .snippet
            .and_then(|s| s.title)
            .unwrap_or_default(),
    }))
}

pub struct YoutubeSearch {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl YoutubeSearch {
    pub fn new(api_key: String) -> Self {
        Self {
            url: YOUTUBE_SEARCH_URL.to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl VideoFeed for YoutubeSearch {
    async fn latest(&self, channel_id: &str) -> Result<Option<VideoRecord>, SourceFetchError> {
        let params = [
            ("key", self.api_key.as_str()),
            ("channelId", channel_id),
            ("part", "snippet"),
            ("order", "date"),
            ("maxResults", "1"),
        ];
        tracing::debug!(channel_id, "querying YouTube search");
        let resp = error_for_status(self.client.get(&self.url).query(&params).send().await?).await?;
        let body = resp.text().await?;
        let latest = parse_latest_video(&body)?;
        counter!("feed_items_fetched_total", "source" => "youtube")
            .increment(u64::from(latest.is_some()));
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_video_result_is_none() {
        let body = r#"{"items":[{"id":{"kind":"youtube#channel","channelId":"UC1"},
            "snippet":{"title":"A channel"}}]}"#;
        assert_eq!(parse_latest_video(body).unwrap(), None);
    }

    #[test]
    fn empty_items_is_none() {
        assert_eq!(parse_latest_video(r#"{"items":[]}"#).unwrap(), None);
        assert_eq!(parse_latest_video(r#"{}"#).unwrap(), None);
    }
}

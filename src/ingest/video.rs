// src/ingest/video.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use tracing::{Instrument, Span};

use super::providers::VideoFeed;
use super::types::{Item, ItemSource, Payload, Seen};

/// Watches the latest upload of a single channel.
///
/// The cursor (`last_seen_id`) starts unset, so the first video observed after
/// startup is reported as new. Every restart therefore re-announces the
/// channel's current latest video.
pub struct VideoChannelSource {
    feed: Arc<dyn VideoFeed>,
    channel_id: String,
    name: String,
    last_seen_id: Option<String>,
    discovered: u64,
    span: Span,
}

impl VideoChannelSource {
    pub fn new(feed: Arc<dyn VideoFeed>, channel_id: impl Into<String>) -> Self {
        let channel_id = channel_id.into();
        Self {
            span: tracing::info_span!("source", source = "youtube", channel = %channel_id),
            name: format!("youtube:{channel_id}"),
            feed,
            channel_id,
            last_seen_id: None,
            discovered: 0,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn last_seen_id(&self) -> Option<&str> {
        self.last_seen_id.as_deref()
    }

    async fn poll(&mut self) -> Option<Item> {
        let latest = match self.feed.latest(&self.channel_id).await {
            Ok(v) => v?,
            Err(e) => {
                tracing::error!(error = %e, "video feed fetch failed");
                counter!("feed_fetch_errors_total", "source" => "youtube").increment(1);
                return None;
            }
        };

        if self.last_seen_id.as_deref() == Some(latest.id.as_str()) {
            tracing::debug!(video_id = %latest.id, "latest video already announced");
            return None;
        }

        // Committed before the caller sends anything: a failed send must not
        // make the same video come back next cycle.
        self.last_seen_id = Some(latest.id.clone());
        self.discovered += 1;
        tracing::info!(video_id = %latest.id, "new video");

        Some(Item {
            id: latest.id,
            seen: Seen::DiscoveredAt(self.discovered),
            payload: Payload::Video {
                title: latest.title,
            },
        })
    }
}

#[async_trait]
impl ItemSource for VideoChannelSource {
    async fn fetch_new(&mut self) -> Result<Vec<Item>> {
        let span = self.span.clone();
        Ok(self.poll().instrument(span).await.into_iter().collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

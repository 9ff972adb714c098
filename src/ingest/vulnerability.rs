// src/ingest/vulnerability.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{Instrument, Span};

use super::enrich::Enricher;
use super::providers::{VulnRecord, VulnerabilityFeed};
use super::types::{Item, ItemSource, Payload, Seen};

/// Fixed lookback; each poll asks for everything published in the last day.
pub const LOOKBACK_HOURS: i64 = 24;

pub const DEFAULT_MAX_ITEMS_PER_CYCLE: usize = 10;

/// Polls a vulnerability feed over a sliding `[now - 24h, now]` window.
/// There is no cursor beyond the window itself.
pub struct VulnerabilitySource {
    feed: Arc<dyn VulnerabilityFeed>,
    enricher: Option<Enricher>,
    max_items_per_cycle: usize,
    span: Span,
}

impl VulnerabilitySource {
    pub fn new(feed: Arc<dyn VulnerabilityFeed>, max_items_per_cycle: usize) -> Self {
        Self {
            feed,
            enricher: None,
            max_items_per_cycle,
            span: tracing::info_span!("source", source = "nvd"),
        }
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher.with_source("nvd"));
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn max_items_per_cycle(&self) -> usize {
        self.max_items_per_cycle
    }

    /// One poll with an explicit clock.
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> Vec<Item> {
        let (start, end) = window_ending_at(now);

        let records = match self.feed.published_between(start, end).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "vulnerability feed fetch failed");
                counter!("feed_fetch_errors_total", "source" => "nvd").increment(1);
                return Vec::new();
            }
        };

        let total = records.len();
        let mut items = Vec::with_capacity(total.min(self.max_items_per_cycle));
        for rec in records
            .into_iter()
            .filter_map(|r| stamp_within(r, start, end))
            .take(self.max_items_per_cycle)
        {
            let references = match &self.enricher {
                Some(enricher) => enricher.lookup(&rec.id).await,
                None => Vec::new(),
            };
            items.push(Item {
                seen: Seen::PublishedAt(rec.published.unwrap_or(end)),
                payload: Payload::Vulnerability {
                    description: rec.description,
                    score: rec.score,
                    references,
                },
                id: rec.id,
            });
        }

        tracing::info!(fetched = total, kept = items.len(), "vulnerability poll done");
        items
    }
}

pub fn window_ending_at(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::hours(LOOKBACK_HOURS), now)
}

/// Keep records inside the window. A record without a timestamp came back from
/// a window query, so it is dated at the window end.
fn stamp_within(mut rec: VulnRecord, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<VulnRecord> {
    match rec.published {
        Some(ts) if ts < start || ts > end => {
            tracing::debug!(id = %rec.id, published = %ts, "record outside window, skipped");
            None
        }
        Some(_) => Some(rec),
        None => {
            rec.published = Some(end);
            Some(rec)
        }
    }
}

#[async_trait]
impl ItemSource for VulnerabilitySource {
    async fn fetch_new(&mut self) -> Result<Vec<Item>> {
        let span = self.span.clone();
        Ok(self.fetch_at(Utc::now()).instrument(span).await)
    }

    fn name(&self) -> &str {
        "nvd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_is_one_day() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let (start, end) = window_ending_at(now);
        assert_eq!(end, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn undated_record_is_stamped_at_window_end() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let (start, end) = window_ending_at(now);
        let rec = VulnRecord {
            id: "CVE-1".into(),
            description: String::new(),
            score: None,
            published: None,
        };
        assert_eq!(stamp_within(rec, start, end).unwrap().published, Some(end));
    }
}

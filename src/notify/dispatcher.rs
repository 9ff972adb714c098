//! Sends one source's batch to the sink, capped and paced.
//!
//! Items go out strictly one after another in the order the source returned
//! them, with a fixed pause between consecutive sends. A failed send is logged
//! and the rest of the batch still goes out.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{Instrument, Span};

use super::{format, Destination, NotificationEnvelope, NotificationSink};
use crate::ingest::types::Item;

pub const DEFAULT_MAX_ITEMS: usize = 10;
pub const DEFAULT_MESSAGE_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct RateLimitedDispatcher {
    sink: Arc<dyn NotificationSink>,
    max_items: usize,
    delay: Duration,
    source: String,
    span: Span,
}

impl RateLimitedDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            max_items: DEFAULT_MAX_ITEMS,
            delay: DEFAULT_MESSAGE_DELAY,
            source: "unscoped".to_string(),
            span: tracing::info_span!("dispatch"),
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Attribute sends to `source`: metric labels carry its name and log lines
    /// nest under `parent`.
    pub fn for_source(mut self, source: impl Into<String>, parent: &Span) -> Self {
        self.source = source.into();
        self.span = tracing::info_span!(parent: parent, "dispatch");
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Returns how many items were delivered. Never fails.
    pub async fn dispatch(&self, items: &[Item], destination: &Destination) -> usize {
        self.send_batch(items, destination)
            .instrument(self.span.clone())
            .await
    }

    async fn send_batch(&self, items: &[Item], destination: &Destination) -> usize {
        let batch = &items[..items.len().min(self.max_items)];
        if batch.len() < items.len() {
            tracing::info!(
                received = items.len(),
                cap = self.max_items,
                "batch truncated to dispatch cap"
            );
        }

        let mut sent = 0usize;
        for (i, item) in batch.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let envelope = NotificationEnvelope {
                destination: destination.clone(),
                text: format::render(item),
            };
            match self.sink.send(&envelope).await {
                Ok(()) => {
                    sent += 1;
                    counter!("notify_sent_total", "source" => self.source.clone()).increment(1);
                    tracing::info!(
                        id = %item.id,
                        position = i + 1,
                        total = batch.len(),
                        channel = self.sink.channel_name(),
                        "notification sent"
                    );
                }
                Err(e) => {
                    counter!("notify_failed_total", "source" => self.source.clone()).increment(1);
                    tracing::warn!(
                        id = %item.id,
                        channel = self.sink.channel_name(),
                        error = %e,
                        "notification failed"
                    );
                }
            }
        }
        sent
    }
}

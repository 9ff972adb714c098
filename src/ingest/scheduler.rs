// src/ingest/scheduler.rs
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use metrics::{counter, gauge};
use tracing::{Instrument, Span};

use super::types::ItemSource;
use crate::notify::{Destination, RateLimitedDispatcher};

/// Pause after a cycle that failed in an unexpected way.
pub const BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub sent: usize,
}

/// Drives one source forever: poll, dispatch, sleep. Owns the source (and so
/// its cursor) exclusively; nothing is shared with other schedulers except the
/// read-only sink behind the dispatcher.
pub struct SourceScheduler {
    source: Box<dyn ItemSource>,
    dispatcher: RateLimitedDispatcher,
    destination: Destination,
    interval: Duration,
    backoff: Duration,
    span: Span,
}

impl SourceScheduler {
    pub fn new(
        source: Box<dyn ItemSource>,
        dispatcher: RateLimitedDispatcher,
        destination: Destination,
        interval: Duration,
    ) -> Self {
        let span = tracing::info_span!("scheduler", source = %source.name());
        let dispatcher = dispatcher.for_source(source.name(), &span);
        Self {
            source,
            dispatcher,
            destination,
            interval,
            backoff: BACKOFF,
            span,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polling then Dispatching. An empty poll still goes through dispatch,
    /// which is a no-op for it.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let items = self.source.fetch_new().await?;
        let sent = self.dispatcher.dispatch(&items, &self.destination).await;
        Ok(CycleReport {
            fetched: items.len(),
            sent,
        })
    }

    /// Runs until the task is dropped or aborted. Errors and panics inside a
    /// cycle switch the next pause to the backoff; the loop itself never ends.
    pub async fn run(mut self) {
        let span = self.span.clone();
        async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "scheduler started");
            loop {
                let outcome = AssertUnwindSafe(self.run_cycle()).catch_unwind().await;
                let pause = match outcome {
                    Ok(Ok(report)) => {
                        tracing::info!(
                            fetched = report.fetched,
                            sent = report.sent,
                            next_in_secs = self.interval.as_secs(),
                            "cycle complete"
                        );
                        self.interval
                    }
                    Ok(Err(e)) => {
                        tracing::error!(error = %format!("{e:#}"), backoff_secs = self.backoff.as_secs(), "cycle failed, backing off");
                        counter!("scheduler_backoff_total", "source" => self.source.name().to_string()).increment(1);
                        self.backoff
                    }
                    Err(panic) => {
                        tracing::error!(panic = panic_message(&*panic), backoff_secs = self.backoff.as_secs(), "cycle panicked, backing off");
                        counter!("scheduler_backoff_total", "source" => self.source.name().to_string()).increment(1);
                        self.backoff
                    }
                };
                gauge!("scheduler_last_cycle_ts", "source" => self.source.name().to_string())
                    .set(chrono::Utc::now().timestamp() as f64);
                tokio::time::sleep(pause).await;
            }
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_both_payload_types() {
        let p: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*p), "boom");
        let p: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*p), "bang");
        let p: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*p), "non-string panic payload");
    }
}

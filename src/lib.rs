// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod orchestrator;

// ---- Re-exports for stable public API ----
pub use crate::config::MonitorConfig;
pub use crate::error::{ConfigError, EnrichmentError, SendError, SourceFetchError};
pub use crate::ingest::{Item, ItemSource, SourceScheduler};
pub use crate::notify::{Destination, NotificationEnvelope, NotificationSink, RateLimitedDispatcher};
pub use crate::orchestrator::Orchestrator;

// src/ingest/mod.rs
//! Sources: what counts as new for each feed, and the loop that polls them.

pub mod enrich;
pub mod providers;
pub mod scheduler;
pub mod types;
pub mod video;
pub mod vulnerability;

pub use scheduler::{CycleReport, SourceScheduler};
pub use types::{Item, ItemSource, Payload, Seen, SourceKind};
pub use video::VideoChannelSource;
pub use vulnerability::VulnerabilitySource;

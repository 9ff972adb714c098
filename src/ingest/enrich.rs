// src/ingest/enrich.rs
use std::sync::Arc;

use metrics::counter;

use super::providers::ReferenceLookup;

/// Attaches cross-reference links (public exploit repositories) to an item.
/// Never fails: a broken lookup degrades to an empty list.
#[derive(Clone)]
pub struct Enricher {
    lookup: Arc<dyn ReferenceLookup>,
    source: String,
}

impl Enricher {
    pub fn new(lookup: Arc<dyn ReferenceLookup>) -> Self {
        Self {
            lookup,
            source: "unscoped".to_string(),
        }
    }

    /// Label for the error counter; set by the owning source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub async fn lookup(&self, id: &str) -> Vec<String> {
        match self.lookup.search(id).await {
            Ok(refs) => {
                tracing::debug!(id, found = refs.len(), "reference lookup done");
                refs
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "reference lookup failed");
                counter!("feed_enrich_errors_total", "source" => self.source.clone()).increment(1);
                Vec::new()
            }
        }
    }
}

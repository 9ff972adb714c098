// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    Vulnerability,
    Video,
}

/// When an item became known: upstream publication time for vulnerabilities,
/// a per-source discovery counter for videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Seen {
    PublishedAt(DateTime<Utc>),
    DiscoveredAt(u64),
}

/// Fields needed to render the notification.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Payload {
    Vulnerability {
        description: String,
        score: Option<f64>,   // None renders as "N/A"
        references: Vec<String>,
    },
    Video {
        title: String,
    },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Item {
    pub id: String, // CVE id or video id, stable across polls
    pub seen: Seen,
    pub payload: Payload,
}

impl Item {
    pub fn kind(&self) -> SourceKind {
        match self.payload {
            Payload::Vulnerability { .. } => SourceKind::Vulnerability,
            Payload::Video { .. } => SourceKind::Video,
        }
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        match self.seen {
            Seen::PublishedAt(ts) => Some(ts),
            Seen::DiscoveredAt(_) => None,
        }
    }
}

/// One logical feed. `Err` means something unexpected happened; expected
/// upstream failures are absorbed by the implementation and yield `Ok(vec![])`.
#[async_trait::async_trait]
pub trait ItemSource: Send {
    async fn fetch_new(&mut self) -> Result<Vec<Item>>;
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_payload() {
        let v = Item {
            id: "abc".into(),
            seen: Seen::DiscoveredAt(1),
            payload: Payload::Video {
                title: "t".into(),
            },
        };
        assert_eq!(v.kind(), SourceKind::Video);
        assert!(v.published_at().is_none());
    }
}

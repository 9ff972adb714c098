//! Message text for each item kind, in Telegram's HTML parse mode.

use html_escape::encode_text;

use crate::ingest::types::{Item, Payload};

pub const NVD_DETAIL_URL: &str = "https://nvd.nist.gov/vuln/detail/";
pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// How many reference links a vulnerability message lists.
pub const MAX_REFERENCES_SHOWN: usize = 3;

pub fn render(item: &Item) -> String {
    match &item.payload {
        Payload::Vulnerability {
            description,
            score,
            references,
        } => render_vulnerability(&item.id, description, *score, references),
        Payload::Video { title } => render_video(&item.id, title),
    }
}

fn render_vulnerability(
    id: &str,
    description: &str,
    score: Option<f64>,
    references: &[String],
) -> String {
    let score = score.map_or_else(|| "N/A".to_string(), |s| format!("{s:.1}"));
    let refs = if references.is_empty() {
        "none found".to_string()
    } else {
        references
            .iter()
            .take(MAX_REFERENCES_SHOWN)
            .map(|r| encode_text(r).into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "🚨 <b>New CVE detected</b> 🚨\n\n\
         <b>ID:</b> {id}\n\
         <b>CVSS score:</b> {score}\n\
         <b>Description:</b> {desc}\n\
         <b>Link:</b> {NVD_DETAIL_URL}{id}\n\
         📌 <b>Exploits:</b> {refs}",
        id = encode_text(id),
        desc = encode_text(description),
    )
}

fn render_video(id: &str, title: &str) -> String {
    format!(
        "🎥 <b>New video available!</b> 🎥\n\n\
         <b>Title:</b> {title}\n\
         <b>Link:</b> {YOUTUBE_WATCH_URL}{id}",
        title = encode_text(title),
        id = encode_text(id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Seen;
    use chrono::Utc;

    fn vuln(score: Option<f64>, references: Vec<String>) -> Item {
        Item {
            id: "CVE-2025-1234".into(),
            seen: Seen::PublishedAt(Utc::now()),
            payload: Payload::Vulnerability {
                description: "Overflow in <parser> & friends".into(),
                score,
                references,
            },
        }
    }

    #[test]
    fn missing_score_renders_na() {
        let text = render(&vuln(None, vec![]));
        assert!(text.contains("<b>CVSS score:</b> N/A"));
        assert!(text.contains("<b>Exploits:</b> none found"));
        assert!(text.contains("https://nvd.nist.gov/vuln/detail/CVE-2025-1234"));
    }

    #[test]
    fn feed_text_is_escaped() {
        let text = render(&vuln(Some(9.8), vec![]));
        assert!(text.contains("Overflow in &lt;parser&gt; &amp; friends"));
        assert!(text.contains("9.8"));
    }

    #[test]
    fn references_are_capped() {
        let refs = (0..5).map(|i| format!("https://github.com/x/poc{i}")).collect();
        let text = render(&vuln(Some(7.5), refs));
        assert!(text.contains("poc2"));
        assert!(!text.contains("poc3"));
    }

    #[test]
    fn video_links_to_watch_page() {
        let item = Item {
            id: "dQw4w9WgXcQ".into(),
            seen: Seen::DiscoveredAt(1),
            payload: Payload::Video {
                title: "Pwn2Own recap".into(),
            },
        };
        let text = render(&item);
        assert!(text.contains("Pwn2Own recap"));
        assert!(text.contains("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
    }
}

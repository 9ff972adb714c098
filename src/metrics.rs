use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metric descriptions, so series carry help text once a recorder is
/// installed. Without a recorder every metric call is a no-op.
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_items_fetched_total",
            "Records returned by upstream feeds."
        );
        describe_counter!(
            "feed_fetch_errors_total",
            "Upstream feed fetches that failed and yielded an empty cycle."
        );
        describe_counter!(
            "feed_enrich_errors_total",
            "Reference lookups that failed and yielded no references."
        );
        describe_histogram!("feed_parse_ms", "Feed payload decode time in milliseconds.");
        describe_counter!("notify_sent_total", "Notifications delivered to the sink.");
        describe_counter!("notify_failed_total", "Notifications the sink rejected.");
        describe_counter!(
            "scheduler_backoff_total",
            "Cycles that ended in an unexpected error and triggered the backoff."
        );
        describe_gauge!(
            "scheduler_last_cycle_ts",
            "Unix ts when a scheduler last finished a cycle."
        );
    });
}

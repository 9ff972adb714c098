use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{NotificationEnvelope, NotificationSink};
use crate::error::SendError;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Longer `retry_after` requests are shortened to this.
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Attempts per message are clamped to `1..=MAX_ATTEMPTS`.
pub const MAX_ATTEMPTS: u8 = 10;

/// Delivers envelopes through the Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramSink {
    api_url: String,
    token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl std::fmt::Debug for TelegramSink {
    // The token is a credential; keep it out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl TelegramSink {
    pub fn new(token: String) -> Self {
        Self {
            api_url: TELEGRAM_API_URL.to_string(),
            token,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_ATTEMPTS);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.token)
    }

    async fn send_once(&self, payload: &SendMessage<'_>) -> Result<(), SendError> {
        let rsp = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await?;
        let status = rsp.status();
        let body: ApiResponse = rsp.json().await.unwrap_or_default();
        classify(status, body)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

fn classify(status: StatusCode, body: ApiResponse) -> Result<(), SendError> {
    if status.is_success() && body.ok {
        return Ok(());
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = body
            .parameters
            .and_then(|p| p.retry_after)
            .unwrap_or(30);
        return Err(SendError::RateLimited { retry_after_secs });
    }
    let description = body
        .description
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(SendError::Api(description))
}

/// Which failures are worth another attempt, and after how long.
fn retry_delay(err: &SendError, attempt: u8) -> Option<Duration> {
    let exp = u32::from(attempt.saturating_sub(1)).min(u32::from(MAX_ATTEMPTS));
    let backoff = Duration::from_millis(500u64 << exp);
    match err {
        SendError::RateLimited { retry_after_secs } => {
            Some(Duration::from_secs((*retry_after_secs).min(MAX_RETRY_AFTER_SECS)))
        }
        SendError::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => Some(backoff),
        SendError::Http(e) => e
            .status()
            .filter(|s| s.is_server_error())
            .map(|_| backoff),
        SendError::Api(desc) if desc.starts_with("HTTP 5") => Some(backoff),
        SendError::Api(_) => None,
    }
}

#[async_trait::async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, envelope: &NotificationEnvelope) -> Result<(), SendError> {
        let payload = SendMessage {
            chat_id: &envelope.destination.chat_id,
            message_thread_id: envelope.destination.thread_id,
            text: &envelope.text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let err = match self.send_once(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            match retry_delay(&err, attempt) {
                Some(wait) if attempt < self.max_retries => {
                    tracing::debug!(attempt, error = %err, wait_ms = wait.as_millis() as u64, "telegram send retry");
                    tokio::time::sleep(wait).await;
                }
                _ => return Err(err),
            }
        }
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Destination;

    fn body(json: &str) -> ApiResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn ok_true_is_success() {
        assert!(classify(StatusCode::OK, body(r#"{"ok":true,"result":{}}"#)).is_ok());
    }

    #[test]
    fn too_many_requests_reads_retry_after() {
        let err = classify(
            StatusCode::TOO_MANY_REQUESTS,
            body(r#"{"ok":false,"error_code":429,"parameters":{"retry_after":7}}"#),
        )
        .unwrap_err();
        assert!(matches!(err, SendError::RateLimited { retry_after_secs: 7 }));
        assert_eq!(retry_delay(&err, 1), Some(Duration::from_secs(7)));
    }

    #[test]
    fn bad_request_is_not_retried() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            body(r#"{"ok":false,"description":"Bad Request: chat not found"}"#),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "messaging API error: Bad Request: chat not found");
        assert_eq!(retry_delay(&err, 1), None);
    }

    #[test]
    fn server_error_backs_off_exponentially() {
        let err = classify(StatusCode::BAD_GATEWAY, ApiResponse::default()).unwrap_err();
        assert_eq!(retry_delay(&err, 1), Some(Duration::from_millis(500)));
        assert_eq!(retry_delay(&err, 2), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn long_retry_after_is_shortened_to_the_bound() {
        let err = SendError::RateLimited {
            retry_after_secs: 3600,
        };
        assert_eq!(retry_delay(&err, 1), Some(Duration::from_secs(60)));
    }

    #[test]
    fn late_attempts_do_not_overflow_the_backoff() {
        let err = classify(StatusCode::BAD_GATEWAY, ApiResponse::default()).unwrap_err();
        for attempt in [1u8, 64, 65, 255] {
            assert!(retry_delay(&err, attempt).is_some());
        }
        let sink = TelegramSink::new("t".into()).with_retries(200);
        assert_eq!(sink.max_retries, MAX_ATTEMPTS);
    }

    #[test]
    fn thread_id_is_omitted_when_absent() {
        let dest = Destination::new("-100123", None);
        let payload = SendMessage {
            chat_id: &dest.chat_id,
            message_thread_id: dest.thread_id,
            text: "hi",
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert!(v.get("message_thread_id").is_none());
        assert_eq!(v["parse_mode"], "HTML");
    }

    #[test]
    fn debug_hides_token() {
        let sink = TelegramSink::new("123:SECRET".into());
        assert!(!format!("{sink:?}").contains("SECRET"));
    }
}

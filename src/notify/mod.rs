pub mod dispatcher;
pub mod format;
pub mod telegram;

use crate::error::SendError;

pub use dispatcher::RateLimitedDispatcher;
pub use telegram::TelegramSink;

/// Where a message goes: a chat and, for forum-style groups, a topic thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub chat_id: String,
    pub thread_id: Option<i64>,
}

impl Destination {
    pub fn new(chat_id: impl Into<String>, thread_id: Option<i64>) -> Self {
        Self {
            chat_id: chat_id.into(),
            thread_id,
        }
    }
}

/// One outbound message, built fresh per send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEnvelope {
    pub destination: Destination,
    pub text: String, // Telegram HTML
}

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, envelope: &NotificationEnvelope) -> Result<(), SendError>;

    fn channel_name(&self) -> &str;
}

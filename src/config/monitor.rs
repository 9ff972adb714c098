// src/config/monitor.rs
use std::time::Duration;

use crate::error::ConfigError;
use crate::notify::Destination;

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 3600;
const DEFAULT_MESSAGE_DELAY_SECS: u64 = 2;
const DEFAULT_MAX_CVES_PER_CYCLE: usize = 10;
const DEFAULT_DISPATCH_MAX_ITEMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub thread_id: Option<i64>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct YoutubeConfig {
    pub api_key: String,
    pub channels: Vec<ChannelConfig>,
    pub check_interval: Duration,
}

/// Everything the process needs, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub telegram_token: String,
    pub chat_id: String,
    /// Topic for vulnerability messages.
    pub thread_id: Option<i64>,
    pub check_interval: Duration,
    pub message_delay: Duration,
    pub max_cves_per_cycle: usize,
    pub dispatch_max_items: usize,
    pub nvd_api_key: Option<String>,
    pub github_token: Option<String>,
    /// `None` when no channels are configured.
    pub youtube: Option<YoutubeConfig>,
}

impl MonitorConfig {
    /// Read from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = get("TELEGRAM_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;
        let chat_id = get("TELEGRAM_CHAT_ID").ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?;
        let thread_id = parse_opt::<i64>("TELEGRAM_MESSAGE_THREAD_ID", get("TELEGRAM_MESSAGE_THREAD_ID"))?;

        let check_interval = Duration::from_secs(parse_positive(
            "CHECK_INTERVAL",
            get("CHECK_INTERVAL"),
            DEFAULT_CHECK_INTERVAL_SECS,
        )?);
        let message_delay = Duration::from_secs(
            parse_opt::<u64>("MESSAGE_DELAY", get("MESSAGE_DELAY"))?
                .unwrap_or(DEFAULT_MESSAGE_DELAY_SECS),
        );
        let max_cves_per_cycle = parse_positive(
            "MAX_CVES_PER_CYCLE",
            get("MAX_CVES_PER_CYCLE"),
            DEFAULT_MAX_CVES_PER_CYCLE as u64,
        )? as usize;
        let dispatch_max_items = parse_positive(
            "DISPATCH_MAX_ITEMS",
            get("DISPATCH_MAX_ITEMS"),
            DEFAULT_DISPATCH_MAX_ITEMS as u64,
        )? as usize;

        let youtube_thread = parse_opt::<i64>("YOUTUBE_MESSAGE_THREAD_ID", get("YOUTUBE_MESSAGE_THREAD_ID"))?
            .or(thread_id);
        let channel_list = get("YOUTUBE_CHANNEL_IDS").or_else(|| get("YOUTUBE_CHANNEL_ID"));
        let channels = match channel_list {
            Some(list) => parse_channels(&list, youtube_thread)?,
            None => Vec::new(),
        };
        let youtube = if channels.is_empty() {
            None
        } else {
            let api_key = get("YOUTUBE_API_KEY").ok_or(ConfigError::Missing("YOUTUBE_API_KEY"))?;
            let interval_secs = match get("YOUTUBE_CHECK_INTERVAL") {
                Some(v) => parse_positive("YOUTUBE_CHECK_INTERVAL", Some(v), 0)?,
                None => check_interval.as_secs(),
            };
            Some(YoutubeConfig {
                api_key,
                channels,
                check_interval: Duration::from_secs(interval_secs),
            })
        };

        Ok(Self {
            telegram_token,
            chat_id,
            thread_id,
            check_interval,
            message_delay,
            max_cves_per_cycle,
            dispatch_max_items,
            nvd_api_key: get("NVD_API_KEY"),
            github_token: get("GITHUB_TOKEN"),
            youtube,
        })
    }

    pub fn vulnerability_destination(&self) -> Destination {
        Destination::new(self.chat_id.clone(), self.thread_id)
    }

    pub fn channel_destination(&self, channel: &ChannelConfig) -> Destination {
        Destination::new(self.chat_id.clone(), channel.thread_id)
    }

    /// Both caps apply in sequence, so the stricter one is what reaches the chat.
    pub fn effective_vulnerability_cap(&self) -> usize {
        self.max_cves_per_cycle.min(self.dispatch_max_items)
    }
}

// Tokens and keys stay out of Debug output.
impl std::fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("chat_id", &self.chat_id)
            .field("thread_id", &self.thread_id)
            .field("check_interval", &self.check_interval)
            .field("message_delay", &self.message_delay)
            .field("max_cves_per_cycle", &self.max_cves_per_cycle)
            .field("dispatch_max_items", &self.dispatch_max_items)
            .field("nvd_api_key", &self.nvd_api_key.as_ref().map(|_| "<set>"))
            .field("github_token", &self.github_token.as_ref().map(|_| "<set>"))
            .field("youtube", &self.youtube)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for YoutubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeConfig")
            .field("channels", &self.channels)
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}

fn parse_opt<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value: v,
            })
        })
        .transpose()
}

fn parse_positive(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match parse_opt::<u64>(key, value.clone())? {
        None => Ok(default),
        Some(0) => Err(ConfigError::Invalid {
            key,
            value: value.unwrap_or_default(),
            reason: "must be greater than zero".into(),
        }),
        Some(n) => Ok(n),
    }
}

/// `UCxxxx`, `UCxxxx:42`, comma separated. Duplicates collapse to the first entry.
fn parse_channels(list: &str, default_thread: Option<i64>) -> Result<Vec<ChannelConfig>, ConfigError> {
    let mut out: Vec<ChannelConfig> = Vec::new();
    for raw in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (channel_id, thread_id) = match raw.split_once(':') {
            Some((id, thread)) => {
                let thread = thread.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
                    key: "YOUTUBE_CHANNEL_IDS",
                    value: raw.to_string(),
                    reason: format!("bad thread id: {e}"),
                })?;
                (id.trim().to_string(), Some(thread))
            }
            None => (raw.to_string(), default_thread),
        };
        if channel_id.is_empty() {
            return Err(ConfigError::Invalid {
                key: "YOUTUBE_CHANNEL_IDS",
                value: raw.to_string(),
                reason: "empty channel id".into(),
            });
        }
        if out.iter().any(|c| c.channel_id == channel_id) {
            continue;
        }
        out.push(ChannelConfig {
            channel_id,
            thread_id,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_list_with_threads_and_duplicates() {
        let out = parse_channels(" UC1:7, UC2 ,,UC1:9", Some(3)).unwrap();
        assert_eq!(
            out,
            vec![
                ChannelConfig {
                    channel_id: "UC1".into(),
                    thread_id: Some(7)
                },
                ChannelConfig {
                    channel_id: "UC2".into(),
                    thread_id: Some(3)
                },
            ]
        );
    }

    #[test]
    fn bad_thread_is_invalid() {
        let err = parse_channels("UC1:abc", None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "YOUTUBE_CHANNEL_IDS", .. }));
    }

    #[test]
    fn zero_is_rejected_for_positive_settings() {
        let err = parse_positive("CHECK_INTERVAL", Some("0".into()), 3600).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
        assert_eq!(parse_positive("CHECK_INTERVAL", None, 3600).unwrap(), 3600);
    }
}

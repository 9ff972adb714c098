pub mod monitor;

pub use monitor::{ChannelConfig, MonitorConfig, YoutubeConfig};

//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound buffer size of the per-connection signal queue.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Seconds after which a typing entry expires server-side without an
    /// explicit stop signal.
    #[serde(default = "default_typing_ttl")]
    pub typing_ttl_seconds: u64,
    /// Maximum group channels a single connection may join.
    #[serde(default = "default_max_channels")]
    pub max_channels_per_connection: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            typing_ttl_seconds: default_typing_ttl(),
            max_channels_per_connection: default_max_channels(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_typing_ttl() -> u64 {
    5
}

fn default_max_channels() -> usize {
    128
}

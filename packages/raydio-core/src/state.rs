//! Core configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{
    AVAILABILITY_CHANNEL_CAPACITY, DEFAULT_NOW_PLAYING_TITLE, DEFAULT_PROBE_INTERVAL_MS,
    EVENT_CHANNEL_CAPACITY, MIN_PROBE_INTERVAL_MS,
};

/// Configuration for the session core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Capacity of the outward event broadcast channel.
    pub event_channel_capacity: usize,

    /// Capacity of the availability broadcast channel.
    pub availability_channel_capacity: usize,

    /// Interval between interface scans (milliseconds).
    pub probe_interval_ms: u64,

    /// Now-playing title used when the active stream has no owning group.
    pub now_playing_placeholder_title: String,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.availability_channel_capacity == 0 {
            return Err(
                "availability_channel_capacity must be >= 1 (broadcast::channel panics on 0)"
                    .to_string(),
            );
        }
        if self.probe_interval_ms < MIN_PROBE_INTERVAL_MS {
            return Err(format!(
                "probe_interval_ms must be >= {}",
                MIN_PROBE_INTERVAL_MS
            ));
        }
        if self.now_playing_placeholder_title.trim().is_empty() {
            return Err("now_playing_placeholder_title must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            availability_channel_capacity: AVAILABILITY_CHANNEL_CAPACITY,
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            now_playing_placeholder_title: DEFAULT_NOW_PLAYING_TITLE.to_string(),
        }
    }
}

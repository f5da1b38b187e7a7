//! Sync core configuration: sessions, device links, and the channel.

use serde::{Deserialize, Serialize};

/// Group session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// How many codes to try before giving up with a conflict
    /// (valid range: 1-1000).
    pub code_attempts: u32,
    /// PBKDF2 rounds for join passwords (valid range: 1000-1000000).
    pub password_iterations: u32,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            code_attempts: 64,
            password_iterations: 100_000,
        }
    }
}

/// Remote-control device link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Seconds between `last_seen` refreshes from a live presentation client.
    pub heartbeat_interval_secs: u64,
    /// Retries on a device code collision (valid range: 1-1000).
    pub code_attempts: u32,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            code_attempts: 16,
        }
    }
}

/// In-process publish/subscribe channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Per-topic buffer; slower subscribers skip ahead once it fills.
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

//! # Node Configuration
//!
//! Plain settings handed to a node at build time. The struct deserializes with serde
//! (missing fields take their defaults) so an outer configuration layer can feed it from
//! whatever source it likes; [`Config::from_env`] covers the common case.
//!
//! | Setting | Env var | Default |
//! |---------|---------|---------|
//! | `default_timeout_ms` | `ACTION_TIMEOUT_MS` | 5000 |
//! | `failure_policy` | `ACTION_UNDEAD` (`1`/`true` → undead) | `shutdown` |
//! | `hop_margin_ms` | `ACTION_HOP_MARGIN_MS` | 20 |
//! | `max_frame_bytes` | `ACTION_MAX_FRAME_BYTES` | 4 MiB |
//! | `override_policy` | – | `last_wins` |

use crate::registry::OverridePolicy;
use crate::timeout::millis;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
/// Time a nested call leaves its parent for forwarding a timeout back up.
pub const DEFAULT_HOP_MARGIN_MS: u64 = 20;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// What a node does when a call fails and nobody is listening for the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Close the node; [`Node::closed`](crate::node::Node::closed) resolves with the error.
    #[default]
    Shutdown,
    /// Log the error and keep running.
    Undead,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_timeout_ms: u64,
    pub hop_margin_ms: u64,
    pub failure_policy: FailurePolicy,
    pub override_policy: OverridePolicy,
    pub max_frame_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            hop_margin_ms: DEFAULT_HOP_MARGIN_MS,
            failure_policy: FailurePolicy::default(),
            override_policy: OverridePolicy::default(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl Config {
    /// Defaults overlaid with any `ACTION_*` environment variables that parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_parse::<u64>("ACTION_TIMEOUT_MS") {
            config.default_timeout_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>("ACTION_HOP_MARGIN_MS") {
            config.hop_margin_ms = ms;
        }
        if let Some(undead) = env_flag("ACTION_UNDEAD") {
            config.failure_policy = if undead {
                FailurePolicy::Undead
            } else {
                FailurePolicy::Shutdown
            };
        }
        if let Some(bytes) = env_parse::<usize>("ACTION_MAX_FRAME_BYTES") {
            config.max_frame_bytes = bytes;
        }
        config
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn hop_margin(&self) -> Duration {
        Duration::from_millis(self.hop_margin_ms)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = millis(timeout);
        self
    }

    pub fn with_hop_margin(mut self, margin: Duration) -> Self {
        self.hop_margin_ms = millis(margin);
        self
    }

    pub fn undead(mut self) -> Self {
        self.failure_policy = FailurePolicy::Undead;
        self
    }

    pub fn with_override_policy(mut self, policy: OverridePolicy) -> Self {
        self.override_policy = policy;
        self
    }

    pub fn with_max_frame_bytes(mut self, bytes: usize) -> Self {
        self.max_frame_bytes = bytes;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let parsed = raw.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!(key, value = %raw, "Ignoring unparsable config value");
    }
    parsed
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(key, value = %raw, "Ignoring unparsable config flag");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"default_timeout_ms": 250, "failure_policy": "undead"}"#)
                .unwrap();
        assert_eq!(config.default_timeout(), Duration::from_millis(250));
        assert_eq!(config.failure_policy, FailurePolicy::Undead);
        assert_eq!(config.override_policy, OverridePolicy::LastWins);
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
        assert_eq!(config.hop_margin(), Duration::from_millis(DEFAULT_HOP_MARGIN_MS));
    }

    #[test]
    fn builder_setters() {
        let config = Config::default()
            .with_timeout(Duration::from_millis(100))
            .undead()
            .with_override_policy(OverridePolicy::Forbid)
            .with_hop_margin(Duration::from_millis(5))
            .with_max_frame_bytes(512);
        assert_eq!(config.default_timeout_ms, 100);
        assert_eq!(config.hop_margin_ms, 5);
        assert_eq!(config.max_frame_bytes, 512);
        assert_eq!(config.failure_policy, FailurePolicy::Undead);
        assert_eq!(config.override_policy, OverridePolicy::Forbid);
    }

    #[test]
    fn oversized_timeout_saturates() {
        let config = Config::default().with_timeout(Duration::MAX);
        assert_eq!(config.default_timeout_ms, u64::MAX);
    }
}

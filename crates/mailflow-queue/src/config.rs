//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one job queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Simultaneous batches processed per job kind.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Total attempts per job (first run plus retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Token-bucket rate limit on batch starts, per second.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_sec: u32,

    /// Delay before the first retry; doubles per attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Cap on the retry delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_concurrency() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_rate_limit() -> u32 {
    10
}

fn default_initial_backoff_ms() -> u64 {
    2000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            rate_limit_per_sec: default_rate_limit(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl QueueConfig {
    /// Exponential backoff delay before retry number `attempts`.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.rate_limit_per_sec, 10);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = QueueConfig {
            initial_backoff_ms: 1000,
            max_backoff_ms: 5000,
            ..Default::default()
        };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(4000));
        assert_eq!(config.backoff_delay(4), Duration::from_millis(5000));
        // Huge attempt counts must not overflow
        assert_eq!(config.backoff_delay(64), Duration::from_millis(5000));
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let config: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.initial_backoff_ms, 2000);
    }
}

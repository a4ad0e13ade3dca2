//! Service configuration.

use serde::{Deserialize, Serialize};

use mailflow_queue::QueueConfig;

/// Configuration for a `Mailflow` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailflowConfig {
    /// Queue tuning shared by the embedding and summary queues.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Seconds between auto-return sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Cap on records pulled per re-dispatch of pending embeddings.
    #[serde(default = "default_redispatch_limit")]
    pub redispatch_limit: usize,
}

fn default_sweep_interval_secs() -> u64 {
    120
}

fn default_redispatch_limit() -> usize {
    100
}

impl Default for MailflowConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            sweep_interval_secs: default_sweep_interval_secs(),
            redispatch_limit: default_redispatch_limit(),
        }
    }
}

//! # Channel options

use crate::error::{ExchangeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options of a [LocalBroadcastChannel](crate::channel::LocalBroadcastChannel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalChannelOptions {
    /// Capacity of the transport queue in packets
    pub queue_size: usize,
    /// Upper bound for every blocking queue operation, counted from channel creation
    pub max_timeout_ms: u64,
    /// Collect send time, rows and bytes
    pub enable_sender_metrics: bool,
    /// Collect receive time, registration time and bytes
    pub enable_receiver_metrics: bool,
}

impl Default for LocalChannelOptions {
    fn default() -> Self {
        Self {
            queue_size: 64,
            max_timeout_ms: 60_000,
            enable_sender_metrics: true,
            enable_receiver_metrics: true,
        }
    }
}

impl LocalChannelOptions {
    /// Rejects options that cannot produce a working channel
    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(ExchangeError::InvalidConfig(
                "queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }

    pub(crate) fn metrics_enabled(&self) -> bool {
        self.enable_sender_metrics || self.enable_receiver_metrics
    }
}

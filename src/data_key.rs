//! Channel identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one exchange endpoint
///
/// Used as the sender registry key and for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeDataKey {
    /// Query the exchange belongs to
    pub query_unique_id: u64,
    /// Exchange node id within the plan
    pub exchange_id: u64,
    /// Partition (parallel index) of the exchange
    pub parallel_index: u64,
}

impl ExchangeDataKey {
    /// Creates a key
    pub const fn new(query_unique_id: u64, exchange_id: u64, parallel_index: u64) -> Self {
        Self {
            query_unique_id,
            exchange_id,
            parallel_index,
        }
    }
}

impl fmt::Display for ExchangeDataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.query_unique_id, self.exchange_id, self.parallel_index
        )
    }
}

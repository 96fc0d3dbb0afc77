//! # Broadcast channels
//!
//! A channel connects the producing and the consuming stage of one exchange
//! partition. Both ends share a single terminal [BroadcastStatus]; whichever
//! side finishes first decides the outcome for everybody.

use crate::error::Result;
use crate::status::BroadcastStatus;
use crate::status::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod local;
mod metrics;


pub use local::LocalBroadcastChannel;
pub use metrics::{ReceiverMetricsSnapshot, SenderMetricsSnapshot};

/// Producing end of a channel
pub trait BroadcastSender<C>: Send + Sync {
    /// Hands a chunk to the consumers
    ///
    /// Returns [RUNNING](StatusCode::RUNNING) while the channel accepts data,
    /// otherwise the terminal status
    fn send(&self, chunk: C) -> BroadcastStatus;

    /// Attempts to move the channel to a terminal status
    ///
    /// Only the first attempt wins; the returned status has `is_modifier`
    /// set only for the winner
    fn finish(&self, code: StatusCode, message: &str) -> BroadcastStatus;

    /// Combines another sender into this one
    fn merge(&self, sender: Arc<dyn BroadcastSender<C>>) -> Result<()>;

    /// Channel name in logs
    fn name(&self) -> &str;
}

/// Consuming end of a channel
pub trait BroadcastReceiver<C>: Send + Sync {
    /// Receives the next chunk or the terminal status, waiting until `deadline`
    fn recv(&self, deadline: Instant) -> RecvDataPacket<C>;

    /// Publishes this channel to the producer waiting on its sender proxy
    fn register_to_senders(self: Arc<Self>, timeout: Duration) -> Result<()>;

    /// Channel name in logs
    fn name(&self) -> &str;
}

/// Result of [BroadcastReceiver::recv]
#[derive(Debug)]
pub enum RecvDataPacket<C> {
    /// The next chunk
    Chunk(C),
    /// No chunk will follow
    Status(BroadcastStatus),
}

impl<C> RecvDataPacket<C> {
    /// Returns the chunk if there is one
    pub fn into_chunk(self) -> Option<C> {
        match self {
            RecvDataPacket::Chunk(chunk) => Some(chunk),
            RecvDataPacket::Status(_) => None,
        }
    }

    /// Returns the status if there is one
    pub fn status(&self) -> Option<&BroadcastStatus> {
        match self {
            RecvDataPacket::Chunk(_) => None,
            RecvDataPacket::Status(status) => Some(status),
        }
    }
}

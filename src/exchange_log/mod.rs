//! # Exchange log
//!
//! One record per channel, written when the channel is torn down

use crate::error::{ExchangeError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{
    error::{SendError, TryRecvError},
    unbounded_channel, UnboundedReceiver, UnboundedSender,
};


/// Teardown record of one channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeLogElement {
    /// Query that started the whole distributed execution
    pub initial_query_id: String,
    /// Exchange id of the channel key
    pub exchange_id: String,
    /// Partition of the channel key
    pub partition_id: String,
    /// Transport kind tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Wall clock time of teardown, seconds since the unix epoch
    pub event_time: u64,

    /// Time spent in `send`
    pub send_time_ms: u64,
    /// Rows handed to `send`
    pub send_rows: u64,
    /// Uncompressed bytes handed to `send`
    pub send_uncompressed_bytes: u64,
    /// Terminal status code recorded by the last `finish`
    pub finish_code: i32,
    /// Whether that `finish` changed the status
    pub is_modifier: bool,
    /// Terminal status message
    pub message: String,

    /// Time spent in `recv`
    pub recv_time_ms: u64,
    /// Time spent registering to senders
    pub register_time_ms: u64,
    /// Bytes received
    pub recv_bytes: u64,
}

/// Collector of [ExchangeLogElement]s
pub trait ExchangeLogSink: Send + Sync {
    /// Accepts one record
    fn add(&self, element: ExchangeLogElement) -> Result<()>;
}

/// Channel-backed sink; records are consumed by an [ExchangeLogReceiver]
#[derive(Debug, Clone)]
pub struct QueryExchangeLog {
    sender: UnboundedSender<ExchangeLogElement>,
}

/// Consuming end of a [QueryExchangeLog]
#[derive(Debug)]
pub struct ExchangeLogReceiver {
    receiver: UnboundedReceiver<ExchangeLogElement>,
}

impl QueryExchangeLog {
    /// Creates a sink and its receiver
    pub fn new() -> (Self, ExchangeLogReceiver) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, ExchangeLogReceiver { receiver })
    }
}

impl ExchangeLogSink for QueryExchangeLog {
    fn add(&self, element: ExchangeLogElement) -> Result<()> {
        self.sender.send(element)?;
        Ok(())
    }
}

impl ExchangeLogReceiver {
    /// Receives the next record
    ///
    /// Returns `None` once every sink is dropped and the backlog is empty
    pub async fn recv(&mut self) -> Option<ExchangeLogElement> {
        self.receiver.recv().await
    }

    /// Takes every record available right now
    pub fn drain(&mut self) -> Vec<ExchangeLogElement> {
        let mut elements = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(element) => elements.push(element),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return elements,
            }
        }
    }
}

impl From<SendError<ExchangeLogElement>> for ExchangeError {
    fn from(_: SendError<ExchangeLogElement>) -> Self {
        ExchangeError::LogSinkClosed
    }
}

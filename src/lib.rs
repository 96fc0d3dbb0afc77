#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_panics_doc)]

//! Intra-process data exchange for pipelined query execution
//!
//! A producing stage hands [chunks](chunk::Chunk) to a consuming stage on
//! another thread through a [LocalBroadcastChannel]. The channel is backed
//! by a bounded [TransportQueue](queue::TransportQueue) and moves to one
//! terminal [BroadcastStatus] exactly once:
//!
//! - positive codes abort, queued data is discarded
//! - negative codes finish gracefully, queued data is drained first
//!
//! Consumers that start before the producing channel exists meet it through
//! the [SenderProxyRegistry].
//!
//! ## Example
//!
//! ```rust
//! use local_exchange::{
//!     BroadcastReceiver, BroadcastSender, DataChunk, ExchangeContext, ExchangeDataKey,
//!     LocalBroadcastChannel, LocalChannelOptions, RecvDataPacket, StatusCode,
//! };
//! use std::time::{Duration, Instant};
//!
//! let key = ExchangeDataKey::new(1, 2, 0);
//! let context = ExchangeContext::<DataChunk>::new("query-1");
//! let channel =
//!     LocalBroadcastChannel::new(key, "exchange-2-0", LocalChannelOptions::default(), context)
//!         .unwrap();
//!
//! channel.send(DataChunk::new(vec![vec![1, 2, 3]], 3));
//! channel.finish(StatusCode::ALL_SENDERS_DONE, "done");
//!
//! let deadline = Instant::now() + Duration::from_secs(1);
//! assert!(matches!(channel.recv(deadline), RecvDataPacket::Chunk(_)));
//! let status = channel.recv(deadline).status().cloned().unwrap();
//! assert_eq!(status.code, StatusCode::ALL_SENDERS_DONE);
//! ```

mod common;

pub mod channel;
pub mod chunk;
pub mod config;
pub mod context;
pub mod data_key;
pub mod error;
pub mod exchange_log;
pub mod memory;
pub mod queue;
pub mod registry;
pub mod status;

pub use channel::{BroadcastReceiver, BroadcastSender, LocalBroadcastChannel, RecvDataPacket};
pub use chunk::{Chunk, DataChunk};
pub use config::LocalChannelOptions;
pub use context::ExchangeContext;
pub use data_key::ExchangeDataKey;
pub use error::{ExchangeError, Result};
pub use exchange_log::{ExchangeLogElement, ExchangeLogSink, QueryExchangeLog};
pub use memory::{MemoryAccounting, MemoryTracker};
pub use registry::{BroadcastSenderProxy, SenderProxyRegistry};
pub use status::{BroadcastStatus, StatusCode};

use crate::status::BroadcastStatus;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::Duration;

#[derive(Debug, Default)]
pub(super) struct SenderMetrics {
    send_time_ms: AtomicU64,
    send_rows: AtomicU64,
    send_uncompressed_bytes: AtomicU64,
    finish: Mutex<Option<FinishRecord>>,
}

#[derive(Debug, Clone)]
struct FinishRecord {
    code: i32,
    is_modifier: bool,
    message: String,
}

#[derive(Debug, Default)]
pub(super) struct ReceiverMetrics {
    recv_time_ms: AtomicU64,
    register_time_ms: AtomicU64,
    recv_bytes: AtomicU64,
}

/// Point-in-time copy of the sender side counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderMetricsSnapshot {
    /// Time spent in `send`
    pub send_time_ms: u64,
    /// Rows accepted by the queue
    pub send_rows: u64,
    /// Uncompressed bytes accepted by the queue
    pub send_uncompressed_bytes: u64,
    /// Terminal code seen by `finish`, `0` if never called
    pub finish_code: i32,
    /// Whether a `finish` on this channel changed the status
    pub is_modifier: bool,
    /// Terminal message seen by `finish`
    pub message: String,
}

/// Point-in-time copy of the receiver side counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverMetricsSnapshot {
    /// Time spent in `recv`
    pub recv_time_ms: u64,
    /// Time spent registering to senders
    pub register_time_ms: u64,
    /// Bytes received
    pub recv_bytes: u64,
}

fn millis(elapsed: Duration) -> u64 {
    elapsed.as_millis().min(u64::MAX as u128) as u64
}

impl SenderMetrics {
    pub(super) fn add_send_time(&self, elapsed: Duration) {
        self.send_time_ms.fetch_add(millis(elapsed), Relaxed);
    }

    pub(super) fn add_sent(&self, rows: usize, bytes: usize) {
        self.send_rows.fetch_add(rows as u64, Relaxed);
        self.send_uncompressed_bytes.fetch_add(bytes as u64, Relaxed);
    }

    /// The winning transition always overwrites; a lost one never hides a win
    pub(super) fn record_finish(&self, status: &BroadcastStatus, is_modifier: bool) {
        let mut finish = self.finish.lock();
        if !is_modifier && finish.is_some() {
            return;
        }
        *finish = Some(FinishRecord {
            code: status.code.0,
            is_modifier,
            message: status.message.clone(),
        });
    }

    pub(super) fn snapshot(&self) -> SenderMetricsSnapshot {
        let finish = self.finish.lock().clone();
        let (finish_code, is_modifier, message) = match finish {
            Some(FinishRecord {
                code,
                is_modifier,
                message,
            }) => (code, is_modifier, message),
            None => (0, false, String::new()),
        };
        SenderMetricsSnapshot {
            send_time_ms: self.send_time_ms.load(Relaxed),
            send_rows: self.send_rows.load(Relaxed),
            send_uncompressed_bytes: self.send_uncompressed_bytes.load(Relaxed),
            finish_code,
            is_modifier,
            message,
        }
    }
}

impl ReceiverMetrics {
    pub(super) fn add_recv_time(&self, elapsed: Duration) {
        self.recv_time_ms.fetch_add(millis(elapsed), Relaxed);
    }

    pub(super) fn add_register_time(&self, elapsed: Duration) {
        self.register_time_ms.fetch_add(millis(elapsed), Relaxed);
    }

    pub(super) fn add_recv_bytes(&self, bytes: usize) {
        self.recv_bytes.fetch_add(bytes as u64, Relaxed);
    }

    pub(super) fn snapshot(&self) -> ReceiverMetricsSnapshot {
        ReceiverMetricsSnapshot {
            recv_time_ms: self.recv_time_ms.load(Relaxed),
            register_time_ms: self.register_time_ms.load(Relaxed),
            recv_bytes: self.recv_bytes.load(Relaxed),
        }
    }
}

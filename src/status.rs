//! # Channel status
//!
//! A channel starts [RUNNING](StatusCode::RUNNING) and moves to exactly one
//! terminal status. Positive codes abort: queued data is discarded.
//! Negative codes are graceful: queued data is drained first.

use std::fmt;

/// Signed status code of a broadcast channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub i32);

impl StatusCode {
    /// Every sender finished normally
    pub const ALL_SENDERS_DONE: Self = Self(-1);
    /// The only non-terminal code
    pub const RUNNING: Self = Self(0);
    /// The receiver got all the data it wanted
    pub const RECV_REACH_LIMIT: Self = Self(1);
    /// Nothing arrived before the receive deadline
    pub const RECV_TIMEOUT: Self = Self(2);
    /// No queue space became available before the send deadline
    pub const SEND_TIMEOUT: Self = Self(3);
    /// The receiving side was cancelled
    pub const RECV_CANCELLED: Self = Self(4);
    /// The sending side was cancelled
    pub const SEND_CANCELLED: Self = Self(5);
    /// Unclassified receive failure
    pub const RECV_UNKNOWN_ERROR: Self = Self(6);
    /// Send interrupted by a concurrent close
    pub const SEND_UNKNOWN_ERROR: Self = Self(7);
    /// The real sender behind a proxy never showed up
    pub const SEND_NOT_READY: Self = Self(8);

    /// Whether queued data must be discarded
    pub const fn is_abort(self) -> bool {
        self.0 > 0
    }

    /// Whether queued data must be drained before completion is visible
    pub const fn is_graceful(self) -> bool {
        self.0 < 0
    }

    /// Whether the code is terminal
    pub const fn is_terminal(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Outcome of a channel operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastStatus {
    /// Status code
    pub code: StatusCode,
    /// Set only on the value returned to the caller whose
    /// transition actually changed the shared state
    pub is_modifier: bool,
    /// Human readable reason
    pub message: String,
}

impl BroadcastStatus {
    /// Creates a non-modifying status
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            is_modifier: false,
            message: message.into(),
        }
    }

    pub(crate) fn running() -> Self {
        Self::new(StatusCode::RUNNING, "running")
    }

    pub(crate) fn as_modifier(mut self, is_modifier: bool) -> Self {
        self.is_modifier = is_modifier;
        self
    }

    /// See [StatusCode::is_terminal]
    pub fn is_terminal(&self) -> bool {
        self.code.is_terminal()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn code_classes() {
        assert!(!StatusCode::RUNNING.is_terminal());
        assert!(StatusCode::ALL_SENDERS_DONE.is_graceful());
        assert!(!StatusCode::ALL_SENDERS_DONE.is_abort());
        for code in [
            StatusCode::RECV_TIMEOUT,
            StatusCode::SEND_TIMEOUT,
            StatusCode::SEND_UNKNOWN_ERROR,
        ] {
            assert!(code.is_abort());
            assert!(code.is_terminal());
        }
    }
}

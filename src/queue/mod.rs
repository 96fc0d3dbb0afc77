//! # Transport queue
//!
//! Bounded FIFO shared by the two ends of a channel. Every blocking call
//! takes an absolute deadline; closing wakes everybody and rejects further
//! pushes while leaving queued packets poppable.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

#[cfg(test)]
mod test;

/// Packet travelling through a [TransportQueue]
#[derive(Debug)]
pub enum TransportPacket<C> {
    /// A chunk of data
    Data(C),
    /// No more data follows; injected by a graceful finish
    EndOfStream,
}

/// Why [TransportQueue::try_emplace_until] gave the packet back
#[derive(Debug, PartialEq, Eq)]
pub enum PushError<T> {
    /// The queue is closed
    Closed(T),
    /// The deadline elapsed while the queue stayed full
    Timeout(T),
}

impl<T> PushError<T> {
    /// Returns the rejected value
    pub fn into_inner(self) -> T {
        match self {
            PushError::Closed(value) | PushError::Timeout(value) => value,
        }
    }
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded, closable, deadline-aware queue
pub struct TransportQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> TransportQueue<T> {
    /// Creates a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Pushes `value`, waiting for space until `deadline`
    pub fn try_emplace_until(&self, deadline: Instant, value: T) -> Result<(), PushError<T>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PushError::Closed(value));
            }
            if state.items.len() < self.capacity {
                state.items.push_back(value);
                drop(state);
                self.not_empty.notify_one();
                return Ok(());
            }
            if self.not_full.wait_until(&mut state, deadline).timed_out() {
                // a slot or a close may have landed right at the deadline
                if state.closed {
                    return Err(PushError::Closed(value));
                }
                if state.items.len() < self.capacity {
                    continue;
                }
                return Err(PushError::Timeout(value));
            }
        }
    }

    /// Pops the oldest item, waiting until `deadline`
    ///
    /// Returns `None` on timeout, or right away once the queue is closed and drained
    pub fn try_pop_until(&self, deadline: Instant) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(value) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(value);
            }
            if state.closed {
                return None;
            }
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                let value = state.items.pop_front();
                if value.is_some() {
                    drop(state);
                    self.not_full.notify_one();
                }
                return value;
            }
        }
    }

    /// Closes the queue; idempotent
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Whether [close](Self::close) was called
    pub fn closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> fmt::Debug for TransportQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransportQueue")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .finish()
    }
}

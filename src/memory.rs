//! Memory budget transfer around chunk handoff.
//!
//! A chunk's memory is charged to the producing thread while it is built.
//! Once it sits in a transport queue no thread owns it, so its bytes are
//! moved to the process-wide budget, and moved back to the consuming thread
//! when it is popped.

use std::cell::Cell;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Thread/process memory budget tracker consumed by channels
pub trait MemoryAccounting: Send + Sync {
    /// Moves `bytes` from the calling thread's budget to the global one
    fn move_to_global(&self, bytes: usize);

    /// Moves `bytes` from the global budget to the calling thread's one
    fn move_to_thread(&self, bytes: usize);
}

thread_local! {
    static THREAD_BYTES: Cell<i64> = const { Cell::new(0) };
}

/// Default [MemoryAccounting] implementation
///
/// The global side is owned by the tracker; the thread side is a
/// per-OS-thread counter shared by all trackers used on that thread.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    global_bytes: AtomicI64,
}

impl MemoryTracker {
    /// Creates a tracker with an empty global budget
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bytes currently charged to the global budget
    pub fn global_bytes(&self) -> i64 {
        self.global_bytes.load(Ordering::Acquire)
    }

    /// Net bytes charged to the calling thread
    pub fn thread_bytes() -> i64 {
        THREAD_BYTES.with(Cell::get)
    }
}

impl MemoryAccounting for MemoryTracker {
    fn move_to_global(&self, bytes: usize) {
        let bytes = bytes as i64;
        THREAD_BYTES.with(|cell| cell.set(cell.get() - bytes));
        self.global_bytes.fetch_add(bytes, Ordering::AcqRel);
    }

    fn move_to_thread(&self, bytes: usize) {
        let bytes = bytes as i64;
        self.global_bytes.fetch_sub(bytes, Ordering::AcqRel);
        THREAD_BYTES.with(|cell| cell.set(cell.get() + bytes));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn transfer_is_symmetric() {
        let tracker = MemoryTracker::new();
        let before = MemoryTracker::thread_bytes();
        tracker.move_to_global(100);
        assert_eq!(tracker.global_bytes(), 100);
        assert_eq!(MemoryTracker::thread_bytes(), before - 100);
        tracker.move_to_thread(100);
        assert_eq!(tracker.global_bytes(), 0);
        assert_eq!(MemoryTracker::thread_bytes(), before);
    }

    #[test]
    fn thread_side_is_per_thread() {
        let tracker = MemoryTracker::new();
        let producer = {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                tracker.move_to_global(64);
                MemoryTracker::thread_bytes()
            })
        };
        assert_eq!(producer.join().unwrap(), -64);
        let before = MemoryTracker::thread_bytes();
        tracker.move_to_thread(64);
        assert_eq!(MemoryTracker::thread_bytes(), before + 64);
        assert_eq!(tracker.global_bytes(), 0);
    }
}

//! Blocking rendezvous primitives on `parking_lot`
//!
//! Every wait is bounded so that no harness thread can be parked forever by
//! a partner that never shows up.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Countdown gate that releases every waiter once `parties` have counted down
pub struct CountdownLatch {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl CountdownLatch {
    /// Create a latch for `parties` arrivals
    pub fn new(parties: usize) -> Self {
        Self {
            remaining: Mutex::new(parties),
            released: Condvar::new(),
        }
    }

    /// Record one arrival
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            if *remaining == 0 {
                self.released.notify_all();
            }
        }
    }

    /// Wait until the count reaches zero
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.remaining.lock();

        while *remaining > 0 {
            if self.released.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }

    /// Arrivals still missing
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}

/// One-shot result slot; the first value written wins
pub struct Completion<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

enum Slot<T> {
    Pending,
    Ready(T),
    Taken,
}

impl<T> Completion<T> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            ready: Condvar::new(),
        }
    }

    /// Publish a value
    ///
    /// Returns `false` if a value was already published.
    pub fn complete(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Ready(value);
        self.ready.notify_all();
        true
    }

    /// `true` once a value has been published
    pub fn is_complete(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Pending)
    }

    /// Wait up to `timeout` and take the published value
    ///
    /// Returns `None` if nothing was published in time, or if another waiter
    /// already took the value.
    pub fn wait_for(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();

        while matches!(*slot, Slot::Pending) {
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }

        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(value) => Some(value),
            other => {
                *slot = other;
                None
            }
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_latch_releases_both_parties() {
        let latch = Arc::new(CountdownLatch::new(2));
        let peer = Arc::clone(&latch);

        let handle = thread::spawn(move || {
            peer.count_down();
            peer.wait_for(Duration::from_secs(5))
        });

        latch.count_down();
        assert!(latch.wait_for(Duration::from_secs(5)));
        assert!(handle.join().unwrap());
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_latch_times_out_without_partner() {
        let latch = CountdownLatch::new(2);
        latch.count_down();

        let started = Instant::now();
        assert!(!latch.wait_for(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(latch.remaining(), 1);
    }

    #[test]
    fn test_latch_never_underflows() {
        let latch = CountdownLatch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.remaining(), 0);
        assert!(latch.wait_for(Duration::ZERO));
    }

    #[test]
    fn test_completion_first_value_wins() {
        let slot = Completion::new();
        assert!(slot.complete(1));
        assert!(!slot.complete(2));
        assert!(slot.is_complete());
        assert_eq!(slot.wait_for(Duration::ZERO), Some(1));
    }

    #[test]
    fn test_completion_across_threads() {
        let slot = Arc::new(Completion::new());
        let writer = Arc::clone(&slot);

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            writer.complete("done");
        });

        assert_eq!(slot.wait_for(Duration::from_secs(5)), Some("done"));
    }

    #[test]
    fn test_completion_timeout() {
        let slot: Completion<u64> = Completion::new();
        assert_eq!(slot.wait_for(Duration::from_millis(10)), None);
        assert!(!slot.is_complete());
    }
}

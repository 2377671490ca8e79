//! One-shot broadcast signals for task synchronization.
//!
//! Each task id owns one [`Signal`]. Raising a signal is a broadcast: every
//! waker registered at that point is woken exactly once, and any later
//! waiter observes the raised flag without parking. The raised flag and the
//! waiter list share a mutex so that registration and raising cannot
//! interleave into a missed wakeup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Waker;

use parking_lot::Mutex;

/// A one-shot broadcast signal.
///
/// State is a raised flag plus a list of parked wakers. The flag alone is
/// read on the lock-free fast path; every transition takes the waiter lock.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    /// Set once per cycle by `raise`; cleared only by `reset`.
    raised: AtomicBool,
    /// Wakers parked until the signal is raised.
    waiters: Mutex<Vec<Waker>>,
}

impl Signal {
    /// Lock-free check of the raised flag.
    ///
    /// The Acquire load pairs with the Release store in [`Self::raise`], so a
    /// `true` result also publishes every write the raiser made beforehand.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Register a waker to be woken when the signal is raised.
    ///
    /// Returns `false` without registering if the signal is already raised;
    /// the caller must treat that as an immediate wakeup. The re-check under
    /// the waiter lock closes the race with a concurrent `raise`: either the
    /// waker makes it into the list before the raiser drains it, or the flag
    /// is already visible here.
    pub fn add_waiter(&self, waker: Waker) -> bool {
        let mut waiters = self.waiters.lock();
        if self.raised.load(Ordering::Acquire) {
            return false;
        }
        waiters.push(waker);
        true
    }

    /// Raise the signal and wake every registered waiter.
    ///
    /// Returns the number of waiters woken. Idempotent: raising an already
    /// raised signal finds an empty list and wakes nobody. Wakers run outside
    /// the waiter lock.
    pub fn raise(&self) -> usize {
        let wakers = {
            let mut waiters = self.waiters.lock();
            self.raised.store(true, Ordering::Release);
            std::mem::take(&mut *waiters)
        };
        let woken = wakers.len();
        for waker in wakers {
            waker.wake();
        }
        woken
    }

    /// Clear the signal for the next cycle, dropping any stale waiters.
    ///
    /// Returns the number of waiters discarded. After a fully drained run the
    /// list is empty; a nonzero count means a task was left parked on a
    /// signal nobody raised.
    pub fn reset(&self) -> usize {
        let mut waiters = self.waiters.lock();
        self.raised.store(false, Ordering::Release);
        let stale = waiters.len();
        waiters.clear();
        stale
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::DemoError;
use crate::error::Result;

/// A counter whose read-modify-write is performed under a lock.
///
/// Concurrent increments are serialized, so no increment is ever lost.
#[derive(Debug, Default)]
pub struct LockedCounter {
    value: Mutex<u64>,
}

impl LockedCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one and returns the new value.
    pub fn increment(&self) -> u64 {
        let mut value = self.value.lock();
        *value = value.wrapping_add(1);
        *value
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        *self.value.lock()
    }
}

/// A counter that reads and writes its value in two separate steps.
///
/// Each access is atomic on its own, but another thread can write between the read and the
/// write. That thread's increment is then overwritten and lost. The counter yields between the
/// two steps to make this likely.
#[derive(Debug, Default)]
pub struct UnlockedCounter {
    value: AtomicU64,
}

impl UnlockedCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one (unless the update is lost) and returns the value this call wrote.
    pub fn increment(&self) -> u64 {
        let current = self.value.load(Ordering::Relaxed);
        thread::yield_now();

        let next = current.wrapping_add(1);
        self.value.store(next, Ordering::Relaxed);
        next
    }

    /// The current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Increments a [`LockedCounter`] `increments` times from each of `threads` threads and returns
/// the final value, which is always `threads * increments`.
///
/// # Errors
///
/// Returns an error if a thread cannot be started or panics.
pub fn count_with_lock(threads: usize, increments: u64) -> Result<u64> {
    let counter = LockedCounter::new();

    increment_concurrently(threads, increments, || {
        counter.increment();
    })?;

    let total = counter.get();
    debug!(threads, increments, total, "locked counter finished");

    Ok(total)
}

/// Increments an [`UnlockedCounter`] `increments` times from each of `threads` threads and
/// returns the final value, which is at most `threads * increments` and usually less.
///
/// # Errors
///
/// Returns an error if a thread cannot be started or panics.
pub fn count_without_lock(threads: usize, increments: u64) -> Result<u64> {
    let counter = UnlockedCounter::new();

    increment_concurrently(threads, increments, || {
        counter.increment();
    })?;

    let total = counter.get();
    debug!(threads, increments, total, "unlocked counter finished");

    Ok(total)
}

fn increment_concurrently<F>(threads: usize, increments: u64, increment: F) -> Result<()>
where
    F: Fn() + Sync,
{
    // Threads wait behind the gate until all of them exist, so their increments interleave.
    let gate = RwLock::new(());

    thread::scope(|scope| {
        let increment = &increment;
        let gate = &gate;
        let closed = gate.write();

        let handles = (0..threads)
            .map(|index| {
                thread::Builder::new()
                    .name(format!("counter-{index}"))
                    .spawn_scoped(scope, move || {
                        drop(gate.read());

                        for _ in 0..increments {
                            increment();
                        }
                    })
                    .map_err(DemoError::ThreadSpawn)
            })
            .collect::<Result<Vec<_>>>();

        drop(closed);

        for handle in handles? {
            handle
                .join()
                .map_err(|_panic| DemoError::ThreadPanicked("counter"))?;
        }

        Ok(())
    })
}

//! A shared integer counter under an exclusive lock.
//!
//! Both increments and reads take the same mutex, so a read observes a
//! stable value and the final count equals the number of successful
//! increments regardless of how many threads raced. The lock (rather than
//! an atomic) is the contract here: abnormal termination while holding it
//! is detected and surfaced as [`LockPoisoned`] instead of silently
//! continuing on possibly inconsistent state.
//!
//! [`LockPoisoned`]: windlass_common::error::ErrorKind::LockPoisoned

use std::sync::Mutex;

use windlass_common::{Result, error::Error};

/// A `u64` counter shared by reference across threads.
///
/// A poisoned counter stays poisoned: every subsequent call fails, and the
/// instance must be replaced, never reused.
#[derive(Debug, Default)]
pub struct Counter {
    value: Mutex<u64>,
}

impl Counter {
    pub fn new() -> Counter {
        Counter {
            value: Mutex::new(0),
        }
    }

    /// Adds one to the counter and returns the new value.
    pub fn increment(&self) -> Result<u64> {
        self.add(1)
    }

    /// Adds `n` to the counter and returns the new value.
    pub fn add(&self, n: u64) -> Result<u64> {
        let mut value = self
            .value
            .lock()
            .map_err(|_| Error::lock_poisoned("counter"))?;
        *value += n;
        Ok(*value)
    }

    /// Returns the current value.
    pub fn value(&self) -> Result<u64> {
        let value = self
            .value
            .lock()
            .map_err(|_| Error::lock_poisoned("counter"))?;
        Ok(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_increment_and_value() {
        let counter = Counter::new();
        assert_eq!(counter.value().unwrap(), 0);
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.add(10).unwrap(), 11);
        assert_eq!(counter.value().unwrap(), 11);
    }

    #[test]
    fn test_concurrent_increments_are_exact() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1000;

        let counter = Counter::new();

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..PER_THREAD {
                        counter.increment().unwrap();
                    }
                });
            }
        });

        assert_eq!(counter.value().unwrap(), (THREADS * PER_THREAD) as u64);
    }
}

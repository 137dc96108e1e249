//! A shared key-value cache under reader/writer locking with writer
//! preference.
//!
//! Any number of readers may hold the cache concurrently; writers get
//! exclusive access. On top of the reader/writer lock sits an explicit
//! writer-preference gate: the moment a writer announces itself, newly
//! arriving readers park in front of the lock until no writer is waiting.
//! Readers that already hold the lock finish normally. This bounds write
//! latency under heavy read traffic, which the reader/writer lock alone
//! leaves to the operating system's scheduling policy.
//!
//! Reads only ever observe a value entirely before or entirely after a
//! write, never a mix. A thread that terminates abnormally while holding
//! the lock poisons the cache: every subsequent operation fails with
//! [`LockPoisoned`], and the instance must be replaced, never reused.
//!
//! [`LockPoisoned`]: windlass_common::error::ErrorKind::LockPoisoned

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, RwLock};

use windlass_common::{Result, error::Error};

/// A key-value map shared by reference across threads.
///
/// Point lookups ([`get`](Self::get)) hand back a clone of the stored
/// value; multi-step read or write sections go through
/// [`read_with`](Self::read_with) and [`write_with`](Self::write_with),
/// which run a closure under the corresponding lock.
#[derive(Debug)]
pub struct SharedCache<K, V> {
    gate: WriterGate,
    map: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> Default for SharedCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SharedCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> SharedCache<K, V> {
        SharedCache {
            gate: WriterGate::new(),
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a clone of the value stored under `key`, if any.
    pub fn get(&self, key: &K) -> Result<Option<V>>
    where
        V: Clone,
    {
        self.gate.wait_for_writers();
        let map = self.map.read().map_err(|_| Error::lock_poisoned("cache"))?;
        Ok(map.get(key).cloned())
    }

    /// Stores `value` under `key`, returning the value it replaced, if any.
    pub fn set(&self, key: K, value: V) -> Result<Option<V>> {
        let _ticket = self.gate.begin_write();
        let mut map = self
            .map
            .write()
            .map_err(|_| Error::lock_poisoned("cache"))?;
        Ok(map.insert(key, value))
    }

    /// Removes the entry under `key`, returning its value, if any.
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        let _ticket = self.gate.begin_write();
        let mut map = self
            .map
            .write()
            .map_err(|_| Error::lock_poisoned("cache"))?;
        Ok(map.remove(key))
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.gate.wait_for_writers();
        let map = self.map.read().map_err(|_| Error::lock_poisoned("cache"))?;
        Ok(map.contains_key(key))
    }

    /// Number of entries at the instant of measurement (inherently stale
    /// under concurrency; diagnostic only).
    pub fn len(&self) -> Result<usize> {
        self.gate.wait_for_writers();
        let map = self.map.read().map_err(|_| Error::lock_poisoned("cache"))?;
        Ok(map.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Runs `f` with shared access to the whole map.
    ///
    /// The read lock is held for the duration of the closure, so every
    /// lookup inside observes one consistent state. A closure that panics
    /// poisons the cache.
    pub fn read_with<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&HashMap<K, V>) -> T,
    {
        self.gate.wait_for_writers();
        let map = self.map.read().map_err(|_| Error::lock_poisoned("cache"))?;
        Ok(f(&map))
    }

    /// Runs `f` with exclusive access to the whole map.
    ///
    /// All mutations made by the closure become visible to readers
    /// atomically, when the lock is released. A closure that panics
    /// poisons the cache.
    pub fn write_with<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut HashMap<K, V>) -> T,
    {
        let _ticket = self.gate.begin_write();
        let mut map = self
            .map
            .write()
            .map_err(|_| Error::lock_poisoned("cache"))?;
        Ok(f(&mut map))
    }
}

/// The writer-preference gate in front of the reader/writer lock.
///
/// Writers raise `waiting` before touching the lock and lower it once
/// their write is over (ticket drop). Readers consult the counter first:
/// non-zero means "park until the writers are through". The park mutex is
/// taken by the last departing writer before notifying, so a reader cannot
/// slip between its counter check and its wait and miss the wakeup.
#[derive(Debug, Default)]
struct WriterGate {
    waiting: AtomicUsize,
    park: Mutex<()>,
    unparked: Condvar,
}

impl WriterGate {
    fn new() -> WriterGate {
        WriterGate {
            waiting: AtomicUsize::new(0),
            park: Mutex::new(()),
            unparked: Condvar::new(),
        }
    }

    fn begin_write(&self) -> WriteTicket<'_> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        WriteTicket { gate: self }
    }

    fn wait_for_writers(&self) {
        if self.waiting.load(Ordering::SeqCst) == 0 {
            return;
        }
        let mut parked = self.park.lock().unwrap();
        while self.waiting.load(Ordering::SeqCst) > 0 {
            parked = self.unparked.wait(parked).unwrap();
        }
    }
}

/// Releases the gate when a write ends, including by unwind.
struct WriteTicket<'a> {
    gate: &'a WriterGate,
}

impl Drop for WriteTicket<'_> {
    fn drop(&mut self) {
        if self.gate.waiting.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _parked = self.gate.park.lock().unwrap();
            self.gate.unparked.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use windlass_common::error::ErrorKind;

    #[test]
    fn test_set_get_remove() {
        let cache = SharedCache::new();
        assert_eq!(cache.get(&"a").unwrap(), None);

        assert_eq!(cache.set("a", 1).unwrap(), None);
        assert_eq!(cache.set("a", 2).unwrap(), Some(1));
        assert_eq!(cache.get(&"a").unwrap(), Some(2));
        assert!(cache.contains_key(&"a").unwrap());
        assert_eq!(cache.len().unwrap(), 1);

        assert_eq!(cache.remove(&"a").unwrap(), Some(2));
        assert_eq!(cache.remove(&"a").unwrap(), None);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_read_with_sees_consistent_state() {
        let cache = SharedCache::new();
        cache.set("x", 10).unwrap();
        cache.set("y", 20).unwrap();

        let sum = cache
            .read_with(|map| map.values().copied().sum::<i32>())
            .unwrap();
        assert_eq!(sum, 30);
    }

    #[test]
    fn test_write_with_applies_atomically() {
        let cache = SharedCache::new();
        cache
            .write_with(|map| {
                map.insert("x", 1);
                map.insert("y", 2);
            })
            .unwrap();
        assert_eq!(cache.len().unwrap(), 2);
    }

    #[test]
    fn test_reads_never_observe_torn_pairs() {
        let cache = SharedCache::new();
        cache.set("slot", (0u64, 0u64)).unwrap();

        thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    for i in 1..500u64 {
                        cache.set("slot", (i, i)).unwrap();
                    }
                });
            }
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let (a, b) = cache.get(&"slot").unwrap().unwrap();
                        assert_eq!(a, b);
                    }
                });
            }
        });
    }

    #[test]
    fn test_reader_arriving_behind_waiting_writer_sees_the_write() {
        let cache = Arc::new(SharedCache::new());
        cache.set(1, 1).unwrap();

        // Reader A holds the read lock long enough for the writer to queue
        // up behind it.
        let c = cache.clone();
        let reader_a = thread::spawn(move || {
            c.read_with(|map| {
                assert_eq!(map.get(&1), Some(&1));
                thread::sleep(Duration::from_millis(80));
            })
            .unwrap();
        });

        thread::sleep(Duration::from_millis(20));

        let c = cache.clone();
        let writer = thread::spawn(move || {
            c.set(1, 2).unwrap();
        });

        thread::sleep(Duration::from_millis(20));

        // Reader B arrives while the writer is still waiting on reader A.
        // The gate parks it, so the value it eventually reads is the
        // written one.
        let c = cache.clone();
        let reader_b = thread::spawn(move || c.get(&1).unwrap());

        assert_eq!(reader_b.join().unwrap(), Some(2));
        reader_a.join().unwrap();
        writer.join().unwrap();
    }

    #[test]
    fn test_poisoned_cache_surfaces_error() {
        let cache = Arc::new(SharedCache::<u32, u32>::new());

        let c = cache.clone();
        let result = thread::spawn(move || {
            let _ = c.write_with(|map| -> u32 {
                map.insert(1, 1);
                panic!("die while holding the write lock")
            });
        })
        .join();
        assert!(result.is_err());

        assert!(matches!(
            cache.get(&1).unwrap_err().kind(),
            ErrorKind::LockPoisoned { .. }
        ));
        assert!(matches!(
            cache.set(1, 2).unwrap_err().kind(),
            ErrorKind::LockPoisoned { .. }
        ));
        assert!(matches!(
            cache.read_with(|map| map.len()).unwrap_err().kind(),
            ErrorKind::LockPoisoned { .. }
        ));
    }

    #[test]
    fn test_concurrent_readers_and_writers_stress() {
        let cache = SharedCache::new();

        thread::scope(|s| {
            for t in 0..4u64 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..250u64 {
                        cache.set(t * 1000 + i, i).unwrap();
                    }
                });
            }
            for _ in 0..4 {
                s.spawn(|| {
                    for i in 0..250u64 {
                        // Any of pre-write None or post-write Some is fine;
                        // the call itself must never fail or tear.
                        let _ = cache.get(&i).unwrap();
                    }
                });
            }
        });

        assert_eq!(cache.len().unwrap(), 1000);
    }
}

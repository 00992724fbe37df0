//! Small time-bounded caches with an injectable clock.
//!
//! `TtlCell` holds one value (the MCP tool listing), `TtlMap` holds a bounded
//! set of keyed values (the embedding cache). Both read time through a
//! [`Clock`] so tests can move time forward without sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

#[cfg(any(test, feature = "test-util"))]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.offset) += by;
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *lock(&self.offset)
    }
}

// A poisoned cache lock only means a panic happened mid-update of plain data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A single cached value with a time-to-live.
///
/// An expired value is still reachable through [`TtlCell::get_stale`] so
/// callers can fall back to it when a refresh fails.
pub struct TtlCell<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<(T, Instant)>>,
}

impl<T: Clone> TtlCell<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    pub fn put(&self, value: T) {
        *lock(&self.slot) = Some((value, self.clock.now()));
    }

    /// The value, if it was stored less than `ttl` ago.
    pub fn get_fresh(&self) -> Option<T> {
        let now = self.clock.now();
        lock(&self.slot)
            .as_ref()
            .filter(|(_, stored)| now.duration_since(*stored) < self.ttl)
            .map(|(value, _)| value.clone())
    }

    /// The value regardless of age.
    pub fn get_stale(&self) -> Option<T> {
        lock(&self.slot).as_ref().map(|(value, _)| value.clone())
    }

    pub fn clear(&self) {
        *lock(&self.slot) = None;
    }
}

/// A bounded map whose entries expire after `ttl`.
///
/// When full, inserting drops expired entries first and then the oldest one.
pub struct TtlMap<K, V> {
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (V, Instant)>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlMap<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        match entries.get(key) {
            Some((value, stored)) if now.duration_since(*stored) < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut entries = lock(&self.entries);
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, (_, stored)| now.duration_since(*stored) < self.ttl);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, (_, stored))| *stored)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, (value, now));
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

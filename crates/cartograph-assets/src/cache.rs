//! Single-flight asset cache shared between the caller and the workers.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::warn;

/// Callback owed exactly one answer for a key.
pub(crate) type Waiter<T> = Box<dyn FnOnce(Option<Arc<T>>) + Send + 'static>;

/// What [`AssetCache::begin`] decided for a request.
pub(crate) enum Begin<T: ?Sized> {
    /// The key was cached; the waiter is handed back to be answered inline.
    Hit(Option<Arc<T>>, Waiter<T>),
    /// Another request is loading the key; the waiter was attached to it.
    Joined,
    /// The caller must start the load and later call [`AssetCache::resolve`].
    Start,
}

/// Resolved values plus the waiters of loads still in flight.
///
/// Absent values (`None`) are cached too: a key that failed once stays failed
/// until the cache is cleared.
pub(crate) struct AssetCache<T: ?Sized> {
    entries: DashMap<String, Option<Arc<T>>>,
    /// Waiters are `Send` but not `Sync`, so they live behind a mutex.
    pending: Mutex<HashMap<String, Vec<Waiter<T>>>>,
    /// Bumped by [`clear`](Self::clear) so loads started before it are not cached.
    generation: AtomicU64,
    /// Underlying loader invocations.
    loads: AtomicU64,
}

impl<T: ?Sized> AssetCache<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
            pending: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    /// Cached value for `key`. The outer `Option` is the hit/miss.
    pub(crate) fn get(&self, key: &str) -> Option<Option<Arc<T>>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Route a request: answer from cache, join an in-flight load, or ask the
    /// caller to start one.
    pub(crate) fn begin(&self, key: &str, waiter: Waiter<T>) -> Begin<T> {
        if let Some(value) = self.get(key) {
            return Begin::Hit(value, waiter);
        }
        let mut pending = self.pending.lock();
        if let Some(waiting) = pending.get_mut(key) {
            waiting.push(waiter);
            return Begin::Joined;
        }
        // The value is stored before its pending entry is removed, so
        // re-checking under the pending lock closes the gap.
        if let Some(value) = self.get(key) {
            drop(pending);
            return Begin::Hit(value, waiter);
        }
        pending.insert(key.to_string(), vec![waiter]);
        Begin::Start
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn count_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Store the outcome of a load and answer everyone waiting on it.
    ///
    /// Results of loads started before the last [`clear`](Self::clear) are
    /// delivered but not cached. Waiters run on the calling thread; a waiter
    /// that panics is logged and the remaining waiters are still answered.
    pub(crate) fn resolve(&self, key: &str, value: Option<Arc<T>>, started_generation: u64) {
        if started_generation == self.generation() {
            self.entries.insert(key.to_string(), value.clone());
        }
        let waiters = self.pending.lock().remove(key).unwrap_or_default();
        for waiter in waiters {
            let answer = value.clone();
            call_guarded(key, "load callback", move || waiter(answer));
        }
    }

    /// Drop every cached value. In-flight loads still answer their waiters.
    pub(crate) fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Run a user callback, logging instead of unwinding if it panics.
pub(crate) fn call_guarded(key: &str, what: &str, callback: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        warn!(key, panic = %panic_message(payload.as_ref()), "{} panicked", what);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Artifact cache: TTL-bounded, type-erased, shared by every ranker.
//!
//! Expiry is read-triggered: a stale entry is evicted by the `get` that finds
//! it. `sweep` (and the optional sweeper thread) only bounds memory.
//! `clear` drops everything and starts a new epoch; builds that began in an
//! older epoch never store their result.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

type Value = Arc<dyn Any + Send + Sync>;

/// Time source. Tests swap in `ManualClock`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant { Instant::now() }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self { Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) } }

    pub fn advance(&self, by: Duration) { *self.offset.lock() += by; }
}

impl Default for ManualClock {
    fn default() -> Self { Self::new() }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant { self.base + *self.offset.lock() }
}

struct Entry {
    value: Value,
    created_at: Instant,
    ttl: Duration,
}

impl Entry {
    #[inline]
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    building: HashSet<String>,
    epoch: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl State {
    /// Live value for `key`, evicting it if stale.
    fn lookup(&mut self, key: &str, now: Instant) -> Option<Value> {
        match self.entries.get(key) {
            Some(e) if e.expired(now) => {
                self.entries.remove(key);
                self.evictions += 1;
                debug!(key, "cache entry expired");
                None
            }
            Some(e) => Some(Arc::clone(&e.value)),
            None => None,
        }
    }
}

pub struct ArtifactCache {
    state: Mutex<State>,
    built: Condvar,
    clock: Arc<dyn Clock>,
}

impl Default for ArtifactCache {
    fn default() -> Self { Self::new() }
}

impl ArtifactCache {
    pub fn new() -> Self { Self::with_clock(Arc::new(SystemClock)) }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { state: Mutex::new(State::default()), built: Condvar::new(), clock }
    }

    /// Typed read. Missing, expired or differently typed entries are misses.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let now = self.clock.now();
        let mut st = self.state.lock();
        let found = st.lookup(key, now).and_then(|v| downcast::<T>(key, v));
        if found.is_some() { st.hits += 1 } else { st.misses += 1 }
        found
    }

    pub fn set<T: Any + Send + Sync>(&self, key: &str, value: T, ttl: Duration) {
        let created_at = self.clock.now();
        let value: Value = Arc::new(value);
        self.state.lock().entries.insert(key.to_string(), Entry { value, created_at, ttl });
    }

    /// Remove one key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Drop every entry and start a new epoch.
    pub fn clear(&self) {
        let mut st = self.state.lock();
        let dropped = st.entries.len();
        st.entries.clear();
        st.epoch += 1;
        info!(dropped, epoch = st.epoch, "cache cleared");
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut st = self.state.lock();
        let before = st.entries.len();
        st.entries.retain(|_, e| !e.expired(now));
        let removed = before - st.entries.len();
        st.evictions += removed as u64;
        if removed > 0 { debug!(removed, "swept expired cache entries"); }
        removed
    }

    /// Single-flight memoization. One caller per key runs `build`; concurrent
    /// callers wait for it and read the stored value. `Ok(None)` and errors
    /// are returned to the builder but not stored, so waiters retry.
    pub fn get_or_build<T, E, F>(&self, key: &str, ttl: Duration, build: F) -> Result<Option<Arc<T>>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<Option<T>, E>,
    {
        let mut st = self.state.lock();
        loop {
            let now = self.clock.now();
            if let Some(v) = st.lookup(key, now).and_then(|v| downcast::<T>(key, v)) {
                st.hits += 1;
                return Ok(Some(v));
            }
            if !st.building.contains(key) { break; }
            self.built.wait(&mut st);
        }
        st.misses += 1;
        st.building.insert(key.to_string());
        let epoch = st.epoch;
        drop(st);

        let _flight = Flight { cache: self, key };
        let built = build()?.map(Arc::new);
        if let Some(v) = &built {
            let mut st = self.state.lock();
            if st.epoch == epoch {
                let created_at = self.clock.now();
                st.entries.insert(key.to_string(), Entry { value: Arc::clone(v) as Value, created_at, ttl });
            } else {
                debug!(key, "cache cleared during build, result not stored");
            }
        }
        Ok(built)
    }

    pub fn len(&self) -> usize { self.state.lock().entries.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn epoch(&self) -> u64 { self.state.lock().epoch }

    pub fn stats(&self) -> CacheStats {
        let st = self.state.lock();
        CacheStats {
            entries: st.entries.len(),
            hits: st.hits,
            misses: st.misses,
            evictions: st.evictions,
            epoch: st.epoch,
        }
    }
}

fn downcast<T: Any + Send + Sync>(key: &str, v: Value) -> Option<Arc<T>> {
    match v.downcast::<T>() {
        Ok(t) => Some(t),
        Err(_) => {
            warn!(key, "cache entry has unexpected type");
            None
        }
    }
}

/// In-flight marker for one key. Dropping it (also on panic) releases waiters.
struct Flight<'a> {
    cache: &'a ArtifactCache,
    key: &'a str,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.cache.state.lock().building.remove(self.key);
        self.cache.built.notify_all();
    }
}

/// Periodically sweep `cache` until it is dropped.
pub fn spawn_sweeper(cache: &Arc<ArtifactCache>, every: Duration) -> JoinHandle<()> {
    let weak: Weak<ArtifactCache> = Arc::downgrade(cache);
    std::thread::spawn(move || loop {
        std::thread::sleep(every);
        match weak.upgrade() {
            Some(c) => { c.sweep(); }
            None => break,
        }
    })
}

/// Cache stats for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub epoch: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "cache: {} entries, {} hits, {} misses, {} evictions, epoch {}",
               self.entries, self.hits, self.misses, self.evictions, self.epoch)
    }
}

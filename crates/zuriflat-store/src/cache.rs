//! Keyed read cache with request coalescing and a single transient retry.
//!
//! At most one request is in flight per key; later readers of the same key
//! attach to the pending result. Each in-flight request carries a generation
//! number, and only the generation still registered for its key may write
//! the result back. Invalidation drops the entry, so a detached request
//! still answers its own waiters but never repopulates the cache.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use zuriflat_core::CacheKey;
use zuriflat_sync::ApiError;

use crate::Freshness;

type Pending<T> = Shared<BoxFuture<'static, Result<T, ApiError>>>;

/// Stale entries kept per cache before the oldest are evicted.
const RETAINED_STALE: usize = 16;

struct Entry<T> {
    value: Option<(T, Instant)>,
    in_flight: Option<(u64, Pending<T>)>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            value: None,
            in_flight: None,
        }
    }
}

struct Entries<T> {
    map: HashMap<CacheKey, Entry<T>>,
    next_generation: u64,
}

impl<T> Entries<T> {
    /// Drop the oldest idle stale entries beyond [`RETAINED_STALE`], never `keep`.
    fn evict_stale(&mut self, keep: &CacheKey, freshness: Freshness, now: Instant) -> usize {
        let mut stale: Vec<(Option<Instant>, CacheKey)> = self
            .map
            .iter()
            .filter(|(key, entry)| *key != keep && entry.in_flight.is_none())
            .filter(|(_, entry)| {
                entry
                    .value
                    .as_ref()
                    .is_none_or(|(_, fetched_at)| !freshness.is_fresh(*fetched_at, now))
            })
            .map(|(key, entry)| (entry.value.as_ref().map(|(_, at)| *at), key.clone()))
            .collect();
        if stale.len() <= RETAINED_STALE {
            return 0;
        }
        stale.sort_by_key(|(fetched_at, _)| *fetched_at);
        let excess = stale.len() - RETAINED_STALE;
        for (_, key) in stale.into_iter().take(excess) {
            self.map.remove(&key);
        }
        excess
    }
}

pub struct QueryCache<T> {
    freshness: Freshness,
    entries: Mutex<Entries<T>>,
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(freshness: Freshness) -> Self {
        Self {
            freshness,
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `key` from cache while fresh, otherwise join or start a fetch.
    ///
    /// A transient failure is retried once before it reaches the caller.
    pub async fn get<F>(&self, key: &CacheKey, fetch: F) -> Result<T, ApiError>
    where
        F: Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync + 'static,
    {
        let (generation, pending) = {
            let mut entries = self.lock();
            let now = Instant::now();
            let generation = entries.next_generation;
            let entry = entries.map.entry(key.clone()).or_default();
            let fresh = entry
                .value
                .as_ref()
                .filter(|(_, fetched_at)| self.freshness.is_fresh(*fetched_at, now));
            if let Some((value, _)) = fresh {
                debug!(endpoint = %key, "cache hit");
                return Ok(value.clone());
            }
            if let Some((generation, pending)) = &entry.in_flight {
                debug!(endpoint = %key, "joining in-flight request");
                (*generation, pending.clone())
            } else {
                info!(endpoint = %key, "fetching");
                let pending = with_retry(key.to_string(), fetch).boxed().shared();
                entry.in_flight = Some((generation, pending.clone()));
                entries.next_generation += 1;
                (generation, pending)
            }
        };

        let result = pending.await;
        self.settle(key, generation, &result);
        result
    }

    fn settle(&self, key: &CacheKey, generation: u64, result: &Result<T, ApiError>) {
        let mut entries = self.lock();
        let Some(entry) = entries.map.get_mut(key) else {
            return;
        };
        if entry.in_flight.as_ref().map(|(g, _)| *g) != Some(generation) {
            return;
        }
        entry.in_flight = None;
        let now = Instant::now();
        match result {
            Ok(value) => entry.value = Some((value.clone(), now)),
            Err(err) => warn!(endpoint = %key, error = %err, "read failed"),
        }
        let evicted = entries.evict_stale(key, self.freshness, now);
        if evicted > 0 {
            debug!(endpoint = %key, evicted, "evicted stale entries");
        }
    }

    /// Last value stored for `key`, fresh or not.
    pub fn cached(&self, key: &CacheKey) -> Option<T> {
        self.lock()
            .map
            .get(key)
            .and_then(|e| e.value.as_ref())
            .map(|(v, _)| v.clone())
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.lock()
            .map
            .get(key)
            .is_some_and(|e| e.in_flight.is_some())
    }

    /// Drop every entry whose key matches, detaching any in-flight request.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_where(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        let mut entries = self.lock();
        let before = entries.map.len();
        entries.map.retain(|key, _| !matches(key));
        before - entries.map.len()
    }
}

async fn with_retry<T, F>(label: String, fetch: F) -> Result<T, ApiError>
where
    F: Fn() -> BoxFuture<'static, Result<T, ApiError>>,
{
    match fetch().await {
        Err(err) if err.is_transient() => {
            warn!(endpoint = %label, error = %err, "transient failure, retrying once");
            fetch().await
        }
        other => other,
    }
}

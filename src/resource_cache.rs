//! Keyed resource cache with request coalescing
//!
//! Resources (images, in this crate) are fetched through a [`Transport`],
//! decoded by a [`ResourceDecoder`] and kept in a bounded LRU table.
//!
//! - At most one network request per key is outstanding at any time. Callers
//!   that ask for a key while it is being fetched wait on the same shared
//!   outcome instead of issuing another request.
//! - The in-flight record is removed when the request settles, whatever the
//!   outcome, so a failed fetch never blocks later attempts.
//! - [`ResourceCache::cancel`] resolves every waiter to `None` and guarantees
//!   that the cancelled request can never write into the cache.
//!
//! The entry table and the in-flight table live behind a single mutex so that
//! "is it cached", "is it in flight", "was it cancelled" and the insert are
//! decided atomically with respect to each other.

use crate::config::CacheConfig;
use crate::error::Result;
use crate::http_fetch::Transport;
use crate::metrics::ClientMetrics;
use crate::models::CacheKey;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Turns a response body into a cacheable resource
pub trait ResourceDecoder: Send + Sync + 'static {
    /// The decoded resource handed out to callers
    type Resource: Clone + Send + Sync + 'static;

    /// Decode a response body
    fn decode(&self, body: Bytes) -> Result<Self::Resource>;

    /// Relative size of a resource, counted against the cost limit
    fn cost(&self, _resource: &Self::Resource) -> usize {
        1
    }
}

type SharedOutcome<R> = Shared<BoxFuture<'static, Option<R>>>;

struct CacheEntry<R> {
    resource: R,
    size_cost: usize,
    last_used: u64,
}

struct InFlightRequest<R> {
    id: u64,
    outcome: SharedOutcome<R>,
    cancel: CancellationToken,
}

struct CacheState<R> {
    entries: HashMap<CacheKey, CacheEntry<R>>,
    in_flight: HashMap<CacheKey, InFlightRequest<R>>,
    total_cost: usize,
    clock: u64,
    next_request_id: u64,
}

impl<R: Clone> CacheState<R> {
    fn new() -> Self {
        CacheState {
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            total_cost: 0,
            clock: 0,
            next_request_id: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up a resident entry and mark it as most recently used
    fn touch(&mut self, key: &CacheKey) -> Option<R> {
        let now = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_used = now;
        Some(entry.resource.clone())
    }

    fn remove(&mut self, key: &CacheKey) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_cost = self.total_cost.saturating_sub(entry.size_cost);
                true
            }
            None => false,
        }
    }

    fn evict_lru(&mut self) -> Option<CacheKey> {
        let key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())?;
        self.remove(&key);
        Some(key)
    }
}

/// Point-in-time view of the cache occupancy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub total_cost: usize,
    pub in_flight: usize,
}

struct CacheInner<D: ResourceDecoder> {
    transport: Arc<dyn Transport>,
    decoder: D,
    capacity: usize,
    total_cost_limit: Option<usize>,
    metrics: Arc<ClientMetrics>,
    state: Mutex<CacheState<D::Resource>>,
}

/// Shared handle to a coalescing resource cache
///
/// Cloning is cheap; all clones share the same tables.
pub struct ResourceCache<D: ResourceDecoder> {
    inner: Arc<CacheInner<D>>,
}

impl<D: ResourceDecoder> Clone for ResourceCache<D> {
    fn clone(&self) -> Self {
        ResourceCache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: ResourceDecoder> ResourceCache<D> {
    /// Create a cache holding at most `capacity` entries (0 is treated as 1)
    pub fn new(capacity: usize, transport: Arc<dyn Transport>, decoder: D) -> Self {
        Self::build(capacity, None, transport, decoder, Arc::new(ClientMetrics::new()))
    }

    /// Create a cache from configuration, reporting into shared metrics
    pub fn from_config(
        config: &CacheConfig,
        transport: Arc<dyn Transport>,
        decoder: D,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        Self::build(
            config.capacity,
            config.total_cost_limit,
            transport,
            decoder,
            metrics,
        )
    }

    fn build(
        capacity: usize,
        total_cost_limit: Option<usize>,
        transport: Arc<dyn Transport>,
        decoder: D,
        metrics: Arc<ClientMetrics>,
    ) -> Self {
        ResourceCache {
            inner: Arc::new(CacheInner {
                transport,
                decoder,
                capacity: capacity.max(1),
                total_cost_limit,
                metrics,
                state: Mutex::new(CacheState::new()),
            }),
        }
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.inner.metrics
    }

    /// Return the cached resource for `key`, if resident
    ///
    /// Never starts a fetch and never looks at in-flight requests.
    pub fn get(&self, key: &CacheKey) -> Option<D::Resource> {
        self.inner.state.lock().touch(key)
    }

    /// Return the resource for `key`, fetching it if necessary
    ///
    /// # Returns
    /// * `Some(resource)` from the cache, from a request already in flight, or
    ///   from a new request
    /// * `None` if the request failed, the body did not decode, or the fetch
    ///   was cancelled
    pub async fn fetch(&self, key: &CacheKey) -> Option<D::Resource> {
        let outcome = {
            let mut state = self.inner.state.lock();

            if let Some(resource) = state.touch(key) {
                debug!("Cache hit for {}", key);
                self.inner.metrics.record_cache_hit();
                return Some(resource);
            }

            let joined = state.in_flight.get(key).map(|request| request.outcome.clone());
            match joined {
                Some(outcome) => {
                    debug!("Joining in-flight fetch for {}", key);
                    self.inner.metrics.record_coalesced();
                    outcome
                }
                None => {
                    debug!("Cache miss for {}, starting fetch", key);
                    self.inner.metrics.record_cache_miss();
                    self.start_fetch(&mut state, key)
                }
            }
        };

        outcome.await
    }

    fn start_fetch(&self, state: &mut CacheState<D::Resource>, key: &CacheKey) -> SharedOutcome<D::Resource> {
        state.next_request_id += 1;
        let id = state.next_request_id;
        let cancel = CancellationToken::new();
        let (sender, receiver) = oneshot::channel();

        let outcome = receiver
            .map(|received| received.ok().flatten())
            .boxed()
            .shared();

        state.in_flight.insert(
            key.clone(),
            InFlightRequest {
                id,
                outcome: outcome.clone(),
                cancel: cancel.clone(),
            },
        );

        let inner = Arc::clone(&self.inner);
        let key = key.clone();
        tokio::spawn(async move {
            let loaded = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                loaded = AssertUnwindSafe(inner.load(&key)).catch_unwind() => match loaded {
                    Ok(loaded) => loaded,
                    Err(_) => {
                        warn!("Loading {} panicked, settling as failed", key);
                        inner.metrics.record_failed_resource_load();
                        None
                    }
                },
            };
            let settled = inner.settle(&key, id, &cancel, loaded);
            // Nobody waiting is fine
            let _ = sender.send(settled);
        });

        outcome
    }

    /// Cancel the in-flight fetch for `key`
    ///
    /// Every caller waiting on it receives `None` and its result is never
    /// cached. Returns whether a fetch was in flight.
    pub fn cancel(&self, key: &CacheKey) -> bool {
        let mut state = self.inner.state.lock();
        match state.in_flight.remove(key) {
            Some(request) => {
                request.cancel.cancel();
                self.inner.metrics.record_cancelled();
                debug!("Cancelled in-flight fetch for {}", key);
                true
            }
            None => false,
        }
    }

    /// Evict the resident entry for `key`
    ///
    /// A fetch that is in flight for the same key is not affected. Returns
    /// whether an entry was removed.
    pub fn clear(&self, key: &CacheKey) -> bool {
        let removed = self.inner.state.lock().remove(key);
        if removed {
            debug!("Cleared cache entry for {}", key);
        }
        removed
    }

    /// Evict every resident entry
    pub fn clear_all(&self) {
        let mut state = self.inner.state.lock();
        state.entries.clear();
        state.total_cost = 0;
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.inner.state.lock().in_flight.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.entries.len(),
            capacity: self.inner.capacity,
            total_cost: state.total_cost,
            in_flight: state.in_flight.len(),
        }
    }
}

impl<D: ResourceDecoder> CacheInner<D> {
    async fn load(&self, key: &CacheKey) -> Option<D::Resource> {
        let decoded = match self.transport.get(key.as_url()).await {
            Ok(body) => self.decoder.decode(body),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(resource) => Some(resource),
            Err(e) => {
                warn!("Failed to load resource {}: {}", key, e);
                self.metrics.record_failed_resource_load();
                None
            }
        }
    }

    /// Finish request `id` for `key`
    ///
    /// Runs under the state lock so that a concurrent `cancel` either happens
    /// entirely before (and the result is dropped) or entirely after (and
    /// there is nothing left to cancel).
    fn settle(
        &self,
        key: &CacheKey,
        id: u64,
        cancel: &CancellationToken,
        loaded: Option<D::Resource>,
    ) -> Option<D::Resource> {
        let mut state = self.state.lock();

        // cancel() already dropped the in-flight record; a newer request may own the key now
        if cancel.is_cancelled() {
            debug!("Discarding result of cancelled fetch for {}", key);
            return None;
        }

        if state.in_flight.get(key).is_some_and(|request| request.id == id) {
            state.in_flight.remove(key);
        }

        let resource = loaded?;
        let evicted = self.store(&mut state, key.clone(), resource.clone());
        if evicted > 0 {
            self.metrics.record_evictions(evicted);
        }
        Some(resource)
    }

    /// Insert a resource, evicting least recently used entries to make room
    ///
    /// Returns the number of evicted entries.
    fn store(&self, state: &mut CacheState<D::Resource>, key: CacheKey, resource: D::Resource) -> u64 {
        let size_cost = self.decoder.cost(&resource);
        if let Some(limit) = self.total_cost_limit {
            if size_cost > limit {
                debug!(
                    "Not caching {}: cost {} exceeds limit {}",
                    key, size_cost, limit
                );
                return 0;
            }
        }

        state.remove(&key);

        let mut evicted = 0;
        while state.entries.len() >= self.capacity
            || self
                .total_cost_limit
                .is_some_and(|limit| state.total_cost + size_cost > limit)
        {
            match state.evict_lru() {
                Some(old) => {
                    debug!("Evicted {} to make room for {}", old, key);
                    evicted += 1;
                }
                None => break,
            }
        }

        let last_used = state.tick();
        state.entries.insert(
            key,
            CacheEntry {
                resource,
                size_cost,
                last_used,
            },
        );
        state.total_cost += size_cost;
        evicted
    }
}

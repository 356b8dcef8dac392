// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory read-through cache with negative entries and request coalescing

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::debug;

use super::{AddressKey, CacheEntry, CacheStats, InvalidationTarget, Lookup, WriteSequence};
use crate::errors::FetchError;
use crate::types::Address;

type Outcome<V> = Result<Lookup<V>, FetchError>;
type SharedOutcome<V> = Shared<BoxFuture<'static, Outcome<V>>>;

enum Slot<V> {
    Resolved {
        lookup: Lookup<V>,
        written_at: Instant,
        seq: WriteSequence,
    },
    Pending {
        /// Identifies the computation so a late result cannot overwrite a newer one
        ticket: u64,
        outcome: SharedOutcome<V>,
    },
}

struct State<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// Resolved keys by write order, oldest first
    order: BTreeMap<WriteSequence, K>,
    /// Resolved keys by the address they name
    by_address: HashMap<Address, HashSet<K>>,
    stats: CacheStats,
    next_seq: WriteSequence,
    next_ticket: u64,
}

impl<K, V> State<K, V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            by_address: HashMap::new(),
            stats: CacheStats::default(),
            next_seq: WriteSequence::default(),
            next_ticket: 0,
        }
    }
}

impl<K, V> State<K, V>
where
    K: AddressKey + Eq + Hash + Clone,
{
    fn insert_resolved(&mut self, key: K, lookup: Lookup<V>) {
        let seq = self.next_seq;
        self.next_seq = seq.next();
        self.order.insert(seq, key.clone());
        self.by_address
            .entry(key.address())
            .or_default()
            .insert(key.clone());
        self.entries.insert(
            key,
            Slot::Resolved {
                lookup,
                written_at: Instant::now(),
                seq,
            },
        );
    }

    /// Removes the resolved entry for `key`. A pending entry stays.
    fn remove_resolved(&mut self, key: &K) -> bool {
        let seq = match self.entries.get(key) {
            Some(Slot::Resolved { seq, .. }) => *seq,
            _ => return false,
        };
        self.entries.remove(key);
        self.order.remove(&seq);
        let address = key.address();
        if let Some(keys) = self.by_address.get_mut(&address) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_address.remove(&address);
            }
        }
        true
    }

    /// Removes every resolved entry naming `address`
    fn remove_address(&mut self, address: &Address) -> usize {
        let Some(keys) = self.by_address.remove(address) else {
            return 0;
        };
        let mut removed = 0;
        for key in keys {
            if let Some(Slot::Resolved { seq, .. }) = self.entries.get(&key) {
                let seq = *seq;
                self.entries.remove(&key);
                self.order.remove(&seq);
                removed += 1;
            }
        }
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.by_address.clear();
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NegativeCacheConfig {
    max_entries: Option<usize>,
    ttl: Option<Duration>,
}

/// What a lookup found under the lock
enum Probe<V> {
    Hit(Lookup<V>),
    Join(SharedOutcome<V>),
    Expired,
    Miss,
}

/// Read-through cache that remembers absences and coalesces concurrent misses.
///
/// - A key is either missing, `Pending` (one computation in flight), or
///   resolved to [`Lookup::Present`] / [`Lookup::Absent`].
/// - Concurrent callers for a missing key share one computation and all
///   receive its result, error included.
/// - Errors are never cached; the next caller starts over.
/// - Computations run on their own task, so a caller that gives up does not
///   cancel the work other callers are waiting on.
/// - Invalidation removes resolved entries only. An in-flight computation is
///   left to finish and may populate the entry afterwards.
///
/// Cloning is cheap and every clone shares the same entries.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_market::cache::{Lookup, NegativeCache};
///
/// let cache: NegativeCache<Address, Collection> = NegativeCache::new("collections")
///     .with_max_entries(100_000);
///
/// let found = cache
///     .get_or_compute(address, || async move { load(address).await })
///     .await?;
/// cache.invalidate(&address);
/// ```
///
/// # Performance
///
/// - Lookup: O(1) average case
/// - Insert: O(log n), eviction included
/// - Address invalidation: proportional to the entries naming the touched
///   addresses, independent of the cache size
pub struct NegativeCache<K, V> {
    name: Arc<str>,
    config: NegativeCacheConfig,
    state: Arc<Mutex<State<K, V>>>,
}

impl<K, V> Clone for NegativeCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            config: self.config,
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, V> fmt::Debug for NegativeCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegativeCache")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("entries", &self.lock().entries.len())
            .finish()
    }
}

impl<K, V> NegativeCache<K, V> {
    fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        // A panic while holding the lock cannot leave the map half-written
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> NegativeCache<K, V>
where
    K: AddressKey + Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded cache without expiry
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            config: NegativeCacheConfig::default(),
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    /// Bounds the number of entries.
    ///
    /// When the bound is reached, the resolved entry written longest ago is
    /// evicted to make room. Pending entries are never evicted.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = Some(max_entries.max(1));
        self
    }

    /// Expires resolved entries this long after they were written.
    ///
    /// Expiry is a backstop; block-driven invalidation is what keeps entries
    /// fresh.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = Some(ttl);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cached answer for `key`, computing it at most once.
    ///
    /// `compute` is only invoked on a miss. Its future runs on a spawned task;
    /// callers arriving while it runs await the same result.
    ///
    /// # Errors
    ///
    /// Returns the computation's error to every caller that awaited it. A
    /// computation that panics is reported as [`FetchError::Aborted`].
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Outcome<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<V>> + Send + 'static,
    {
        let outcome = {
            let mut state = self.lock();
            let probe = match state.entries.get(&key) {
                Some(Slot::Resolved { written_at, .. }) if self.is_expired(*written_at) => {
                    Probe::Expired
                }
                Some(Slot::Resolved { lookup, .. }) => Probe::Hit(lookup.clone()),
                Some(Slot::Pending { outcome, .. }) => Probe::Join(outcome.clone()),
                None => Probe::Miss,
            };

            match probe {
                Probe::Hit(lookup) => {
                    state.stats.hits += 1;
                    debug!(cache = %self.name, key = ?key, "Cache hit");
                    return Ok(lookup);
                }
                Probe::Join(outcome) => {
                    state.stats.coalesced += 1;
                    debug!(cache = %self.name, key = ?key, "Joining in-flight computation");
                    outcome
                }
                Probe::Expired => {
                    debug!(cache = %self.name, key = ?key, "Cache entry expired");
                    state.remove_resolved(&key);
                    state.stats.expirations += 1;
                    self.start(&mut state, key, compute)
                }
                Probe::Miss => self.start(&mut state, key, compute),
            }
        };

        outcome.await
    }

    /// Registers a pending entry and spawns its computation. Called with the lock held.
    fn start<F, Fut>(&self, state: &mut State<K, V>, key: K, compute: F) -> SharedOutcome<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome<V>> + Send + 'static,
    {
        state.stats.misses += 1;
        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        debug!(cache = %self.name, key = ?key, "Cache miss");

        let computation = compute();
        let settling = self.clone();
        let settle_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(computation)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(FetchError::aborted("cached computation panicked")));
            settling.settle(settle_key, ticket, &outcome);
            outcome
        });

        let abandoning = self.clone();
        let abandon_key = key.clone();
        let outcome = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    abandoning.abandon(&abandon_key, ticket);
                    Err(FetchError::aborted(join_error.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        state.entries.insert(
            key,
            Slot::Pending {
                ticket,
                outcome: outcome.clone(),
            },
        );
        state.stats.entries = state.entries.len();
        outcome
    }

    /// Replaces the pending entry with the computation's result
    fn settle(&self, key: K, ticket: u64, outcome: &Outcome<V>) {
        let mut state = self.lock();
        let owned = matches!(
            state.entries.get(&key),
            Some(Slot::Pending { ticket: current, .. }) if *current == ticket
        );
        if !owned {
            // The cache was cleared while the computation ran
            debug!(cache = %self.name, key = ?key, "Discarding result of cleared computation");
            return;
        }

        state.entries.remove(&key);
        match outcome {
            Ok(lookup) => {
                self.make_room(&mut state);
                state.insert_resolved(key, lookup.clone());
            }
            Err(error) => {
                state.stats.failures += 1;
                debug!(cache = %self.name, key = ?key, error = %error, "Computation failed, nothing cached");
            }
        }
        state.stats.entries = state.entries.len();
    }

    fn abandon(&self, key: &K, ticket: u64) {
        let mut state = self.lock();
        if matches!(
            state.entries.get(key),
            Some(Slot::Pending { ticket: current, .. }) if *current == ticket
        ) {
            state.entries.remove(key);
            state.stats.failures += 1;
            state.stats.entries = state.entries.len();
        }
    }

    fn is_expired(&self, written_at: Instant) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| written_at.elapsed() >= ttl)
    }

    /// Drops expired entries, then the oldest writes, until one more entry fits
    fn make_room(&self, state: &mut State<K, V>) {
        let Some(max_entries) = self.config.max_entries else {
            return;
        };
        if state.entries.len() < max_entries {
            return;
        }

        // Writes are ordered by time, so expired entries are always the oldest
        while let Some((_, oldest)) = state.order.first_key_value() {
            let key = oldest.clone();
            let expired = matches!(
                state.entries.get(&key),
                Some(Slot::Resolved { written_at, .. }) if self.is_expired(*written_at)
            );
            if expired {
                state.remove_resolved(&key);
                state.stats.expirations += 1;
            } else if state.entries.len() >= max_entries {
                debug!(cache = %self.name, key = ?key, "Evicting oldest cache entry");
                state.remove_resolved(&key);
                state.stats.evictions += 1;
            } else {
                break;
            }
        }
    }

    /// Removes the resolved entry for `key`.
    ///
    /// Returns `false` when there was nothing resolved to remove. A pending
    /// computation for the key is left untouched.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut state = self.lock();
        if !state.remove_resolved(key) {
            return false;
        }
        state.stats.invalidations += 1;
        state.stats.entries = state.entries.len();
        debug!(cache = %self.name, key = ?key, "Invalidated cache entry");
        true
    }

    /// Removes every resolved entry whose key names one of `addresses`.
    ///
    /// Only the entries naming those addresses are visited. Returns how many
    /// were removed.
    pub fn invalidate_addresses<'a>(
        &self,
        addresses: impl IntoIterator<Item = &'a Address>,
    ) -> usize {
        let mut state = self.lock();
        let removed: usize = addresses
            .into_iter()
            .map(|address| state.remove_address(address))
            .sum();
        if removed > 0 {
            state.stats.invalidations += removed as u64;
            state.stats.entries = state.entries.len();
            debug!(cache = %self.name, entries = removed, "Invalidated touched entries");
        }
        removed
    }

    /// Removes every entry, pending ones included.
    ///
    /// Computations still running complete for their waiters but their
    /// results are not stored.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let removed = state.entries.len();
        state.clear();
        state.stats.invalidations += removed as u64;
        state.stats.entries = 0;
        debug!(cache = %self.name, entries = removed, "Cleared cache");
        removed
    }

    /// Reports what the cache holds for `key` without computing anything.
    ///
    /// Expired entries are reported as missing.
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        let state = self.lock();
        match state.entries.get(key)? {
            Slot::Resolved { written_at, .. } if self.is_expired(*written_at) => None,
            Slot::Resolved { lookup, .. } => Some(CacheEntry::from(lookup.clone())),
            Slot::Pending { .. } => Some(CacheEntry::Pending),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.entries.len();
        stats
    }
}

impl<K, V> InvalidationTarget for NegativeCache<K, V>
where
    K: AddressKey + Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invalidate_touched(&self, touched: &HashSet<Address>) -> usize {
        self.invalidate_addresses(touched)
    }

    fn invalidate_all(&self) -> usize {
        self.clear()
    }

    fn stats(&self) -> CacheStats {
        NegativeCache::stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use alloy_primitives::B256;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn key(byte: u8) -> Address {
        Address::new(0, B256::repeat_byte(byte))
    }

    fn counting(
        calls: &Arc<AtomicUsize>,
        lookup: Lookup<String>,
    ) -> impl FnOnce() -> BoxFuture<'static, Outcome<String>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(lookup)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit_computes_once() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_compute(key(1), counting(&calls, Lookup::Present("one".into())))
            .await
            .unwrap();
        let second = cache
            .get_or_compute(key(1), counting(&calls, Lookup::Present("other".into())))
            .await
            .unwrap();

        assert_eq!(first, Lookup::Present("one".to_string()));
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_absence_is_cached() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let found = cache
                .get_or_compute(key(9), counting(&calls, Lookup::Absent))
                .await
                .unwrap();
            assert!(found.is_absent());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&key(9)), Some(CacheEntry::Absent));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");

        let failed = cache
            .get_or_compute(key(1), || async {
                Err(FetchError::from(LedgerError::network(
                    "read_contract",
                    std::io::Error::other("connection reset"),
                )))
            })
            .await;
        assert!(matches!(failed, Err(FetchError::Ledger(_))));
        assert_eq!(cache.peek(&key(1)), None);

        let calls = Arc::new(AtomicUsize::new(0));
        let recovered = cache
            .get_or_compute(key(1), counting(&calls, Lookup::Present("back".into())))
            .await
            .unwrap();
        assert!(recovered.is_present());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_computation() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");
        let calls = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let leader = {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute(key(1), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = release_rx.await;
                        Ok(Lookup::Present("shared".to_string()))
                    })
                    .await
            })
        };

        while cache.peek(&key(1)) != Some(CacheEntry::Pending) {
            tokio::task::yield_now().await;
        }

        let follower = {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_compute(key(1), counting(&calls, Lookup::Present("second".into())))
                    .await
            })
        };

        while cache.stats().coalesced == 0 {
            tokio::task::yield_now().await;
        }
        release_tx.send(()).unwrap();

        let leader = leader.await.unwrap().unwrap();
        let follower = follower.await.unwrap().unwrap();
        assert_eq!(leader, Lookup::Present("shared".to_string()));
        assert_eq!(follower, leader);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_compute(key(1), counting(&calls, Lookup::Absent))
            .await
            .unwrap();
        assert!(cache.invalidate(&key(1)));
        assert!(!cache.invalidate(&key(1)));

        let found = cache
            .get_or_compute(key(1), counting(&calls, Lookup::Present("new".into())))
            .await
            .unwrap();
        assert_eq!(found, Lookup::Present("new".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[tokio::test]
    async fn test_invalidate_leaves_pending_computation() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(key(1), move || async move {
                        let _ = release_rx.await;
                        Ok(Lookup::Present("late".to_string()))
                    })
                    .await
            })
        };
        while cache.peek(&key(1)) != Some(CacheEntry::Pending) {
            tokio::task::yield_now().await;
        }

        assert!(!cache.invalidate(&key(1)));
        assert_eq!(cache.peek(&key(1)), Some(CacheEntry::Pending));

        release_tx.send(()).unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(
            cache.peek(&key(1)),
            Some(CacheEntry::Present("late".to_string()))
        );
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_result() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(key(1), move || async move {
                        let _ = release_rx.await;
                        Ok(Lookup::Present("stale".to_string()))
                    })
                    .await
            })
        };
        while cache.peek(&key(1)) != Some(CacheEntry::Pending) {
            tokio::task::yield_now().await;
        }

        assert_eq!(cache.clear(), 1);
        release_tx.send(()).unwrap();

        // The waiter still gets its answer, the cache does not keep it
        let answer = waiter.await.unwrap().unwrap();
        assert!(answer.is_present());
        assert_eq!(cache.peek(&key(1)), None);
    }

    #[tokio::test]
    async fn test_panicking_computation_is_aborted_and_not_cached() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test");

        let result = cache
            .get_or_compute(key(1), || async { panic!("contract decoder blew up") })
            .await;
        assert!(matches!(result, Err(FetchError::Aborted { .. })));
        assert_eq!(cache.peek(&key(1)), None);
    }

    #[tokio::test]
    async fn test_size_limit_evicts_oldest_write() {
        let cache: NegativeCache<Address, String> = NegativeCache::new("test").with_max_entries(3);
        let calls = Arc::new(AtomicUsize::new(0));

        for byte in 1..=3 {
            cache
                .get_or_compute(key(byte), counting(&calls, Lookup::Present(byte.to_string())))
                .await
                .unwrap();
        }
        // Reading key 1 does not refresh its write order
        cache
            .get_or_compute(key(1), counting(&calls, Lookup::Absent))
            .await
            .unwrap();

        cache
            .get_or_compute(key(4), counting(&calls, Lookup::Present("4".into())))
            .await
            .unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.evictions, 1);
        assert_eq!(cache.peek(&key(1)), None);
        assert!(cache.peek(&key(2)).is_some());
        assert!(cache.peek(&key(4)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expires_entries() {
        let cache: NegativeCache<Address, String> =
            NegativeCache::new("test").with_ttl(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_compute(key(1), counting(&calls, Lookup::Present("v1".into())))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cache.peek(&key(1)).is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.peek(&key(1)), None);

        let refreshed = cache
            .get_or_compute(key(1), counting(&calls, Lookup::Present("v2".into())))
            .await
            .unwrap();
        assert_eq!(refreshed, Lookup::Present("v2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test]
    async fn test_invalidate_touched_matches_addresses() {
        let a = key(0xa);
        let b = key(0xb);
        let cache: NegativeCache<(Address, u64), String> = NegativeCache::new("item_index");
        let calls = Arc::new(AtomicUsize::new(0));

        for key in [(a, 0), (a, 1), (b, 0)] {
            cache
                .get_or_compute(key, counting(&calls, Lookup::Absent))
                .await
                .unwrap();
        }

        let touched: HashSet<Address> = [a].into_iter().collect();
        assert_eq!(cache.invalidate_touched(&touched), 2);
        assert_eq!(cache.peek(&(a, 0)), None);
        assert_eq!(cache.peek(&(b, 0)), Some(CacheEntry::Absent));
        assert_eq!(cache.invalidate_touched(&HashSet::new()), 0);
    }

    static ADDRESS_READS: AtomicUsize = AtomicUsize::new(0);

    /// Counts every time the cache asks a key for its address
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct CountingKey(Address, u16);

    impl AddressKey for CountingKey {
        fn address(&self) -> Address {
            ADDRESS_READS.fetch_add(1, Ordering::SeqCst);
            self.0
        }
    }

    #[tokio::test]
    async fn test_invalidate_touched_visits_only_touched_keys() {
        let cache: NegativeCache<CountingKey, String> = NegativeCache::new("indexed");
        let calls = Arc::new(AtomicUsize::new(0));

        for n in 0..2_000u16 {
            let owner = key((n % 200) as u8);
            cache
                .get_or_compute(CountingKey(owner, n), counting(&calls, Lookup::Absent))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 2_000);
        ADDRESS_READS.store(0, Ordering::SeqCst);

        let untouched: HashSet<Address> = [key(0xfe)].into_iter().collect();
        assert_eq!(cache.invalidate_touched(&untouched), 0);

        let touched: HashSet<Address> = [key(7)].into_iter().collect();
        assert_eq!(cache.invalidate_touched(&touched), 10);
        assert_eq!(cache.len(), 1_990);
        assert_eq!(cache.peek(&CountingKey(key(7), 7)), None);
        assert_eq!(cache.peek(&CountingKey(key(8), 8)), Some(CacheEntry::Absent));

        // Neither call asked a single key for its address
        assert_eq!(ADDRESS_READS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_index_follows_eviction_and_invalidation() {
        let cache: NegativeCache<(Address, u64), String> =
            NegativeCache::new("item_index").with_max_entries(2);
        let calls = Arc::new(AtomicUsize::new(0));

        for index in 0..3 {
            cache
                .get_or_compute((key(1), index), counting(&calls, Lookup::Absent))
                .await
                .unwrap();
        }
        // (key(1), 0) was evicted, so only two entries remain to invalidate
        assert_eq!(cache.stats().evictions, 1);
        assert!(cache.invalidate(&(key(1), 2)));

        let touched: HashSet<Address> = [key(1)].into_iter().collect();
        assert_eq!(cache.invalidate_touched(&touched), 1);
        assert_eq!(cache.invalidate_touched(&touched), 0);
        assert!(cache.is_empty());
    }
}

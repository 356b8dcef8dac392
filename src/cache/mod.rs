// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Read-through caches with negative entries and address-driven invalidation
//!
//! Every repository keeps its ledger reads in a [`NegativeCache`]. The cache
//! remembers confirmed absences as well as values, runs at most one
//! computation per key at a time, and is emptied per address by the
//! [`Invalidator`](crate::Invalidator) whenever a block touches that address.
//!
//! # Examples
//!
//! ```rust,ignore
//! use ledger_market::cache::{Lookup, NegativeCache};
//! use std::time::Duration;
//!
//! let cache: NegativeCache<Address, String> = NegativeCache::new("collections")
//!     .with_max_entries(100_000)
//!     .with_ttl(Duration::from_secs(3600));
//!
//! let name = cache
//!     .get_or_compute(address, || async move { Ok(Lookup::Present(fetch(address).await?)) })
//!     .await?;
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Address, ContentPointer};

mod negative;
pub mod types;

pub use negative::NegativeCache;
pub use types::{CacheEntry, Lookup, WriteSequence};

/// Statistics about cache behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from a resolved entry
    pub hits: u64,
    /// Lookups that started a computation
    pub misses: u64,
    /// Lookups that joined a computation already in flight
    pub coalesced: u64,
    /// Computations that failed (never cached)
    pub failures: u64,
    /// Entries removed by the size bound
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by invalidation
    pub invalidations: u64,
    /// Current number of entries, pending ones included
    pub entries: usize,
}

impl CacheStats {
    /// Share of lookups served without a new computation, as a percentage (0.0 to 100.0)
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.coalesced;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            (served as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={}, misses={}, coalesced={}, failures={}, evictions={}, expirations={}, invalidations={}, entries={}, hit_rate={:.1}%",
            self.hits,
            self.misses,
            self.coalesced,
            self.failures,
            self.evictions,
            self.expirations,
            self.invalidations,
            self.entries,
            self.hit_rate()
        )
    }
}

/// Cache keys that name a ledger address.
///
/// A key is stale once a block touches its address. Caches index resolved
/// entries by this address so invalidation never scans unrelated keys.
pub trait AddressKey {
    fn address(&self) -> Address;
}

impl AddressKey for Address {
    fn address(&self) -> Address {
        *self
    }
}

/// `(collection, item index)`
impl AddressKey for (Address, u64) {
    fn address(&self) -> Address {
        self.0
    }
}

/// `(contract, content pointer)` for metadata resolved on behalf of a contract
impl AddressKey for (Address, ContentPointer) {
    fn address(&self) -> Address {
        self.0
    }
}

/// A cache the [`Invalidator`](crate::Invalidator) manages.
///
/// Object safe so caches with different key and value types can be
/// registered side by side.
pub trait InvalidationTarget: Send + Sync {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Removes every resolved entry whose key mentions a touched address.
    /// Returns the number of entries removed.
    fn invalidate_touched(&self, touched: &HashSet<Address>) -> usize;

    /// Removes every entry. Returns the number of entries removed.
    fn invalidate_all(&self) -> usize;

    fn stats(&self) -> CacheStats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn hit_rate_counts_coalesced_lookups() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            coalesced: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn address_keys_name_their_contract() {
        let a = Address::new(0, B256::repeat_byte(1));

        assert_eq!(a.address(), a);
        assert_eq!((a, 4u64).address(), a);
        assert_eq!((a, ContentPointer::Uri("ipfs://x".into())).address(), a);
    }
}

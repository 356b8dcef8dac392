// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Value types shared by the cache implementations
//!
//! - [`Lookup`]: a resolved answer, either a value or a confirmed absence
//! - [`CacheEntry`]: what a cache currently holds for a key, including in-flight work
//! - [`WriteSequence`]: monotonic write counter used to order entries for eviction

use serde::{Deserialize, Serialize};

/// A resolved cache answer.
///
/// `Absent` is a confirmed "does not exist" (or "not listed") and is cached
/// exactly like a value: repeated lookups of a missing address do not go back
/// to the ledger until that address is invalidated.
///
/// # Examples
///
/// ```
/// use ledger_market::cache::Lookup;
///
/// let found: Lookup<u32> = Some(7).into();
/// assert!(found.is_present());
/// assert_eq!(found.into_option(), Some(7));
///
/// let missing: Lookup<u32> = None.into();
/// assert!(missing.is_absent());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookup<V> {
    Present(V),
    Absent,
}

impl<V> Lookup<V> {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn into_option(self) -> Option<V> {
        match self {
            Lookup::Present(value) => Some(value),
            Lookup::Absent => None,
        }
    }

    pub fn as_ref(&self) -> Lookup<&V> {
        match self {
            Lookup::Present(value) => Lookup::Present(value),
            Lookup::Absent => Lookup::Absent,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Lookup<U> {
        match self {
            Lookup::Present(value) => Lookup::Present(f(value)),
            Lookup::Absent => Lookup::Absent,
        }
    }
}

impl<V> Lookup<Option<V>> {
    /// A present `None` is an absence too
    pub fn flatten(self) -> Lookup<V> {
        match self {
            Lookup::Present(Some(value)) => Lookup::Present(value),
            _ => Lookup::Absent,
        }
    }
}

impl<V> From<Option<V>> for Lookup<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(value) => Lookup::Present(value),
            None => Lookup::Absent,
        }
    }
}

/// Snapshot of what a cache holds for one key.
///
/// A key that has never been looked up (or was invalidated) has no entry at
/// all, which [`NegativeCache::peek`](super::NegativeCache::peek) reports as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry<V> {
    Present(V),
    Absent,
    /// A computation is running and every caller for the key awaits it.
    Pending,
}

impl<V> From<Lookup<V>> for CacheEntry<V> {
    fn from(lookup: Lookup<V>) -> Self {
        match lookup {
            Lookup::Present(value) => CacheEntry::Present(value),
            Lookup::Absent => CacheEntry::Absent,
        }
    }
}

/// Monotonic sequence number assigned to every resolved write
///
/// Lower sequence numbers were written earlier; the size bound evicts the
/// lowest one first.
///
/// # Examples
///
/// ```
/// use ledger_market::cache::WriteSequence;
///
/// let first = WriteSequence::default();
/// let second = first.next();
/// assert!(first < second);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct WriteSequence(u64);

impl WriteSequence {
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_from_option() {
        assert_eq!(Lookup::from(Some("x")), Lookup::Present("x"));
        assert_eq!(Lookup::<&str>::from(None), Lookup::Absent);
    }

    #[test]
    fn lookup_map_keeps_absence() {
        let absent: Lookup<u8> = Lookup::Absent;
        assert_eq!(absent.map(|v| v + 1), Lookup::Absent);
        assert_eq!(Lookup::Present(1u8).map(|v| v + 1), Lookup::Present(2));
    }

    #[test]
    fn lookup_flatten_treats_none_as_absent() {
        assert_eq!(Lookup::Present(Some(4u8)).flatten(), Lookup::Present(4));
        assert_eq!(Lookup::Present(None::<u8>).flatten(), Lookup::Absent);
        assert_eq!(Lookup::<Option<u8>>::Absent.flatten(), Lookup::Absent);
    }

    #[test]
    fn cache_entry_from_lookup() {
        assert_eq!(CacheEntry::from(Lookup::Present(3)), CacheEntry::Present(3));
        assert_eq!(CacheEntry::<u8>::from(Lookup::Absent), CacheEntry::Absent);
    }

    #[test]
    fn write_sequence_saturates() {
        let seq = WriteSequence(u64::MAX);
        assert_eq!(seq.next(), seq);
        assert_eq!(WriteSequence(5).next(), WriteSequence(6));
    }
}

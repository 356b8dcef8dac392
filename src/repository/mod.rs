// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Entity repositories: collections, items, sales and royalties.
//!
//! A repository answers "what does this address look like now" by composing
//! the [`ApprovalGate`], its [`NegativeCache`]s, the [`LedgerClient`] and the
//! [`MetadataFetcher`]. Every ledger read of one lookup is pinned to the
//! [`BlockRef`] taken from the [`ReferenceSnapshot`] when the lookup started.
//!
//! Outcomes, from the caller's point of view:
//!
//! - gate rejection, execution fault, missing contract or undecodable
//!   metadata: `Ok(None)`. Execution faults and bad metadata are cached as
//!   absent; gate rejections are not cached at all.
//! - network fault after retries: `Err(FetchError)` for this call only.
//!
//! Listings are lazy [`BoxStream`](futures::stream::BoxStream)s that skip
//! entities failing with a network fault, logging each skip.

use std::hash::Hash;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::approval::ApprovalGate;
use crate::cache::{AddressKey, Lookup, NegativeCache};
use crate::errors::{FetchError, LedgerError};
use crate::ledger::{ContractKind, ContractState, LedgerClient};
use crate::metadata::{self, MetadataFetcher};
use crate::snapshot::ReferenceSnapshot;
use crate::transport::RetryPolicy;
use crate::types::{Address, BlockRef, ContentPointer};

mod collection;
mod item;
pub mod pagination;
mod royalty;
mod sale;

pub use collection::CollectionRepository;
pub use item::ItemRepository;
pub use pagination::{drop_take, Page};
pub use royalty::RoyaltyRepository;
pub use sale::SaleRepository;

/// Converts decoded contract state into the contract a repository expects
pub(crate) type Convert<T> = fn(ContractState, Address) -> Result<T, LedgerError>;

/// Collaborators shared by every repository. Cloning is cheap.
#[derive(Clone)]
pub struct RepositoryContext {
    pub(crate) ledger: Arc<dyn LedgerClient>,
    pub(crate) metadata: Arc<dyn MetadataFetcher>,
    pub(crate) gate: ApprovalGate,
    pub(crate) snapshot: ReferenceSnapshot,
    pub(crate) retry: RetryPolicy,
}

impl std::fmt::Debug for RepositoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryContext")
            .field("snapshot", &self.snapshot)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RepositoryContext {
    /// `retry` applies to ledger reads; the metadata fetcher brings its own.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        metadata: Arc<dyn MetadataFetcher>,
        gate: ApprovalGate,
        snapshot: ReferenceSnapshot,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            metadata,
            gate,
            snapshot,
            retry,
        }
    }

    pub fn snapshot(&self) -> &ReferenceSnapshot {
        &self.snapshot
    }

    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    /// Reads the contract at `address` through `cache`.
    ///
    /// Execution faults become a cached absence; network faults are returned
    /// and leave the cache untouched.
    pub(crate) async fn contract<T>(
        &self,
        cache: &NegativeCache<Address, T>,
        address: Address,
        kind: ContractKind,
        at: BlockRef,
        convert: Convert<T>,
    ) -> Result<Option<T>, FetchError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let retry = self.retry.clone();
        cache
            .get_or_compute(address, move || async move {
                debug!(address = %address, kind = %kind, seqno = at.seqno(), "Fetching contract");
                let read = retry
                    .run("read contract", || ledger.read_contract(address, kind, at))
                    .await
                    .and_then(|state| convert(state, address));
                absent_on_execution_fault(address, "read contract", read)
            })
            .await
            .map(Lookup::into_option)
    }

    /// Loads and decodes the document at `pointer` through `cache`.
    pub(crate) async fn document<K, T>(
        &self,
        cache: &NegativeCache<K, T>,
        key: K,
        pointer: ContentPointer,
    ) -> Result<Option<T>, FetchError>
    where
        K: AddressKey + Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let fetcher = Arc::clone(&self.metadata);
        cache
            .get_or_compute(key, move || async move {
                load_document(fetcher.as_ref(), &pointer).await
            })
            .await
            .map(Lookup::into_option)
    }
}

/// Settles a ledger read for caching: execution faults are a negative
/// result, anything else that failed is an error.
pub(crate) fn absent_on_execution_fault<T>(
    address: Address,
    operation: &'static str,
    read: Result<T, LedgerError>,
) -> Result<Lookup<T>, FetchError> {
    match read {
        Ok(value) => Ok(Lookup::Present(value)),
        Err(error) if error.is_execution_fault() => {
            warn!(address = %address, operation, error = %error, "Ledger rejected read, caching absence");
            Ok(Lookup::Absent)
        }
        Err(error) => Err(error.into()),
    }
}

/// Fetches and decodes a metadata document.
///
/// Documents that cannot be located or decoded are a negative result;
/// retryable failures are errors.
pub(crate) async fn load_document<T: DeserializeOwned>(
    fetcher: &dyn MetadataFetcher,
    pointer: &ContentPointer,
) -> Result<Lookup<T>, FetchError> {
    let decoded = match fetcher.fetch(pointer).await {
        Ok(document) => metadata::decode(pointer, document),
        Err(error) => Err(error),
    };
    match decoded {
        Ok(document) => Ok(Lookup::Present(document)),
        Err(error) if error.is_retryable() => Err(error.into()),
        Err(error) => {
            warn!(pointer = %pointer, error = %error, "Unusable metadata, caching absence");
            Ok(Lookup::Absent)
        }
    }
}

/// Unwraps a listing element, logging and skipping network failures
pub(crate) fn skip_failed<T>(
    entity: &'static str,
    address: Address,
    result: Result<Option<T>, FetchError>,
) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(error) => {
            warn!(entity, address = %address, error = %error, "Skipping entity in listing");
            None
        }
    }
}

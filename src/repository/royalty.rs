// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::Instrument;

use super::RepositoryContext;
use crate::cache::{InvalidationTarget, NegativeCache};
use crate::config::CacheLimits;
use crate::errors::FetchError;
use crate::ledger::{ContractKind, ContractState, RoyaltyContract};
use crate::spans;
use crate::types::{Address, BlockRef};

/// Royalty parameters reported by collections and standalone items.
///
/// Not gated; see [`ItemRepository::royalty_of`](super::ItemRepository::royalty_of)
/// for the admitted entry point.
#[derive(Debug, Clone)]
pub struct RoyaltyRepository {
    context: RepositoryContext,
    contracts: NegativeCache<Address, RoyaltyContract>,
}

impl RoyaltyRepository {
    pub fn new(context: RepositoryContext, caches: &CacheLimits) -> Self {
        Self {
            context,
            contracts: NegativeCache::new("royalty_contracts").with_max_entries(caches.max_entries),
        }
    }

    /// Royalty parameters reported by the contract at `address`, if any.
    pub async fn get(&self, address: Address) -> Result<Option<RoyaltyContract>, FetchError> {
        self.load(address, self.context.snapshot.current()).await
    }

    pub(crate) async fn load(
        &self,
        address: Address,
        at: BlockRef,
    ) -> Result<Option<RoyaltyContract>, FetchError> {
        self.context
            .contract(
                &self.contracts,
                address,
                ContractKind::Royalty,
                at,
                ContractState::into_royalty,
            )
            .instrument(spans::repository_get("royalty", address))
            .await
    }

    pub fn caches(&self) -> Vec<Arc<dyn InvalidationTarget>> {
        vec![Arc::new(self.contracts.clone())]
    }
}

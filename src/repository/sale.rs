// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::Instrument;

use super::RepositoryContext;
use crate::cache::{InvalidationTarget, NegativeCache};
use crate::config::CacheLimits;
use crate::errors::FetchError;
use crate::ledger::{ContractKind, ContractState, SaleContract};
use crate::spans;
use crate::types::{Address, BlockRef};

/// Sale contracts, reached through the current owner of an item.
///
/// Not gated: a sale is only ever read on behalf of an item that was.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    context: RepositoryContext,
    contracts: NegativeCache<Address, SaleContract>,
}

impl SaleRepository {
    pub fn new(context: RepositoryContext, caches: &CacheLimits) -> Self {
        Self {
            context,
            contracts: NegativeCache::new("sale_contracts").with_max_entries(caches.max_entries),
        }
    }

    /// The sale contract at `address`, if it is one.
    pub async fn get(&self, address: Address) -> Result<Option<SaleContract>, FetchError> {
        self.load(address, self.context.snapshot.current()).await
    }

    pub(crate) async fn load(
        &self,
        address: Address,
        at: BlockRef,
    ) -> Result<Option<SaleContract>, FetchError> {
        self.context
            .contract(
                &self.contracts,
                address,
                ContractKind::Sale,
                at,
                ContractState::into_sale,
            )
            .instrument(spans::repository_get("sale", address))
            .await
    }

    pub fn caches(&self) -> Vec<Arc<dyn InvalidationTarget>> {
        vec![Arc::new(self.contracts.clone())]
    }
}

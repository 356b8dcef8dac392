// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Ledger query client interface.
//!
//! The client that decodes raw contract state is an external collaborator;
//! this module only fixes the contract the caching layer relies on. Every
//! state read is pinned to an explicit [`BlockRef`] so that one logical
//! operation can read several related accounts from the same ledger state.

mod contracts;

pub use contracts::{
    CollectionContract, ContractKind, ContractState, ItemContract, RoyaltyContract, SaleContract,
};

use async_trait::async_trait;

use crate::errors::LedgerError;
use crate::types::{Address, Block, BlockRef, ContentPointer};

/// Reads decoded contract state from the ledger.
///
/// Implementations must be cheap to share (`Arc<dyn LedgerClient>`) and safe
/// to call concurrently.
///
/// Errors: [`LedgerError::Execution`] when the account is not the expected
/// contract or execution reverted; [`LedgerError::Network`] on transient
/// connectivity failures. Implementations should not retry internally; the
/// caller applies its own retry policy.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Latest finalized block
    async fn head_block(&self) -> Result<BlockRef, LedgerError>;

    /// Decodes the contract stored at `address` as of `at`
    async fn read_contract(
        &self,
        address: Address,
        kind: ContractKind,
        at: BlockRef,
    ) -> Result<ContractState, LedgerError>;

    /// The block with sequence number `seqno + 1`, waiting until it is finalized
    async fn next_block_after(&self, seqno: u64) -> Result<Block, LedgerError>;

    /// Collection get-method: address of the item with `index`
    async fn item_address(
        &self,
        collection: Address,
        index: u64,
        at: BlockRef,
    ) -> Result<Option<Address>, LedgerError>;

    /// Collection get-method: full content of an item, combining the
    /// collection's common content with the item's individual content
    async fn item_content(
        &self,
        collection: Address,
        index: u64,
        individual_content: ContentPointer,
        at: BlockRef,
    ) -> Result<ContentPointer, LedgerError>;
}

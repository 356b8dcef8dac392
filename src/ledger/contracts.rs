// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Decoded contract states.

use std::fmt;

use crate::errors::LedgerError;
use crate::types::{Address, ContentPointer};

/// The contract types the marketplace reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Collection,
    Item,
    Sale,
    Royalty,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::Collection => "collection",
            ContractKind::Item => "item",
            ContractKind::Sale => "sale",
            ContractKind::Royalty => "royalty",
        };
        f.write_str(name)
    }
}

/// NFT collection contract data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionContract {
    /// Number of items deployed so far; items are indexed `0..next_item_index`
    pub next_item_index: u64,
    pub content: ContentPointer,
    pub owner: Option<Address>,
}

/// NFT item contract data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemContract {
    pub index: u64,
    /// Owning collection, `None` for standalone items
    pub collection: Option<Address>,
    /// Current owner; a sale contract while the item is listed
    pub owner: Option<Address>,
    pub individual_content: ContentPointer,
}

/// Fixed-price sale contract data (amounts in nano units)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleContract {
    /// Marketplace the sale was created for
    pub marketplace: Address,
    pub nft: Address,
    /// Seller
    pub owner: Address,
    pub full_price: u128,
    pub marketplace_fee: u128,
    pub royalty_destination: Address,
    pub royalty_amount: u128,
}

/// Royalty parameters reported by a collection (or a standalone item)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoyaltyContract {
    pub numerator: u16,
    pub denominator: u16,
    pub destination: Address,
}

/// Contract state decoded by the ledger client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractState {
    Collection(CollectionContract),
    Item(ItemContract),
    Sale(SaleContract),
    Royalty(RoyaltyContract),
}

impl ContractState {
    pub fn kind(&self) -> ContractKind {
        match self {
            ContractState::Collection(_) => ContractKind::Collection,
            ContractState::Item(_) => ContractKind::Item,
            ContractState::Sale(_) => ContractKind::Sale,
            ContractState::Royalty(_) => ContractKind::Royalty,
        }
    }

    fn unexpected(&self, address: Address, expected: ContractKind) -> LedgerError {
        LedgerError::UnexpectedContract {
            address,
            expected,
            found: self.kind(),
        }
    }

    pub fn into_collection(self, address: Address) -> Result<CollectionContract, LedgerError> {
        match self {
            ContractState::Collection(contract) => Ok(contract),
            other => Err(other.unexpected(address, ContractKind::Collection)),
        }
    }

    pub fn into_item(self, address: Address) -> Result<ItemContract, LedgerError> {
        match self {
            ContractState::Item(contract) => Ok(contract),
            other => Err(other.unexpected(address, ContractKind::Item)),
        }
    }

    pub fn into_sale(self, address: Address) -> Result<SaleContract, LedgerError> {
        match self {
            ContractState::Sale(contract) => Ok(contract),
            other => Err(other.unexpected(address, ContractKind::Sale)),
        }
    }

    pub fn into_royalty(self, address: Address) -> Result<RoyaltyContract, LedgerError> {
        match self {
            ContractState::Royalty(contract) => Ok(contract),
            other => Err(other.unexpected(address, ContractKind::Royalty)),
        }
    }
}

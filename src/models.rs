// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Read models served by the marketplace API.
//!
//! Models serialize to camelCase JSON. Ledger amounts are nano units and
//! serialize as decimal strings so no client loses precision.

use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, Zero};
use serde::{Serialize, Serializer};

use crate::types::Address;

fn amount_as_string<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

/// `numerator / denominator`, or zero when the denominator is zero
pub(crate) fn ratio(numerator: u64, denominator: u64) -> BigDecimal {
    if denominator == 0 {
        return BigDecimal::zero();
    }
    BigDecimal::from(numerator) / BigDecimal::from(denominator)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageModel {
    pub original: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionModel {
    pub address: Address,
    pub number_of_items: u64,
    pub owner: Option<Address>,
    pub name: String,
    pub description: String,
    pub image: ImageModel,
    /// Falls back to `image` when the collection has no cover
    pub cover_image: ImageModel,
}

/// Fields every item shows, for sale or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    pub address: Address,
    pub index: u64,
    pub collection: Option<CollectionModel>,
    /// The seller while the item is on sale here, the holder otherwise
    pub owner: Option<Address>,
    pub name: String,
    pub description: String,
    pub image: ImageModel,
    pub attributes: BTreeMap<String, String>,
}

/// An item that is not on sale at this marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdinaryItemModel {
    #[serde(flatten)]
    pub details: ItemDetails,
    /// Royalty share, `0` when the item has none
    pub royalty_value: BigDecimal,
    /// This marketplace's service fee share
    pub marketplace_fee_value: BigDecimal,
    #[serde(serialize_with = "amount_as_string")]
    pub sale_initialization_fee: u128,
    #[serde(serialize_with = "amount_as_string")]
    pub transfer_fee: u128,
    #[serde(serialize_with = "amount_as_string")]
    pub network_fee: u128,
}

/// An item listed for sale at this marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemModel {
    #[serde(flatten)]
    pub details: ItemDetails,
    /// The sale contract currently holding the item
    pub sale: Address,
    pub marketplace: Address,
    #[serde(serialize_with = "amount_as_string")]
    pub full_price: u128,
    #[serde(serialize_with = "amount_as_string")]
    pub marketplace_fee: u128,
    #[serde(serialize_with = "amount_as_string")]
    pub royalties: u128,
    pub royalty_destination: Address,
    #[serde(serialize_with = "amount_as_string")]
    pub network_fee: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemModel {
    Ordinary(OrdinaryItemModel),
    Sale(SaleItemModel),
}

impl ItemModel {
    pub fn details(&self) -> &ItemDetails {
        match self {
            ItemModel::Ordinary(item) => &item.details,
            ItemModel::Sale(item) => &item.details,
        }
    }

    pub fn address(&self) -> Address {
        self.details().address
    }

    pub fn owner(&self) -> Option<Address> {
        self.details().owner
    }

    pub fn collection(&self) -> Option<&CollectionModel> {
        self.details().collection.as_ref()
    }

    pub fn is_on_sale(&self) -> bool {
        matches!(self, ItemModel::Sale(_))
    }
}

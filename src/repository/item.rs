// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use futures::future;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

use super::{
    absent_on_execution_fault, drop_take, load_document, skip_failed, CollectionRepository, Page,
    RepositoryContext, RoyaltyRepository, SaleRepository,
};
use crate::cache::{InvalidationTarget, Lookup, NegativeCache};
use crate::config::constants::UNNAMED_ITEM_PREFIX;
use crate::config::{FeeSchedule, MarketplaceConfig, PageLimits};
use crate::errors::FetchError;
use crate::ledger::{ContractKind, ContractState, ItemContract, RoyaltyContract};
use crate::metadata::ItemMetadata;
use crate::models::{
    ratio, ImageModel, ItemDetails, ItemModel, OrdinaryItemModel, SaleItemModel,
};
use crate::spans;
use crate::types::{Address, BlockRef, ContentPointer};

/// Items, composed with their collection, active sale and royalty terms.
///
/// An item held by a sale contract of this marketplace is shown as a
/// [`SaleItemModel`]. Any other item, including one listed on a different
/// marketplace, is an [`OrdinaryItemModel`] with this marketplace's fees.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    context: RepositoryContext,
    marketplace: Address,
    fees: FeeSchedule,
    pages: PageLimits,
    collections: CollectionRepository,
    sales: SaleRepository,
    royalties: RoyaltyRepository,
    contracts: NegativeCache<Address, ItemContract>,
    /// Keyed by the item's own content; the full document location may also
    /// depend on the collection
    metadata: NegativeCache<(Address, ContentPointer), ItemMetadata>,
}

impl ItemRepository {
    pub fn new(
        context: RepositoryContext,
        config: &MarketplaceConfig,
        collections: CollectionRepository,
        sales: SaleRepository,
        royalties: RoyaltyRepository,
    ) -> Self {
        Self {
            context,
            marketplace: config.marketplace,
            fees: config.fees.clone(),
            pages: config.pages,
            collections,
            sales,
            royalties,
            contracts: NegativeCache::new("item_contracts")
                .with_max_entries(config.caches.max_entries),
            metadata: NegativeCache::new("item_metadata")
                .with_max_entries(config.caches.max_entries),
        }
    }

    /// The item at `address`, if it is allowed and readable.
    pub async fn get(&self, address: Address) -> Result<Option<ItemModel>, FetchError> {
        async move {
            if !self.context.gate.is_allowed(address).await {
                return Ok(None);
            }
            self.load(address, self.context.snapshot.current()).await
        }
        .instrument(spans::repository_get("item", address))
        .await
    }

    async fn load(&self, address: Address, at: BlockRef) -> Result<Option<ItemModel>, FetchError> {
        let Some(contract) = self.contract(address, at).await? else {
            return Ok(None);
        };
        let Some(metadata) = self.metadata(address, &contract, at).await? else {
            debug!(address = %address, "Item has no usable metadata");
            return Ok(None);
        };

        let collection = match contract.collection {
            Some(collection) => self.collections.load(collection, at).await?,
            None => None,
        };
        let listing = match contract.owner {
            Some(holder) => self
                .sales
                .load(holder, at)
                .await?
                .filter(|sale| sale.marketplace == self.marketplace)
                .map(|sale| (holder, sale)),
            None => None,
        };

        let details = ItemDetails {
            address,
            index: contract.index,
            collection,
            owner: contract.owner,
            name: metadata
                .name
                .clone()
                .unwrap_or_else(|| format!("{UNNAMED_ITEM_PREFIX} {}", contract.index)),
            description: metadata.description.clone().unwrap_or_default(),
            image: ImageModel {
                original: metadata.image.clone(),
            },
            attributes: metadata.attribute_map(),
        };

        let model = match listing {
            Some((sale_address, sale)) => ItemModel::Sale(SaleItemModel {
                details: ItemDetails {
                    owner: Some(sale.owner),
                    ..details
                },
                sale: sale_address,
                marketplace: sale.marketplace,
                full_price: sale.full_price,
                marketplace_fee: sale.marketplace_fee,
                royalties: sale.royalty_amount,
                royalty_destination: sale.royalty_destination,
                network_fee: self.fees.network_fee,
            }),
            None => {
                let royalty = self.royalty_at(address, &contract, at).await?;
                ItemModel::Ordinary(OrdinaryItemModel {
                    details,
                    royalty_value: royalty.map_or_else(BigDecimal::zero, |royalty| {
                        ratio(royalty.numerator.into(), royalty.denominator.into())
                    }),
                    marketplace_fee_value: ratio(
                        self.fees.service_fee_numerator.into(),
                        self.fees.service_fee_denominator.into(),
                    ),
                    sale_initialization_fee: self.fees.sale_fee,
                    transfer_fee: self.fees.transfer_fee,
                    network_fee: self.fees.network_fee,
                })
            }
        };
        Ok(Some(model))
    }

    async fn contract(
        &self,
        address: Address,
        at: BlockRef,
    ) -> Result<Option<ItemContract>, FetchError> {
        self.context
            .contract(
                &self.contracts,
                address,
                ContractKind::Item,
                at,
                ContractState::into_item,
            )
            .await
    }

    /// Collection items take their full content from the collection; a
    /// standalone item's individual content is the whole document location.
    async fn metadata(
        &self,
        address: Address,
        contract: &ItemContract,
        at: BlockRef,
    ) -> Result<Option<ItemMetadata>, FetchError> {
        let Some(collection) = contract.collection else {
            let pointer = contract.individual_content.clone();
            return self
                .context
                .document(&self.metadata, (address, pointer.clone()), pointer)
                .await;
        };

        let ledger = Arc::clone(&self.context.ledger);
        let fetcher = Arc::clone(&self.context.metadata);
        let retry = self.context.retry.clone();
        let index = contract.index;
        let individual = contract.individual_content.clone();
        self.metadata
            .get_or_compute((address, individual.clone()), move || async move {
                let read = retry
                    .run("item content", || {
                        ledger.item_content(collection, index, individual.clone(), at)
                    })
                    .await;
                match absent_on_execution_fault(collection, "item content", read)? {
                    Lookup::Present(pointer) => load_document(fetcher.as_ref(), &pointer).await,
                    Lookup::Absent => Ok(Lookup::Absent),
                }
            })
            .await
            .map(Lookup::into_option)
    }

    /// Collection royalty, else the item's own
    async fn royalty_at(
        &self,
        address: Address,
        contract: &ItemContract,
        at: BlockRef,
    ) -> Result<Option<RoyaltyContract>, FetchError> {
        if let Some(collection) = contract.collection {
            if let Some(royalty) = self.royalties.load(collection, at).await? {
                return Ok(Some(royalty));
            }
        }
        self.royalties.load(address, at).await
    }

    /// Royalty terms that apply to `item`: its collection's, or for a
    /// standalone item (or a collection reporting none) its own.
    pub async fn royalty_of(&self, item: Address) -> Result<Option<RoyaltyContract>, FetchError> {
        if !self.context.gate.is_allowed(item).await {
            return Ok(None);
        }
        let at = self.context.snapshot.current();
        let Some(contract) = self.contract(item, at).await? else {
            return Ok(None);
        };
        self.royalty_at(item, &contract, at).await
    }

    /// Items of every listed collection, then explicitly approved standalone
    /// items. Each address is listed once.
    pub fn all(&self) -> BoxStream<'static, ItemModel> {
        let collections = self.collections.clone();
        let collection_items = self
            .collections
            .all()
            .flat_map(move |collection| collections.items_of(collection.address))
            .filter_map(|(_, address)| future::ready(address));

        let gate = self.context.gate.clone();
        let standalone = stream::once(async move { gate.approved().await }).flat_map(stream::iter);

        let mut seen = HashSet::new();
        self.resolve_each(
            collection_items
                .chain(standalone)
                .filter(move |address| future::ready(seen.insert(*address)))
                .boxed(),
        )
    }

    /// Items of `collection` in index order.
    pub fn by_collection(&self, collection: Address) -> BoxStream<'static, ItemModel> {
        self.resolve_each(
            self.collections
                .items_of(collection)
                .filter_map(|(_, address)| future::ready(address))
                .boxed(),
        )
    }

    /// Items of [`all`](Self::all) currently owned by `owner`; a listed item
    /// is owned by its seller.
    pub fn by_owner(&self, owner: Address) -> BoxStream<'static, ItemModel> {
        self.all()
            .filter(move |item| future::ready(item.owner() == Some(owner)))
            .boxed()
    }

    fn resolve_each(&self, addresses: BoxStream<'static, Address>) -> BoxStream<'static, ItemModel> {
        let repository = self.clone();
        addresses
            .then(move |address| {
                let repository = repository.clone();
                async move { skip_failed("item", address, repository.get(address).await) }
            })
            .filter_map(future::ready)
            .boxed()
    }

    /// One page of [`all`](Self::all), or of [`by_owner`](Self::by_owner)
    /// when an owner is given.
    pub async fn page(&self, page: Page, owner: Option<Address>) -> Vec<ItemModel> {
        let listing = match owner {
            Some(owner) => self.by_owner(owner),
            None => self.all(),
        };
        drop_take(listing, page, self.pages).collect().await
    }

    /// Resolves every listed item once in the background.
    pub fn warm_up(&self) -> JoinHandle<()> {
        let listing = self.all();
        tokio::spawn(
            async move {
                let primed = listing.count().await;
                info!(primed, "Item caches primed");
            }
            .instrument(spans::warm_up("item")),
        )
    }

    pub fn collections(&self) -> &CollectionRepository {
        &self.collections
    }

    pub fn caches(&self) -> Vec<Arc<dyn InvalidationTarget>> {
        vec![
            Arc::new(self.contracts.clone()),
            Arc::new(self.metadata.clone()),
        ]
    }
}

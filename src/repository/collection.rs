// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use super::{absent_on_execution_fault, drop_take, skip_failed, Page, RepositoryContext};
use crate::cache::{InvalidationTarget, Lookup, NegativeCache};
use crate::config::constants::UNTITLED_COLLECTION;
use crate::config::{CacheLimits, PageLimits};
use crate::errors::FetchError;
use crate::ledger::{CollectionContract, ContractKind, ContractState};
use crate::metadata::CollectionMetadata;
use crate::models::{CollectionModel, ImageModel};
use crate::spans;
use crate::types::{Address, BlockRef, ContentPointer};

/// Collections and the item index of each collection.
///
/// Caches, all bounded by [`CacheLimits::max_entries`]:
///
/// - `collection_contracts`: collection address to contract data
/// - `collection_metadata`: `(collection, content)` to metadata document
/// - `collection_item_index`: `(collection, index)` to item address, with
///   [`CacheLimits::item_index_ttl`] as a staleness backstop
#[derive(Debug, Clone)]
pub struct CollectionRepository {
    context: RepositoryContext,
    pages: PageLimits,
    contracts: NegativeCache<Address, CollectionContract>,
    metadata: NegativeCache<(Address, ContentPointer), CollectionMetadata>,
    item_index: NegativeCache<(Address, u64), Address>,
}

impl CollectionRepository {
    pub fn new(context: RepositoryContext, caches: &CacheLimits, pages: PageLimits) -> Self {
        Self {
            context,
            pages,
            contracts: NegativeCache::new("collection_contracts")
                .with_max_entries(caches.max_entries),
            metadata: NegativeCache::new("collection_metadata")
                .with_max_entries(caches.max_entries),
            item_index: NegativeCache::new("collection_item_index")
                .with_max_entries(caches.max_entries)
                .with_ttl(caches.item_index_ttl),
        }
    }

    /// The collection at `address`, if it is allowed and readable.
    pub async fn get(&self, address: Address) -> Result<Option<CollectionModel>, FetchError> {
        async move {
            if !self.context.gate.is_allowed(address).await {
                return Ok(None);
            }
            self.load(address, self.context.snapshot.current()).await
        }
        .instrument(spans::repository_get("collection", address))
        .await
    }

    /// Resolves the collection without consulting the gate.
    ///
    /// Used when the collection is reached through an item that was already
    /// admitted.
    pub(crate) async fn load(
        &self,
        address: Address,
        at: BlockRef,
    ) -> Result<Option<CollectionModel>, FetchError> {
        let Some(contract) = self.contract(address, at).await? else {
            return Ok(None);
        };
        let Some(metadata) = self
            .context
            .document(
                &self.metadata,
                (address, contract.content.clone()),
                contract.content.clone(),
            )
            .await?
        else {
            debug!(address = %address, "Collection has no usable metadata");
            return Ok(None);
        };

        Ok(Some(CollectionModel {
            address,
            number_of_items: contract.next_item_index,
            owner: contract.owner,
            name: metadata
                .name
                .unwrap_or_else(|| UNTITLED_COLLECTION.to_string()),
            description: metadata.description.unwrap_or_default(),
            image: ImageModel {
                original: metadata.image.clone(),
            },
            cover_image: ImageModel {
                original: metadata.cover_image.or(metadata.image),
            },
        }))
    }

    async fn contract(
        &self,
        address: Address,
        at: BlockRef,
    ) -> Result<Option<CollectionContract>, FetchError> {
        self.context
            .contract(
                &self.contracts,
                address,
                ContractKind::Collection,
                at,
                ContractState::into_collection,
            )
            .await
    }

    /// Address of the item with `index` in `collection`.
    pub async fn item_address(
        &self,
        collection: Address,
        index: u64,
    ) -> Result<Option<Address>, FetchError> {
        async move {
            if !self.context.gate.is_allowed(collection).await {
                return Ok(None);
            }
            let at = self.context.snapshot.current();
            let ledger = Arc::clone(&self.context.ledger);
            let retry = self.context.retry.clone();
            self.item_index
                .get_or_compute((collection, index), move || async move {
                    let read = retry
                        .run("item address", || ledger.item_address(collection, index, at))
                        .await;
                    absent_on_execution_fault(collection, "item address", read)
                        .map(Lookup::flatten)
                })
                .await
                .map(Lookup::into_option)
        }
        .instrument(spans::item_address(collection, index))
        .await
    }

    /// Every index of `collection` paired with its item address, in index
    /// order. Lazy: each address is resolved when the stream reaches it.
    ///
    /// Indexes whose address cannot be resolved yield `None`.
    pub fn items_of(&self, collection: Address) -> BoxStream<'static, (u64, Option<Address>)> {
        let repository = self.clone();
        stream::once(async move {
            let count = if repository.context.gate.is_allowed(collection).await {
                let at = repository.context.snapshot.current();
                skip_failed("collection", collection, repository.contract(collection, at).await)
                    .map_or(0, |contract| contract.next_item_index)
            } else {
                0
            };
            (repository, count)
        })
        .flat_map(move |(repository, count)| {
            stream::iter(0..count).then(move |index| {
                let repository = repository.clone();
                async move {
                    let address = match repository.item_address(collection, index).await {
                        Ok(address) => address,
                        Err(error) => {
                            warn!(
                                collection = %collection,
                                index,
                                error = %error,
                                "Could not resolve item address"
                            );
                            None
                        }
                    };
                    (index, address)
                }
            })
        })
        .boxed()
    }

    /// Every explicitly approved address that resolves to a collection.
    pub fn all(&self) -> BoxStream<'static, CollectionModel> {
        let repository = self.clone();
        let gate = self.context.gate.clone();
        stream::once(async move { gate.approved().await })
            .flat_map(stream::iter)
            .then(move |address| {
                let repository = repository.clone();
                async move { skip_failed("collection", address, repository.get(address).await) }
            })
            .filter_map(futures::future::ready)
            .boxed()
    }

    /// One page of [`all`](Self::all), bounded by the configured page limits.
    pub async fn page(&self, page: Page) -> Vec<CollectionModel> {
        drop_take(self.all(), page, self.pages).collect().await
    }

    /// Resolves every listed collection once in the background, filling the
    /// caches before the first request.
    pub fn warm_up(&self) -> JoinHandle<()> {
        let listing = self.all();
        tokio::spawn(
            async move {
                let primed = listing.count().await;
                info!(primed, "Collection caches primed");
            }
            .instrument(spans::warm_up("collection")),
        )
    }

    /// The caches the invalidator should manage
    pub fn caches(&self) -> Vec<Arc<dyn InvalidationTarget>> {
        vec![
            Arc::new(self.contracts.clone()),
            Arc::new(self.metadata.clone()),
            Arc::new(self.item_index.clone()),
        ]
    }
}

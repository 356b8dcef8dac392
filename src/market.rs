// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Composition root.
//!
//! [`Marketplace::start`] builds every component in dependency order and
//! hands each one its collaborators explicitly:
//!
//! 1. [`ReferenceSnapshot`] from the ledger head, with its refresh task
//! 2. the repositories and their caches
//! 3. the [`BlockStream`] starting after the snapshot head
//! 4. the [`Invalidator`] over every cache, advancing the snapshot

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::info;

use crate::approval::{ApprovalGate, ApprovalStore};
use crate::cache::{CacheStats, InvalidationTarget};
use crate::config::MarketplaceConfig;
use crate::errors::MarketError;
use crate::invalidator::{Invalidator, InvalidatorStats};
use crate::ledger::LedgerClient;
use crate::metadata::MetadataFetcher;
use crate::repository::{
    CollectionRepository, ItemRepository, RepositoryContext, RoyaltyRepository, SaleRepository,
};
use crate::snapshot::ReferenceSnapshot;
use crate::stream::{BlockStream, BlockStreamStats};
use crate::transport::RetryPolicy;

/// External services the marketplace reads from
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn LedgerClient>,
    pub metadata: Arc<dyn MetadataFetcher>,
    pub approvals: Arc<dyn ApprovalStore>,
}

/// A running marketplace view: repositories plus the background tasks that
/// keep their caches fresh.
///
/// Dropping the handle stops the background tasks.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_market::{Collaborators, Marketplace, MarketplaceConfig};
///
/// let config = MarketplaceConfig::from_env()?;
/// let marketplace = Marketplace::start(config, Collaborators { ledger, metadata, approvals }).await?;
/// marketplace.warm_up();
///
/// let item = marketplace.items().get(address).await?;
/// ```
pub struct Marketplace {
    config: MarketplaceConfig,
    snapshot: ReferenceSnapshot,
    collections: CollectionRepository,
    items: ItemRepository,
    sales: SaleRepository,
    royalties: RoyaltyRepository,
    caches: Vec<Arc<dyn InvalidationTarget>>,
    stream: Arc<BlockStream>,
    invalidator: Invalidator,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("marketplace", &self.config.marketplace)
            .field("snapshot", &self.snapshot)
            .field("invalidator", &self.invalidator)
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Builds and starts the marketplace.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Config`] for an invalid configuration and
    /// [`MarketError::Ledger`] when the ledger head cannot be read.
    pub async fn start(
        config: MarketplaceConfig,
        collaborators: Collaborators,
    ) -> Result<Self, MarketError> {
        config.validate()?;
        let Collaborators {
            ledger,
            metadata,
            approvals,
        } = collaborators;

        let ledger_retry = RetryPolicy::from_config(config.ledger_retry.clone());
        let snapshot = ReferenceSnapshot::establish(Arc::clone(&ledger), ledger_retry.clone()).await?;
        let refresh = snapshot.spawn_refresh(config.snapshot_refresh_interval);

        let context = RepositoryContext::new(
            Arc::clone(&ledger),
            metadata,
            ApprovalGate::new(approvals),
            snapshot.clone(),
            ledger_retry,
        );
        let collections = CollectionRepository::new(context.clone(), &config.caches, config.pages);
        let sales = SaleRepository::new(context.clone(), &config.caches);
        let royalties = RoyaltyRepository::new(context.clone(), &config.caches);
        let items = ItemRepository::new(
            context,
            &config,
            collections.clone(),
            sales.clone(),
            royalties.clone(),
        );

        let caches: Vec<Arc<dyn InvalidationTarget>> = collections
            .caches()
            .into_iter()
            .chain(items.caches())
            .chain(sales.caches())
            .chain(royalties.caches())
            .collect();
        let invalidator = caches
            .iter()
            .cloned()
            .fold(Invalidator::new(), Invalidator::with_target)
            .with_snapshot(snapshot.clone());

        let stream = Arc::new(BlockStream::new(
            ledger,
            snapshot.current().seqno(),
            config.stream.clone(),
        ));
        let invalidation = invalidator
            .clone()
            .spawn(Arc::clone(&stream), config.stream.restart_delay);

        info!(
            marketplace = %config.marketplace,
            seqno = snapshot.current().seqno(),
            caches = caches.len(),
            "Marketplace started"
        );

        Ok(Self {
            config,
            snapshot,
            collections,
            items,
            sales,
            royalties,
            caches,
            stream,
            invalidator,
            tasks: Mutex::new(vec![refresh, invalidation]),
        })
    }

    /// Primes the collection and item caches in the background.
    pub fn warm_up(&self) {
        let collections = self.collections.warm_up();
        let items = self.items.warm_up();
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([collections, items]);
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &ReferenceSnapshot {
        &self.snapshot
    }

    pub fn collections(&self) -> &CollectionRepository {
        &self.collections
    }

    pub fn items(&self) -> &ItemRepository {
        &self.items
    }

    pub fn sales(&self) -> &SaleRepository {
        &self.sales
    }

    pub fn royalties(&self) -> &RoyaltyRepository {
        &self.royalties
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    /// Statistics of every managed cache, by cache name
    pub fn cache_stats(&self) -> Vec<(String, CacheStats)> {
        self.caches
            .iter()
            .map(|cache| (cache.name().to_string(), cache.stats()))
            .collect()
    }

    pub fn stream_stats(&self) -> BlockStreamStats {
        self.stream.stats()
    }

    pub fn invalidator_stats(&self) -> InvalidatorStats {
        self.invalidator.stats()
    }

    /// Stops the block stream and every background task.
    pub fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        self.stream.stop();
        info!(marketplace = %self.config.marketplace, "Marketplace stopped");
    }
}

impl Drop for Marketplace {
    fn drop(&mut self) {
        self.shutdown();
    }
}

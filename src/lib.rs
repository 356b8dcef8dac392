// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Consistency-bounded caching layer for a marketplace view over
//! ledger-backed NFT collections, items, sales and royalties.
//!
//! Reads go through [`NegativeCache`]s that remember absences and coalesce
//! concurrent lookups. The [`BlockStream`] feeds finalized blocks to the
//! [`Invalidator`], which evicts every entry mentioning an address the block
//! touched, so staleness is bounded by one block-processing cycle.
//! [`Marketplace`] wires everything together.
//!
//! ```rust,ignore
//! use ledger_market::{api, Collaborators, Marketplace, MarketplaceConfig};
//!
//! let config = MarketplaceConfig::from_env()?;
//! let marketplace = Arc::new(Marketplace::start(config, collaborators).await?);
//! marketplace.warm_up();
//! api::serve_api(TcpListener::bind("0.0.0.0:8080").await?, marketplace).await?;
//! ```

pub mod api;
pub mod approval;
pub mod cache;
pub mod config;
pub mod errors;
pub mod invalidator;
pub mod ledger;
pub mod market;
pub mod metadata;
pub mod models;
pub mod ops;
pub mod repository;
pub mod snapshot;
mod spans;
pub mod stream;
pub mod transport;
pub mod types;

pub use approval::{ApprovalGate, ApprovalRecord, ApprovalStore, InMemoryApprovalStore};
pub use cache::{AddressKey, CacheEntry, CacheStats, InvalidationTarget, Lookup, NegativeCache};
pub use config::{MarketplaceConfig, MarketplaceConfigBuilder};
pub use errors::{FetchError, LedgerError, MarketError, MetadataError, StreamFault};
pub use invalidator::Invalidator;
pub use market::{Collaborators, Marketplace};
pub use repository::{
    CollectionRepository, ItemRepository, Page, RepositoryContext, RoyaltyRepository,
    SaleRepository,
};
pub use snapshot::ReferenceSnapshot;
pub use stream::{BlockEvent, BlockStream};
pub use types::{Address, Block, BlockRef, ContentPointer};

// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Named defaults and environment variable names
//!
//! This module centralizes the constants used throughout the crate so the
//! defaults in [`MarketplaceConfig`](super::MarketplaceConfig) are discoverable.

use std::time::Duration;

/// Page size used when a listing request does not ask for one
pub const DEFAULT_PAGE_TAKE: usize = 16;

/// Largest page a listing request may ask for
pub const MAX_PAGE_TAKE: usize = 128;

/// Entry bound applied to every cache
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100_000;

/// Lifetime of `(collection, index) -> item address` entries.
///
/// The index is keyed by the collection rather than by the item address the
/// invalidator sees, so it additionally expires after this long.
pub const ITEM_INDEX_TTL: Duration = Duration::from_secs(72 * 60 * 60);

/// How often the reference snapshot asks the ledger for its head
pub const SNAPSHOT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Attempts made for a metadata document after the first one fails
pub const METADATA_MAX_RETRIES: u32 = 10;

/// Per-request timeout for off-chain metadata documents
pub const METADATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Events buffered per block stream subscriber before it starts lagging
pub const BLOCK_STREAM_CAPACITY: usize = 1024;

/// Consecutive failed fetch rounds after which the block stream gives up
pub const BLOCK_STREAM_MAX_RESTARTS: u32 = 5;

/// Pause before a terminated block stream is started again
pub const BLOCK_STREAM_RESTART_DELAY: Duration = Duration::from_secs(10);

/// Name shown for collections whose metadata has none
pub const UNTITLED_COLLECTION: &str = "Untitled Collection";

/// Prefix of the name shown for items whose metadata has none (`"Item no. 7"`)
pub const UNNAMED_ITEM_PREFIX: &str = "Item no.";

/// Environment variables read by [`MarketplaceConfig::from_env`](super::MarketplaceConfig::from_env)
pub mod env {
    pub const MARKETPLACE_ADDRESS: &str = "MARKETPLACE_ADDRESS";
    pub const SERVICE_FEE_NUMERATOR: &str = "MARKETPLACE_SERVICE_FEE_NUMERATOR";
    pub const SERVICE_FEE_DENOMINATOR: &str = "MARKETPLACE_SERVICE_FEE_DENOMINATOR";
    pub const SALE_FEE: &str = "MARKETPLACE_SALE_FEE";
    pub const TRANSFER_FEE: &str = "MARKETPLACE_TRANSFER_FEE";
    pub const NETWORK_FEE: &str = "MARKETPLACE_NETWORK_FEE";
    pub const PAGE_MAX_TAKE: &str = "PAGE_MAX_TAKE";
    pub const CACHE_MAX_ENTRIES: &str = "CACHE_MAX_ENTRIES";
}

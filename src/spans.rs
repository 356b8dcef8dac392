// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Span creation helpers for ledger-market operations.
//!
//! Telemetry is kept apart from business logic: instead of `#[instrument]`
//! attributes, each instrumented operation has a span helper here and the
//! operation attaches it with [`tracing::Instrument`].
//!
//! Usage pattern:
//! ```rust,ignore
//! pub async fn get(&self, address: Address) -> Result<Option<Model>, FetchError> {
//!     async move {
//!         // Business logic here
//!     }
//!     .instrument(spans::repository_get("collection", address))
//!     .await
//! }
//! ```

use tracing::{Level, Span};

use crate::types::{Address, ContentPointer};

/// Create span for resolving one entity by address.
///
/// Parent: the API request or an enclosing listing
/// Children: nested repository_get spans (collection of an item, its sale, its royalty)
#[inline]
pub(crate) fn repository_get(entity: &'static str, address: Address) -> Span {
    tracing::debug_span!("ledger_market.repository_get", entity, address = %address)
}

/// Create span for resolving `(collection, index)` to an item address.
#[inline]
pub(crate) fn item_address(collection: Address, index: u64) -> Span {
    tracing::trace_span!("ledger_market.item_address", collection = %collection, index)
}

/// Create span for loading one metadata document.
#[inline]
pub(crate) fn metadata_fetch(pointer: &ContentPointer) -> Span {
    tracing::debug_span!("ledger_market.metadata_fetch", pointer = %pointer)
}

/// Create span for evicting everything one block touched.
///
/// Parent: None (the invalidator runs as its own task)
#[inline]
pub(crate) fn invalidate_block(seqno: u64, touched: usize) -> Span {
    tracing::span!(
        Level::DEBUG,
        "ledger_market.invalidate_block",
        seqno,
        touched,
    )
}

/// Create span for fetching the block after `after_seqno`, retries included.
#[inline]
pub(crate) fn block_stream_fetch(after_seqno: u64) -> Span {
    tracing::debug_span!("ledger_market.block_stream_fetch", after_seqno)
}

/// Create span for one reference snapshot refresh.
#[inline]
pub(crate) fn snapshot_refresh() -> Span {
    tracing::trace_span!("ledger_market.snapshot_refresh")
}

/// Create span for priming a repository's caches at startup.
///
/// Parent: None (root span for the background warm-up task)
#[inline]
pub(crate) fn warm_up(repository: &'static str) -> Span {
    tracing::info_span!("ledger_market.warm_up", repository)
}

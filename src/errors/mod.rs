// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the ledger-market library.
//!
//! Module-specific errors for fine-grained handling, plus the unified
//! [`MarketError`] for callers that only need to propagate:
//!
//! - [`LedgerError`] - ledger reads (execution faults vs network faults)
//! - [`MetadataError`] - metadata document resolution
//! - [`ApprovalStoreError`] - allow/deny list store failures
//! - [`FetchError`] - failure of a cached computation, shared by coalesced callers
//! - [`StreamFault`] - block stream faults surfaced to subscribers
//! - [`CodecError`] - malformed binary ledger operations
//!
//! Entity lookups never surface execution faults or gate rejections as
//! errors: they resolve to "not found". Only network faults propagate, and
//! only for the call that hit them.

mod approval;
mod codec;
mod fetch;
mod ledger;
mod metadata;
mod stream;

pub use approval::ApprovalStoreError;
pub use codec::CodecError;
pub use fetch::FetchError;
pub use ledger::LedgerError;
pub use metadata::MetadataError;
pub use stream::StreamFault;

use crate::types::AddressParseError;

/// Unified error type for all ledger-market operations.
///
/// All module-specific error types convert into `MarketError` via `From`,
/// so `?` propagates them naturally.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Approval store error: {0}")]
    Approval(#[from] ApprovalStoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Block stream fault: {0}")]
    Stream(#[from] StreamFault),

    #[error("Operation codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid address: {0}")]
    Address(#[from] AddressParseError),

    /// Invalid or missing configuration value.
    #[error("Configuration error: {details}")]
    Config { details: String },
}

impl MarketError {
    pub fn config(details: impl Into<String>) -> Self {
        MarketError::Config {
            details: details.into(),
        }
    }
}

// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use super::{LedgerError, MetadataError};

/// Failure of a cached computation.
///
/// This is what every caller coalesced onto one in-flight computation
/// receives, so it is cheap to clone. It is never written into a cache: the
/// next lookup for the same key starts a fresh computation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The computation panicked or the runtime shut it down.
    #[error("cached computation aborted: {details}")]
    Aborted { details: String },
}

impl FetchError {
    pub fn aborted(details: impl Into<String>) -> Self {
        FetchError::Aborted {
            details: details.into(),
        }
    }
}

// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Errors raised by the ledger query client.

use std::sync::Arc;

use crate::ledger::ContractKind;
use crate::types::Address;

/// Errors that can occur while reading ledger state.
///
/// The variants split into two families that the caching layer treats very
/// differently:
///
/// - **Execution faults** ([`Execution`](Self::Execution),
///   [`UnexpectedContract`](Self::UnexpectedContract)): the ledger answered,
///   but the account is not readable as the requested contract. These become
///   negative cache entries.
/// - **Network faults** ([`Network`](Self::Network)): the ledger could not be
///   reached. These are retried with backoff and never cached.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// Contract execution reverted or the account has no such get-method.
    #[error("contract execution failed at {address}: {reason}")]
    Execution {
        /// The account that was being read
        address: Address,
        /// Exit code or message reported by the ledger
        reason: String,
    },

    /// The account holds a different kind of contract than requested.
    #[error("expected a {expected} contract at {address}, found {found}")]
    UnexpectedContract {
        address: Address,
        expected: ContractKind,
        found: ContractKind,
    },

    /// Transient connectivity failure talking to the ledger.
    #[error("ledger connection failed during {operation}")]
    Network {
        /// Description of the operation that failed (e.g. "head block")
        operation: String,
        /// The underlying transport error
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl LedgerError {
    /// Helper to create an `Execution` error.
    pub fn execution(address: Address, reason: impl Into<String>) -> Self {
        LedgerError::Execution {
            address,
            reason: reason.into(),
        }
    }

    /// Helper to create a `Network` error from any error type.
    pub fn network(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LedgerError::Network {
            operation: operation.into(),
            source: Arc::new(source),
        }
    }

    /// Whether the ledger rejected the read itself (as opposed to being unreachable)
    pub fn is_execution_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::Execution { .. } | LedgerError::UnexpectedContract { .. }
        )
    }

    /// Only connectivity failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Network { .. })
    }
}

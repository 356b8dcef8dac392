// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Transport-boundary utilities.
//!
//! The [`RetryPolicy`] wraps ledger and metadata calls so that transient
//! network faults are retried with exponential backoff before a single
//! lookup gives up. Nothing retried here is ever cached as a failure.
//!
//! ```rust,ignore
//! use ledger_market::transport::RetryPolicy;
//!
//! let policy = RetryPolicy::conservative();
//! let state = policy
//!     .run("read collection", || ledger.read_contract(address, ContractKind::Collection, at))
//!     .await?;
//! ```

mod retry;

pub use retry::{RetryConfig, RetryPolicy, RetryPolicyBuilder, Retryable};
pub(crate) use retry::calculate_backoff;

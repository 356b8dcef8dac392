// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types shared across the crate.
//!
//! - [`Address`]: ledger account identity, the primary cache key everywhere
//! - [`BlockRef`] and [`Block`]: point-in-time handles and finalized blocks
//! - [`ContentPointer`]: where a contract's metadata document lives

mod address;
mod block;
mod content;

pub use address::{Address, AddressParseError};
pub use block::{Block, BlockRef};
pub use content::ContentPointer;

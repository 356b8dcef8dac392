// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time ledger handles and finalized blocks

use std::collections::HashSet;
use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use super::Address;

/// Handle to the ledger state as of one finalized block.
///
/// Two reads pinned to the same `BlockRef` observe the same state. Handles are
/// ordered by sequence number and are never mutated, only superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockRef {
    seqno: u64,
    root_hash: B256,
}

impl BlockRef {
    pub const fn new(seqno: u64, root_hash: B256) -> Self {
        Self { seqno, root_hash }
    }

    /// Monotonically increasing sequence number
    pub const fn seqno(&self) -> u64 {
        self.seqno
    }

    pub const fn root_hash(&self) -> B256 {
        self.root_hash
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.seqno)
    }
}

/// A finalized block together with the accounts whose state it changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    reference: BlockRef,
    workchain: i32,
    account_changes: Vec<B256>,
}

impl Block {
    /// Creates a block from its handle, its partition id and the per-account
    /// change records it lists
    pub fn new(reference: BlockRef, workchain: i32, account_changes: Vec<B256>) -> Self {
        Self {
            reference,
            workchain,
            account_changes,
        }
    }

    pub const fn reference(&self) -> BlockRef {
        self.reference
    }

    pub const fn seqno(&self) -> u64 {
        self.reference.seqno
    }

    pub const fn workchain(&self) -> i32 {
        self.workchain
    }

    /// Addresses whose state changed in this block.
    ///
    /// Combines the block's workchain with every account change record, in
    /// the order the block lists them, without duplicates.
    pub fn touched_addresses(&self) -> Vec<Address> {
        let mut seen = HashSet::with_capacity(self.account_changes.len());
        self.account_changes
            .iter()
            .map(|hash| Address::new(self.workchain, *hash))
            .filter(|address| seen.insert(*address))
            .collect()
    }
}

// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Faults surfaced by the block stream to its subscribers.

/// Operationally visible block stream faults.
///
/// These never fail an individual request; they degrade cache freshness and
/// must be logged and surfaced rather than swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamFault {
    /// The ledger delivered a block that skips ahead of the expected sequence.
    ///
    /// Accepting it would let the invalidator miss touched addresses, so the
    /// stream discards it and resumes from the last confirmed block.
    #[error("block stream gap: expected block {expected}, received {received}")]
    Gap { expected: u64, received: u64 },

    /// The producer gave up after repeated failures. No further blocks follow.
    #[error("block stream terminated after block {last_confirmed} ({attempts} failed attempts): {reason}")]
    Terminated {
        last_confirmed: u64,
        attempts: u32,
        reason: String,
    },

    /// A subscriber fell behind and the broadcast buffer overwrote blocks.
    #[error("block stream subscriber lagged and skipped {skipped} events")]
    Lagged { skipped: u64 },
}

impl StreamFault {
    /// Terminal faults end the stream; every other fault is followed by more blocks.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFault::Terminated { .. })
    }
}

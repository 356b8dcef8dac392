// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

/// Failure to decode a binary ledger operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown {family} operation 0x{found:08x}")]
    UnknownDiscriminator { family: &'static str, found: u32 },

    #[error("truncated input reading {field}: needed {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid tag {tag} for {field}")]
    InvalidTag { field: &'static str, tag: u8 },

    #[error("amount of {length} bytes does not fit in 16")]
    AmountTooLong { length: usize },

    #[error("{count} unexpected bytes after the operation")]
    TrailingBytes { count: usize },
}

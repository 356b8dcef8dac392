// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Where a contract's metadata document lives.
///
/// Contracts either embed the JSON document on-chain or point at an
/// HTTP(S) location that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentPointer {
    /// JSON document stored in the contract data itself
    OnChain(Vec<u8>),
    /// Off-chain location of the JSON document
    Uri(String),
}

impl ContentPointer {
    pub fn uri(uri: impl Into<String>) -> Self {
        Self::Uri(uri.into())
    }
}

impl fmt::Display for ContentPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnChain(blob) => write!(f, "onchain({} bytes)", blob.len()),
            Self::Uri(uri) => f.write_str(uri),
        }
    }
}

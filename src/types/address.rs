// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Ledger account addresses.
//!
//! An [`Address`] is the pair of a workchain (partition) id and the 256-bit
//! account hash. Its canonical text form is the lower-case raw form
//! `"<workchain>:<64 hex digits>"`, which is also what the API serializes.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{hex, B256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Identifies a ledger account. Equality and hashing are by value.
///
/// # Examples
///
/// ```
/// use ledger_market::Address;
///
/// let address: Address = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8"
///     .parse()
///     .unwrap();
/// assert_eq!(address.workchain(), 0);
/// assert_eq!(address.to_string().len(), 2 + 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    workchain: i32,
    hash: B256,
}

impl Address {
    /// Creates an address from its workchain id and account hash
    pub const fn new(workchain: i32, hash: B256) -> Self {
        Self { workchain, hash }
    }

    /// The workchain (partition) this account lives in
    pub const fn workchain(&self) -> i32 {
        self.workchain
    }

    /// The 256-bit account hash
    pub const fn hash(&self) -> B256 {
        self.hash
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

/// Errors produced when parsing the raw `workchain:hash` form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// The input has no `:` separator
    #[error("address `{input}` is missing the workchain separator")]
    MissingSeparator { input: String },

    /// The workchain part is not a signed 32-bit integer
    #[error("address `{input}` has an invalid workchain id")]
    InvalidWorkchain { input: String },

    /// The hash part is not 32 bytes of hex
    #[error("address `{input}` has an invalid account hash")]
    InvalidHash { input: String },
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (workchain, hash) =
            s.trim()
                .split_once(':')
                .ok_or_else(|| AddressParseError::MissingSeparator {
                    input: s.to_string(),
                })?;

        let workchain = workchain
            .parse::<i32>()
            .map_err(|_| AddressParseError::InvalidWorkchain {
                input: s.to_string(),
            })?;

        let hash = hash
            .parse::<B256>()
            .map_err(|_| AddressParseError::InvalidHash {
                input: s.to_string(),
            })?;

        Ok(Self::new(workchain, hash))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

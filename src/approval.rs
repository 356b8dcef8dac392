// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Operator allow/deny list and the admission gate built on it.
//!
//! Addresses without a record are allowed. A record with `allowed = false`
//! blocks the address; a record with `allowed = true` changes nothing for the
//! gate but lists the address for enumeration by
//! [`ApprovalStore::approved`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ApprovalStoreError;
use crate::types::Address;

/// One operator decision about an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub address: Address,
    pub allowed: bool,
    pub timestamp: DateTime<Utc>,
}

impl ApprovalRecord {
    pub fn new(address: Address, allowed: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            address,
            allowed,
            timestamp,
        }
    }

    pub fn allow(address: Address) -> Self {
        Self::new(address, true, Utc::now())
    }

    pub fn deny(address: Address) -> Self {
        Self::new(address, false, Utc::now())
    }
}

/// Persistent allow/deny list
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// The authoritative record for `address`, if any
    async fn lookup(&self, address: Address) -> Result<Option<ApprovalRecord>, ApprovalStoreError>;

    /// Every address whose authoritative record allows it, in a stable order
    async fn approved(&self) -> Result<Vec<Address>, ApprovalStoreError>;
}

/// Approval store kept in memory.
///
/// Keeps every record written; the authoritative one for an address is the
/// latest by timestamp (ties go to the one written last).
#[derive(Debug, Default)]
pub struct InMemoryApprovalStore {
    records: RwLock<HashMap<Address, Vec<ApprovalRecord>>>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ApprovalRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.record(record);
        }
        store
    }

    pub fn record(&self, record: ApprovalRecord) {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        records.entry(record.address).or_default().push(record);
    }

    fn latest(records: &[ApprovalRecord]) -> Option<&ApprovalRecord> {
        // max_by_key returns the last of equal maxima
        records.iter().max_by_key(|record| record.timestamp)
    }
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn lookup(&self, address: Address) -> Result<Option<ApprovalRecord>, ApprovalStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| ApprovalStoreError::new("approval records lock poisoned"))?;
        Ok(records
            .get(&address)
            .and_then(|history| Self::latest(history))
            .cloned())
    }

    async fn approved(&self) -> Result<Vec<Address>, ApprovalStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| ApprovalStoreError::new("approval records lock poisoned"))?;
        let mut approved: Vec<(DateTime<Utc>, Address)> = records
            .values()
            .filter_map(|history| Self::latest(history))
            .filter(|record| record.allowed)
            .map(|record| (record.timestamp, record.address))
            .collect();
        approved.sort();
        Ok(approved.into_iter().map(|(_, address)| address).collect())
    }
}

/// Admission check consulted before reading any address that is the subject
/// of a lookup.
///
/// Decisions are never cached: approval is cheap to check and operators may
/// change it at any time.
#[derive(Clone)]
pub struct ApprovalGate {
    store: Arc<dyn ApprovalStore>,
}

impl std::fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalGate").finish_non_exhaustive()
    }
}

impl ApprovalGate {
    pub fn new(store: Arc<dyn ApprovalStore>) -> Self {
        Self { store }
    }

    /// Whether the address may be read.
    ///
    /// A store failure denies this one call and is logged.
    pub async fn is_allowed(&self, address: Address) -> bool {
        match self.store.lookup(address).await {
            Ok(Some(record)) => {
                if !record.allowed {
                    debug!(address = %address, "Address was disapproved");
                }
                record.allowed
            }
            Ok(None) => true,
            Err(error) => {
                warn!(address = %address, error = %error, "Approval lookup failed, denying read");
                false
            }
        }
    }

    /// Explicitly approved addresses, for enumeration.
    ///
    /// A store failure yields an empty list and is logged.
    pub async fn approved(&self) -> Vec<Address> {
        match self.store.approved().await {
            Ok(addresses) => addresses,
            Err(error) => {
                warn!(error = %error, "Listing approved addresses failed");
                Vec::new()
            }
        }
    }
}

// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! The ledger state every read is pinned to.
//!
//! [`ReferenceSnapshot`] holds one [`BlockRef`]. Readers take it with
//! [`current`](ReferenceSnapshot::current), which never waits on the network;
//! a background task advances it to the ledger head on a fixed interval.
//! A repository lookup takes the handle once and uses it for every nested
//! read, so an item, its collection and its royalty are read from the same
//! block.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

use crate::errors::LedgerError;
use crate::ledger::LedgerClient;
use crate::spans;
use crate::transport::RetryPolicy;
use crate::types::BlockRef;

struct Inner {
    ledger: Arc<dyn LedgerClient>,
    retry: RetryPolicy,
    current: watch::Sender<BlockRef>,
}

/// Shared handle to the adopted ledger state. Cloning is cheap.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_market::ReferenceSnapshot;
///
/// let snapshot = ReferenceSnapshot::establish(ledger, RetryPolicy::new()).await?;
/// let refresh = snapshot.spawn_refresh(Duration::from_secs(5));
///
/// let at = snapshot.current();
/// let state = ledger.read_contract(address, ContractKind::Item, at).await?;
/// ```
#[derive(Clone)]
pub struct ReferenceSnapshot {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ReferenceSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceSnapshot")
            .field("current", &self.current())
            .finish()
    }
}

impl ReferenceSnapshot {
    /// Fetches the ledger head and adopts it.
    ///
    /// # Errors
    ///
    /// Returns the ledger error when the head cannot be read, retries included.
    pub async fn establish(
        ledger: Arc<dyn LedgerClient>,
        retry: RetryPolicy,
    ) -> Result<Self, LedgerError> {
        let head = retry.run("head block", || ledger.head_block()).await?;
        info!(seqno = head.seqno(), "Reference snapshot established");
        Ok(Self {
            inner: Arc::new(Inner {
                ledger,
                retry,
                current: watch::Sender::new(head),
            }),
        })
    }

    /// The most recently adopted handle
    pub fn current(&self) -> BlockRef {
        *self.inner.current.borrow()
    }

    /// Receiver notified every time the snapshot advances
    pub fn subscribe(&self) -> watch::Receiver<BlockRef> {
        self.inner.current.subscribe()
    }

    /// Adopts `block` if it is newer than the current handle.
    ///
    /// The snapshot only moves forward; older handles are ignored. Returns
    /// whether the snapshot advanced.
    pub fn observe(&self, block: BlockRef) -> bool {
        self.inner.current.send_if_modified(|current| {
            if block.seqno() > current.seqno() {
                *current = block;
                true
            } else {
                false
            }
        })
    }

    /// Asks the ledger for its head now and adopts it if newer.
    ///
    /// # Errors
    ///
    /// Returns the ledger error after retries; the current handle is kept.
    pub async fn refresh(&self) -> Result<BlockRef, LedgerError> {
        let ledger = &self.inner.ledger;
        let head = self
            .inner
            .retry
            .run("head block", || ledger.head_block())
            .instrument(spans::snapshot_refresh())
            .await?;
        if self.observe(head) {
            debug!(seqno = head.seqno(), "Reference snapshot advanced");
        }
        Ok(self.current())
    }

    /// Spawns the periodic refresh task.
    ///
    /// A failed refresh is logged and the previous handle stays in place until
    /// the next tick.
    pub fn spawn_refresh(&self, every: Duration) -> JoinHandle<()> {
        let snapshot = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately and the head was just read
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(error) = snapshot.refresh().await {
                    warn!(
                        error = %error,
                        seqno = snapshot.current().seqno(),
                        "Reference snapshot refresh failed, keeping current handle"
                    );
                }
            }
        })
    }
}

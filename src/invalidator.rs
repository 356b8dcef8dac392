// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Block-driven cache eviction.
//!
//! The [`Invalidator`] consumes the [`BlockStream`] and, for every block,
//! removes each managed cache entry whose key mentions an address the block
//! touched. Every cache is processed for a block before the next block is
//! taken. It never populates a cache.
//!
//! Falling behind the stream means touched addresses were skipped, so a
//! lagging invalidator clears every managed cache. A terminated stream is
//! started again from its last confirmed block.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::InvalidationTarget;
use crate::errors::StreamFault;
use crate::snapshot::ReferenceSnapshot;
use crate::spans;
use crate::stream::{BlockEvent, BlockStream};
use crate::types::{Address, Block};

#[derive(Debug, Default)]
struct InvalidatorCounters {
    blocks: AtomicU64,
    evicted: AtomicU64,
    faults: AtomicU64,
    full_clears: AtomicU64,
    stream_restarts: AtomicU64,
}

/// Snapshot of invalidator counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidatorStats {
    /// Blocks processed
    pub blocks: u64,
    /// Cache entries removed because a block touched them
    pub evicted: u64,
    /// Non-terminal stream faults observed
    pub faults: u64,
    /// Times every cache was cleared after lagging behind the stream
    pub full_clears: u64,
    /// Times a terminated stream was started again
    pub stream_restarts: u64,
}

/// Why [`Invalidator::run`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidatorExit {
    /// The stream gave up; the fault says where it stopped
    StreamTerminated(StreamFault),
    /// The stream was dropped
    StreamClosed,
}

/// Evicts cache entries for addresses touched by new blocks.
///
/// Cloning is cheap; clones share the managed caches and counters.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_market::Invalidator;
///
/// let invalidator = Invalidator::new()
///     .with_target(Arc::new(collection_cache.clone()))
///     .with_target(Arc::new(item_cache.clone()))
///     .with_snapshot(snapshot.clone());
///
/// let task = invalidator.spawn(Arc::new(stream), Duration::from_secs(10));
/// ```
#[derive(Clone, Default)]
pub struct Invalidator {
    targets: Vec<Arc<dyn InvalidationTarget>>,
    snapshot: Option<ReferenceSnapshot>,
    counters: Arc<InvalidatorCounters>,
}

impl std::fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.targets.iter().map(|target| target.name()).collect();
        f.debug_struct("Invalidator")
            .field("targets", &names)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Invalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cache to manage
    pub fn with_target(mut self, target: Arc<dyn InvalidationTarget>) -> Self {
        self.targets.push(target);
        self
    }

    /// Advances `snapshot` to each block before its evictions are applied.
    ///
    /// A read that misses on an evicted entry is pinned to at least the block
    /// that evicted it.
    pub fn with_snapshot(mut self, snapshot: ReferenceSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Names of the managed caches
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|target| target.name())
    }

    /// Evicts every entry the block touched from every managed cache.
    ///
    /// Returns the number of entries removed.
    pub fn apply(&self, block: &Block) -> usize {
        let touched: HashSet<Address> = block.touched_addresses().into_iter().collect();
        let span = spans::invalidate_block(block.seqno(), touched.len());
        let _guard = span.enter();

        // A read that misses after an eviction below must pin to this block
        if let Some(snapshot) = &self.snapshot {
            snapshot.observe(block.reference());
        }

        let mut removed = 0;
        for target in &self.targets {
            let evicted = target.invalidate_touched(&touched);
            if evicted > 0 {
                debug!(cache = target.name(), evicted, "Evicted touched entries");
            }
            removed += evicted;
        }

        self.counters.blocks.fetch_add(1, Ordering::Relaxed);
        self.counters
            .evicted
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Empties every managed cache. Returns the number of entries removed.
    pub fn clear_all(&self) -> usize {
        let removed = self
            .targets
            .iter()
            .map(|target| target.invalidate_all())
            .sum();
        self.counters.full_clears.fetch_add(1, Ordering::Relaxed);
        removed
    }

    /// Processes stream events until the stream terminates or closes.
    pub async fn run(&self, events: &mut broadcast::Receiver<BlockEvent>) -> InvalidatorExit {
        loop {
            match events.recv().await {
                Ok(BlockEvent::Block(block)) => {
                    self.apply(&block);
                }
                Ok(BlockEvent::Fault(fault)) if fault.is_terminal() => {
                    error!(fault = %fault, "Block stream terminated, cache invalidation paused");
                    return InvalidatorExit::StreamTerminated(fault);
                }
                Ok(BlockEvent::Fault(fault)) => {
                    self.counters.faults.fetch_add(1, Ordering::Relaxed);
                    warn!(fault = %fault, "Block stream fault");
                }
                Err(RecvError::Lagged(skipped)) => {
                    let removed = self.clear_all();
                    error!(
                        skipped,
                        removed, "Invalidator fell behind the block stream, cleared every managed cache"
                    );
                }
                Err(RecvError::Closed) => {
                    info!("Block stream closed, invalidator stopping");
                    return InvalidatorExit::StreamClosed;
                }
            }
        }
    }

    /// Subscribes to `stream`, starts it, and keeps invalidating for as long
    /// as the stream exists.
    ///
    /// When the stream terminates it is started again after `restart_delay`,
    /// resuming from its last confirmed block, so no touched address is
    /// skipped.
    pub fn spawn(self, stream: Arc<BlockStream>, restart_delay: Duration) -> JoinHandle<()> {
        let mut events = stream.subscribe();
        stream.start();
        info!(
            caches = self.targets.len(),
            "Invalidator subscribed to block stream"
        );

        tokio::spawn(async move {
            loop {
                match self.run(&mut events).await {
                    InvalidatorExit::StreamClosed => return,
                    InvalidatorExit::StreamTerminated(_) => {
                        tokio::time::sleep(restart_delay).await;
                        self.counters
                            .stream_restarts
                            .fetch_add(1, Ordering::Relaxed);
                        info!(
                            last_confirmed = stream.stats().last_confirmed,
                            "Restarting terminated block stream"
                        );
                        stream.start();
                    }
                }
            }
        })
    }

    pub fn stats(&self) -> InvalidatorStats {
        InvalidatorStats {
            blocks: self.counters.blocks.load(Ordering::Relaxed),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
            faults: self.counters.faults.load(Ordering::Relaxed),
            full_clears: self.counters.full_clears.load(Ordering::Relaxed),
            stream_restarts: self.counters.stream_restarts.load(Ordering::Relaxed),
        }
    }
}

// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Ordered, gapless feed of finalized blocks.
//!
//! A single producer task asks the ledger for the block after the last one it
//! confirmed and broadcasts it to every subscriber. Each subscriber has its
//! own buffer, so a slow one lags (and is told so) instead of stalling the
//! producer.
//!
//! Faults never end the stream silently:
//!
//! - A block that skips ahead is discarded, reported as [`StreamFault::Gap`],
//!   and the producer asks again from the last confirmed block.
//! - A block at or before the last confirmed one is skipped. The producer
//!   yields before asking again.
//! - A failed fetch (after transport retries) is retried from the last
//!   confirmed block with backoff.
//! - After `max_restarts` consecutive failed rounds the producer reports
//!   [`StreamFault::Terminated`] and stops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::StreamSettings;
use crate::errors::StreamFault;
use crate::ledger::LedgerClient;
use crate::spans;
use crate::transport::{calculate_backoff, RetryPolicy};
use crate::types::Block;

/// What subscribers receive
#[derive(Debug, Clone)]
pub enum BlockEvent {
    /// The next block in sequence
    Block(Arc<Block>),
    Fault(StreamFault),
}

#[derive(Debug, Default)]
struct StreamCounters {
    delivered: AtomicU64,
    last_confirmed: AtomicU64,
    gaps: AtomicU64,
    replays: AtomicU64,
    restarts: AtomicU64,
    failed_fetches: AtomicU64,
}

/// Snapshot of block stream counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockStreamStats {
    /// Blocks broadcast since start
    pub delivered: u64,
    /// Sequence number of the last block broadcast (or the starting point)
    pub last_confirmed: u64,
    /// Blocks discarded because they skipped ahead
    pub gaps: u64,
    /// Already confirmed blocks the ledger answered with again
    pub replays: u64,
    /// Times the producer resumed from the last confirmed block
    pub restarts: u64,
    /// Fetches that failed after transport retries
    pub failed_fetches: u64,
}

/// Fan-out feed of finalized blocks.
///
/// Subscribe before [`start`](Self::start) to see every block from the
/// starting point on.
///
/// # Examples
///
/// ```rust,ignore
/// use ledger_market::{BlockEvent, BlockStream};
///
/// let stream = BlockStream::new(ledger, snapshot.current().seqno(), StreamSettings::default());
/// let mut blocks = stream.subscribe();
/// stream.start();
///
/// while let Ok(event) = blocks.recv().await {
///     if let BlockEvent::Block(block) = event {
///         println!("block {} touched {} accounts", block.seqno(), block.touched_addresses().len());
///     }
/// }
/// ```
pub struct BlockStream {
    ledger: Arc<dyn LedgerClient>,
    settings: StreamSettings,
    start_after: u64,
    sender: broadcast::Sender<BlockEvent>,
    counters: Arc<StreamCounters>,
    producer: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BlockStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStream")
            .field("start_after", &self.start_after)
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish()
    }
}

impl BlockStream {
    /// Creates a stream that will deliver blocks after `start_after`
    pub fn new(ledger: Arc<dyn LedgerClient>, start_after: u64, settings: StreamSettings) -> Self {
        let (sender, _) = broadcast::channel(settings.capacity.max(1));
        let counters = StreamCounters::default();
        counters.last_confirmed.store(start_after, Ordering::Relaxed);
        Self {
            ledger,
            settings,
            start_after,
            sender,
            counters: Arc::new(counters),
            producer: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BlockEvent> {
        self.sender.subscribe()
    }

    /// Spawns the producer. Calling it again while the producer runs does nothing.
    pub fn start(&self) {
        let mut producer = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        if producer.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let last = self.counters.last_confirmed.load(Ordering::Relaxed);
        info!(start_after = last, "Starting block stream");
        *producer = Some(tokio::spawn(produce(
            Arc::clone(&self.ledger),
            self.sender.clone(),
            Arc::clone(&self.counters),
            self.settings.clone(),
            last,
        )));
    }

    /// Aborts the producer. Subscribers see the channel close once the
    /// stream itself is dropped.
    pub fn stop(&self) {
        let producer = self
            .producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = producer {
            task.abort();
            info!("Block stream stopped");
        }
    }

    /// Whether the producer is currently running
    pub fn is_running(&self) -> bool {
        self.producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn stats(&self) -> BlockStreamStats {
        BlockStreamStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            last_confirmed: self.counters.last_confirmed.load(Ordering::Relaxed),
            gaps: self.counters.gaps.load(Ordering::Relaxed),
            replays: self.counters.replays.load(Ordering::Relaxed),
            restarts: self.counters.restarts.load(Ordering::Relaxed),
            failed_fetches: self.counters.failed_fetches.load(Ordering::Relaxed),
        }
    }
}

impl Drop for BlockStream {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn produce(
    ledger: Arc<dyn LedgerClient>,
    sender: broadcast::Sender<BlockEvent>,
    counters: Arc<StreamCounters>,
    settings: StreamSettings,
    mut last_confirmed: u64,
) {
    let retry = RetryPolicy::from_config(settings.retry.clone());
    let mut failed_rounds = 0u32;

    loop {
        let fetched = retry
            .run("next block", || ledger.next_block_after(last_confirmed))
            .instrument(spans::block_stream_fetch(last_confirmed))
            .await;

        let reason = match fetched {
            Ok(block) if block.seqno() == last_confirmed.saturating_add(1) => {
                failed_rounds = 0;
                last_confirmed = block.seqno();
                counters.last_confirmed.store(last_confirmed, Ordering::Relaxed);
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(seqno = last_confirmed, "Block confirmed");
                // Err only means nobody is subscribed right now
                let _ = sender.send(BlockEvent::Block(Arc::new(block)));
                continue;
            }
            Ok(block) if block.seqno() <= last_confirmed => {
                counters.replays.fetch_add(1, Ordering::Relaxed);
                debug!(
                    seqno = block.seqno(),
                    last_confirmed, "Ignoring already confirmed block"
                );
                // A replay may resolve without ever suspending
                tokio::task::yield_now().await;
                continue;
            }
            Ok(block) => {
                let fault = StreamFault::Gap {
                    expected: last_confirmed.saturating_add(1),
                    received: block.seqno(),
                };
                counters.gaps.fetch_add(1, Ordering::Relaxed);
                error!(
                    expected = last_confirmed.saturating_add(1),
                    received = block.seqno(),
                    "Block stream gap, discarding block and resuming from last confirmed"
                );
                let _ = sender.send(BlockEvent::Fault(fault.clone()));
                fault.to_string()
            }
            Err(fetch_error) => {
                counters.failed_fetches.fetch_add(1, Ordering::Relaxed);
                fetch_error.to_string()
            }
        };

        failed_rounds += 1;
        if failed_rounds > settings.max_restarts {
            error!(
                last_confirmed,
                attempts = failed_rounds,
                reason = %reason,
                "Block stream giving up"
            );
            let _ = sender.send(BlockEvent::Fault(StreamFault::Terminated {
                last_confirmed,
                attempts: failed_rounds,
                reason,
            }));
            return;
        }

        counters.restarts.fetch_add(1, Ordering::Relaxed);
        let delay = calculate_backoff(failed_rounds - 1, &settings.retry);
        warn!(
            last_confirmed,
            attempt = failed_rounds,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "Restarting block stream from last confirmed block"
        );
        tokio::time::sleep(delay).await;
    }
}

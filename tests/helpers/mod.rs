// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for ledger-market integration tests
//!
//! Provides mock collaborators (ledger, metadata fetcher) that count calls,
//! so tests can assert how often the caching layer reached the ledger.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use ledger_market::errors::{LedgerError, MetadataError};
use ledger_market::ledger::{
    CollectionContract, ContractKind, ContractState, ItemContract, LedgerClient, RoyaltyContract,
    SaleContract,
};
use ledger_market::metadata::MetadataFetcher;
use ledger_market::{
    Address, ApprovalRecord, Block, BlockRef, Collaborators, ContentPointer,
    InMemoryApprovalStore, Marketplace, MarketplaceConfig,
};

pub fn address(byte: u8) -> Address {
    Address::new(0, B256::repeat_byte(byte))
}

pub fn block_ref(seqno: u64) -> BlockRef {
    BlockRef::new(seqno, B256::with_last_byte(seqno as u8))
}

pub fn block(seqno: u64, touched: &[Address]) -> Block {
    Block::new(
        block_ref(seqno),
        0,
        touched.iter().map(|address| address.hash()).collect(),
    )
}

#[derive(Debug)]
struct Offline;

impl std::fmt::Display for Offline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connection refused")
    }
}

impl std::error::Error for Offline {}

pub fn network_error(operation: &str) -> LedgerError {
    LedgerError::network(operation, Offline)
}

/// Mock ledger holding contract states in memory
///
/// Addresses without a state fail with an execution fault, like an
/// uninitialized account would. Blocks for `next_block_after` are fed
/// through [`MockLedger::push_block`].
///
/// # Example
///
/// ```rust,ignore
/// let ledger = MockLedger::new()
///     .with_contract(collection, ContractState::Collection(...))
///     .with_item_address(collection, 0, item);
///
/// assert_eq!(ledger.reads(collection), 1);
/// ```
pub struct MockLedger {
    head: Mutex<BlockRef>,
    contracts: Mutex<HashMap<(Address, ContractKind), ContractState>>,
    item_addresses: Mutex<HashMap<(Address, u64), Address>>,
    offline: Mutex<HashSet<Address>>,
    read_delay: Mutex<Option<Duration>>,
    reads: Mutex<HashMap<Address, usize>>,
    item_address_calls: AtomicUsize,
    head_calls: AtomicUsize,
    replaying: Mutex<Option<Block>>,
    blocks_tx: mpsc::UnboundedSender<Result<Block, LedgerError>>,
    blocks_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Block, LedgerError>>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        let (blocks_tx, blocks_rx) = mpsc::unbounded_channel();
        Self {
            head: Mutex::new(block_ref(100)),
            contracts: Mutex::new(HashMap::new()),
            item_addresses: Mutex::new(HashMap::new()),
            offline: Mutex::new(HashSet::new()),
            read_delay: Mutex::new(None),
            reads: Mutex::new(HashMap::new()),
            item_address_calls: AtomicUsize::new(0),
            head_calls: AtomicUsize::new(0),
            replaying: Mutex::new(None),
            blocks_tx,
            blocks_rx: tokio::sync::Mutex::new(blocks_rx),
        }
    }

    pub fn with_head(self, head: BlockRef) -> Self {
        *self.head.lock().unwrap() = head;
        self
    }

    pub fn with_contract(self, address: Address, state: ContractState) -> Self {
        self.set_contract(address, state);
        self
    }

    pub fn with_item_address(self, collection: Address, index: u64, item: Address) -> Self {
        self.item_addresses
            .lock()
            .unwrap()
            .insert((collection, index), item);
        self
    }

    /// Every read of `address` takes this long
    pub fn with_read_delay(self, delay: Duration) -> Self {
        *self.read_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn set_head(&self, head: BlockRef) {
        *self.head.lock().unwrap() = head;
    }

    /// An address may answer as several kinds (a collection also reports royalties)
    pub fn set_contract(&self, address: Address, state: ContractState) {
        self.contracts
            .lock()
            .unwrap()
            .insert((address, state.kind()), state);
    }

    pub fn remove_contract(&self, address: Address, kind: ContractKind) {
        self.contracts.lock().unwrap().remove(&(address, kind));
    }

    /// Reads of `address` fail with a network fault until [`MockLedger::reconnect`]
    pub fn disconnect(&self, address: Address) {
        self.offline.lock().unwrap().insert(address);
    }

    pub fn reconnect(&self, address: Address) {
        self.offline.lock().unwrap().remove(&address);
    }

    pub fn push_block(&self, block: Block) {
        let _ = self.blocks_tx.send(Ok(block));
    }

    /// Answers every block request with `block` at once, until cleared
    pub fn replay(&self, block: Option<Block>) {
        *self.replaying.lock().unwrap() = block;
    }

    pub fn push_failure(&self) {
        let _ = self.blocks_tx.send(Err(network_error("next block")));
    }

    /// Contract reads of `address` so far
    pub fn reads(&self, address: Address) -> usize {
        self.reads
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().values().sum()
    }

    pub fn item_address_calls(&self) -> usize {
        self.item_address_calls.load(Ordering::SeqCst)
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn head_block(&self) -> Result<BlockRef, LedgerError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.head.lock().unwrap())
    }

    async fn read_contract(
        &self,
        address: Address,
        kind: ContractKind,
        _at: BlockRef,
    ) -> Result<ContractState, LedgerError> {
        *self.reads.lock().unwrap().entry(address).or_default() += 1;
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.lock().unwrap().contains(&address) {
            return Err(network_error("read contract"));
        }
        let contracts = self.contracts.lock().unwrap();
        if let Some(state) = contracts.get(&(address, kind)) {
            return Ok(state.clone());
        }
        match contracts.keys().find(|(held, _)| *held == address) {
            Some((_, found)) => Err(LedgerError::UnexpectedContract {
                address,
                expected: kind,
                found: *found,
            }),
            None => Err(LedgerError::execution(address, "exit code -13")),
        }
    }

    async fn next_block_after(&self, _seqno: u64) -> Result<Block, LedgerError> {
        let replayed = self.replaying.lock().unwrap().clone();
        if let Some(block) = replayed {
            return Ok(block);
        }
        let mut blocks = self.blocks_rx.lock().await;
        match blocks.recv().await {
            Some(next) => next,
            None => std::future::pending().await,
        }
    }

    async fn item_address(
        &self,
        collection: Address,
        index: u64,
        _at: BlockRef,
    ) -> Result<Option<Address>, LedgerError> {
        self.item_address_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .item_addresses
            .lock()
            .unwrap()
            .get(&(collection, index))
            .copied())
    }

    async fn item_content(
        &self,
        collection: Address,
        index: u64,
        individual_content: ContentPointer,
        _at: BlockRef,
    ) -> Result<ContentPointer, LedgerError> {
        let common = match self
            .contracts
            .lock()
            .unwrap()
            .get(&(collection, ContractKind::Collection))
        {
            Some(ContractState::Collection(contract)) => contract.content.clone(),
            _ => return Err(LedgerError::execution(collection, "no get_nft_content")),
        };
        Ok(match (common, individual_content) {
            (ContentPointer::Uri(base), ContentPointer::Uri(path)) => {
                ContentPointer::uri(format!("{base}/{path}"))
            }
            (_, ContentPointer::OnChain(_)) => ContentPointer::uri(format!("{collection}/{index}")),
            (_, individual) => individual,
        })
    }
}

/// Mock metadata fetcher serving documents from memory
///
/// Unknown pointers answer HTTP 404, which is not retryable.
#[derive(Default)]
pub struct MockMetadata {
    documents: Mutex<HashMap<ContentPointer, Value>>,
    failing: Mutex<HashSet<ContentPointer>>,
    fetches: AtomicUsize,
}

impl MockMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, pointer: ContentPointer, document: Value) -> Self {
        self.documents.lock().unwrap().insert(pointer, document);
        self
    }

    /// Fetches of `pointer` fail with a retryable server error
    pub fn fail(&self, pointer: ContentPointer) {
        self.failing.lock().unwrap().insert(pointer);
    }

    pub fn recover(&self, pointer: &ContentPointer) {
        self.failing.lock().unwrap().remove(pointer);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for MockMetadata {
    async fn fetch(&self, pointer: &ContentPointer) -> Result<Value, MetadataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(pointer) {
            return Err(MetadataError::Status {
                location: pointer.to_string(),
                status: 503,
            });
        }
        self.documents
            .lock()
            .unwrap()
            .get(pointer)
            .cloned()
            .ok_or_else(|| MetadataError::Status {
                location: pointer.to_string(),
                status: 404,
            })
    }
}

pub fn collection_contract(next_item_index: u64, content: &str) -> ContractState {
    ContractState::Collection(CollectionContract {
        next_item_index,
        content: ContentPointer::uri(content),
        owner: Some(address(0xc0)),
    })
}

pub fn item_contract(
    index: u64,
    collection: Option<Address>,
    owner: Address,
    content: &str,
) -> ContractState {
    ContractState::Item(ItemContract {
        index,
        collection,
        owner: Some(owner),
        individual_content: ContentPointer::uri(content),
    })
}

pub fn sale_contract(marketplace: Address, nft: Address, seller: Address) -> ContractState {
    ContractState::Sale(SaleContract {
        marketplace,
        nft,
        owner: seller,
        full_price: 5_000_000_000,
        marketplace_fee: 250_000_000,
        royalty_destination: address(0xd0),
        royalty_amount: 500_000_000,
    })
}

pub fn royalty_contract(numerator: u16, denominator: u16) -> ContractState {
    ContractState::Royalty(RoyaltyContract {
        numerator,
        denominator,
        destination: address(0xd0),
    })
}

/// Install a test subscriber once; `RUST_LOG` controls the output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `condition` until it holds, failing the test after five seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Awaits `future`, failing the test after five seconds
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

pub const MARKETPLACE: u8 = 0xaa;
pub const OTHER_MARKETPLACE: u8 = 0xbb;

/// Addresses of the sample ledger built by [`sample_ledger`]
pub mod sample {
    use super::address;
    use ledger_market::Address;

    /// Collection with items at indexes 3, 4 and 5 and a 5% royalty
    pub fn collection() -> Address {
        address(0x01)
    }
    /// Index 3, held by [`wallet`]
    pub fn held_item() -> Address {
        address(0x13)
    }
    /// Index 4, listed on another marketplace
    pub fn foreign_listing() -> Address {
        address(0x14)
    }
    /// Index 5, listed on this marketplace
    pub fn listed_item() -> Address {
        address(0x15)
    }
    /// Standalone item without metadata name, 10% royalty of its own
    pub fn standalone() -> Address {
        address(0x20)
    }
    pub fn wallet() -> Address {
        address(0x77)
    }
    pub fn seller() -> Address {
        address(0x78)
    }
    pub fn foreign_sale() -> Address {
        address(0x55)
    }
    pub fn sale() -> Address {
        address(0x56)
    }
}

pub fn sample_ledger() -> MockLedger {
    use sample::*;

    MockLedger::new()
        .with_contract(collection(), collection_contract(6, "https://meta.test/c"))
        .with_contract(collection(), royalty_contract(5, 100))
        .with_contract(
            held_item(),
            item_contract(3, Some(collection()), wallet(), "3.json"),
        )
        .with_contract(
            foreign_listing(),
            item_contract(4, Some(collection()), foreign_sale(), "4.json"),
        )
        .with_contract(
            listed_item(),
            item_contract(5, Some(collection()), sale(), "5.json"),
        )
        .with_contract(
            foreign_sale(),
            sale_contract(address(OTHER_MARKETPLACE), foreign_listing(), seller()),
        )
        .with_contract(
            sale(),
            sale_contract(address(MARKETPLACE), listed_item(), seller()),
        )
        .with_contract(
            standalone(),
            item_contract(0, None, wallet(), "https://meta.test/t.json"),
        )
        .with_contract(standalone(), royalty_contract(1, 10))
        .with_item_address(collection(), 3, held_item())
        .with_item_address(collection(), 4, foreign_listing())
        .with_item_address(collection(), 5, listed_item())
}

pub fn sample_metadata() -> MockMetadata {
    MockMetadata::new()
        .with_document(
            ContentPointer::uri("https://meta.test/c"),
            json!({ "name": "Punks", "image": "https://img.test/c.png" }),
        )
        .with_document(
            ContentPointer::uri("https://meta.test/c/3.json"),
            json!({
                "name": "Punk #3",
                "image": "https://img.test/3.png",
                "attributes": [{ "trait_type": "hat", "value": "cap" }]
            }),
        )
        .with_document(
            ContentPointer::uri("https://meta.test/c/4.json"),
            json!({ "name": "Punk #4" }),
        )
        .with_document(
            ContentPointer::uri("https://meta.test/c/5.json"),
            json!({ "name": "Punk #5" }),
        )
        .with_document(ContentPointer::uri("https://meta.test/t.json"), json!({}))
}

/// The sample collection and standalone item are explicitly approved
pub fn sample_approvals() -> InMemoryApprovalStore {
    InMemoryApprovalStore::with_records([
        ApprovalRecord::allow(sample::collection()),
        ApprovalRecord::allow(sample::standalone()),
    ])
}

/// A running marketplace over mock collaborators the test keeps handles to
pub struct Fixture {
    pub ledger: Arc<MockLedger>,
    pub metadata: Arc<MockMetadata>,
    pub approvals: Arc<InMemoryApprovalStore>,
    pub marketplace: Arc<Marketplace>,
}

impl Fixture {
    pub async fn start(
        ledger: MockLedger,
        metadata: MockMetadata,
        approvals: InMemoryApprovalStore,
        config: MarketplaceConfig,
    ) -> Self {
        init_tracing();
        let ledger = Arc::new(ledger);
        let metadata = Arc::new(metadata);
        let approvals = Arc::new(approvals);
        let marketplace = Marketplace::start(
            config,
            Collaborators {
                ledger: ledger.clone(),
                metadata: metadata.clone(),
                approvals: approvals.clone(),
            },
        )
        .await
        .expect("marketplace starts");
        Self {
            ledger,
            metadata,
            approvals,
            marketplace: Arc::new(marketplace),
        }
    }

    /// The sample ledger with the default test configuration
    pub async fn sample() -> Self {
        Self::start(
            sample_ledger(),
            sample_metadata(),
            sample_approvals(),
            MarketplaceConfig::minimal(address(MARKETPLACE)),
        )
        .await
    }
}

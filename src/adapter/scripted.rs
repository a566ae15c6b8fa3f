//! Scripted adapter returning canned responses
//!
//! Used to exercise the conformance procedures without a node. Mempool
//! snapshots and resync counts are queues: each call takes the next entry
//! and the last entry repeats once the queue is drained.

use crate::adapter::{BitcoinParser, ChainParser, NodeAdapter};
use crate::errors::{AdapterError, AdapterResult};
use crate::types::{Block, BlockHeader, BlockRef, Tx};
use num_bigint::BigInt;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

pub struct ScriptedAdapter {
    parser: Box<dyn ChainParser>,
    block_hashes: HashMap<u32, String>,
    blocks: HashMap<String, Block>,
    headers: HashMap<String, BlockHeader>,
    transactions: HashMap<String, Tx>,
    mempool_transactions: HashMap<String, Tx>,
    mempool_snapshots: RefCell<VecDeque<Vec<String>>>,
    resync_counts: RefCell<VecDeque<usize>>,
    last_snapshot_len: RefCell<usize>,
    address_index: HashMap<String, Vec<String>>,
    smart_fees: HashMap<u16, BigInt>,
    fees: HashMap<u16, BigInt>,
    best_block: Option<(String, u32)>,
    failing: HashSet<&'static str>,
    calls: RefCell<Vec<&'static str>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::with_parser(Box::new(BitcoinParser::default()))
    }

    pub fn with_parser(parser: Box<dyn ChainParser>) -> Self {
        Self {
            parser,
            block_hashes: HashMap::new(),
            blocks: HashMap::new(),
            headers: HashMap::new(),
            transactions: HashMap::new(),
            mempool_transactions: HashMap::new(),
            mempool_snapshots: RefCell::new(VecDeque::new()),
            resync_counts: RefCell::new(VecDeque::new()),
            last_snapshot_len: RefCell::new(0),
            address_index: HashMap::new(),
            smart_fees: HashMap::new(),
            fees: HashMap::new(),
            best_block: None,
            failing: HashSet::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Register a block; its hash, height and header become queryable
    pub fn with_block(mut self, block: Block) -> Self {
        let hash = block.header.hash.clone();
        self.block_hashes.insert(block.header.height, hash.clone());
        self.headers.insert(hash.clone(), block.header.clone());
        self.blocks.insert(hash, block);
        self
    }

    pub fn with_block_hash(mut self, height: u32, hash: &str) -> Self {
        self.block_hashes.insert(height, hash.to_string());
        self
    }

    pub fn with_header(mut self, header: BlockHeader) -> Self {
        self.headers.insert(header.hash.clone(), header);
        self
    }

    pub fn with_transaction(mut self, tx: Tx) -> Self {
        self.transactions.insert(tx.txid.clone(), tx);
        self
    }

    pub fn with_mempool_transaction(mut self, tx: Tx) -> Self {
        self.mempool_transactions.insert(tx.txid.clone(), tx);
        self
    }

    pub fn with_mempool_snapshot(self, txids: &[&str]) -> Self {
        self.mempool_snapshots
            .borrow_mut()
            .push_back(txids.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_resync_count(self, count: usize) -> Self {
        self.resync_counts.borrow_mut().push_back(count);
        self
    }

    pub fn with_indexed_address(mut self, address: &str, txids: &[&str]) -> Self {
        self.address_index
            .entry(address.to_string())
            .or_default()
            .extend(txids.iter().map(|t| t.to_string()));
        self
    }

    pub fn with_smart_fee(mut self, blocks: u16, fee: BigInt) -> Self {
        self.smart_fees.insert(blocks, fee);
        self
    }

    pub fn with_fee(mut self, blocks: u16, fee: BigInt) -> Self {
        self.fees.insert(blocks, fee);
        self
    }

    pub fn with_best_block(mut self, hash: &str, height: u32) -> Self {
        self.best_block = Some((hash.to_string(), height));
        self
    }

    /// Make every call of `method` fail with `CallFailed`
    pub fn failing(mut self, method: &'static str) -> Self {
        self.failing.insert(method);
        self
    }

    /// Number of times `method` was called
    pub fn call_count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|m| **m == method).count()
    }

    fn record(&self, method: &'static str) -> AdapterResult<()> {
        self.calls.borrow_mut().push(method);
        if self.failing.contains(method) {
            return Err(AdapterError::CallFailed {
                method: method.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn fee_from(table: &HashMap<u16, BigInt>, method: &str, blocks: u16) -> AdapterResult<BigInt> {
        table
            .get(&blocks)
            .cloned()
            .ok_or_else(|| AdapterError::CallFailed {
                method: method.to_string(),
                message: format!("no scripted estimate for {} blocks", blocks),
            })
    }
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Take the next queued entry, repeating the last one once drained
fn next_scripted<T: Clone>(queue: &RefCell<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.borrow_mut();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl NodeAdapter for ScriptedAdapter {
    fn get_block_hash(&self, height: u32) -> AdapterResult<String> {
        self.record("get_block_hash")?;
        self.block_hashes
            .get(&height)
            .cloned()
            .ok_or(AdapterError::BlockNotFound)
    }

    fn get_block(&self, at: BlockRef<'_>) -> AdapterResult<Block> {
        self.record("get_block")?;
        let hash = match at {
            BlockRef::Hash(hash) => hash.to_string(),
            BlockRef::Height(height) => self
                .block_hashes
                .get(&height)
                .cloned()
                .ok_or(AdapterError::BlockNotFound)?,
        };
        self.blocks
            .get(&hash)
            .cloned()
            .ok_or(AdapterError::BlockNotFound)
    }

    fn get_transaction(&self, txid: &str) -> AdapterResult<Tx> {
        self.record("get_transaction")?;
        self.transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| AdapterError::TransactionNotFound {
                txid: txid.to_string(),
            })
    }

    fn get_transaction_for_mempool(&self, txid: &str) -> AdapterResult<Tx> {
        self.record("get_transaction_for_mempool")?;
        self.mempool_transactions
            .get(txid)
            .or_else(|| self.transactions.get(txid))
            .cloned()
            .ok_or_else(|| AdapterError::TransactionNotFound {
                txid: txid.to_string(),
            })
    }

    fn get_mempool(&self) -> AdapterResult<Vec<String>> {
        self.record("get_mempool")?;
        let snapshot = next_scripted(&self.mempool_snapshots).unwrap_or_default();
        *self.last_snapshot_len.borrow_mut() = snapshot.len();
        Ok(snapshot)
    }

    fn resync_mempool(&self) -> AdapterResult<usize> {
        self.record("resync_mempool")?;
        Ok(next_scripted(&self.resync_counts).unwrap_or(*self.last_snapshot_len.borrow()))
    }

    fn get_mempool_transactions(&self, address: &str) -> AdapterResult<Vec<String>> {
        self.record("get_mempool_transactions")?;
        Ok(self.address_index.get(address).cloned().unwrap_or_default())
    }

    fn estimate_smart_fee(&self, blocks: u16, _conservative: bool) -> AdapterResult<BigInt> {
        self.record("estimate_smart_fee")?;
        Self::fee_from(&self.smart_fees, "estimate_smart_fee", blocks)
    }

    fn estimate_fee(&self, blocks: u16) -> AdapterResult<BigInt> {
        self.record("estimate_fee")?;
        Self::fee_from(&self.fees, "estimate_fee", blocks)
    }

    fn get_best_block_hash(&self) -> AdapterResult<String> {
        self.record("get_best_block_hash")?;
        self.best_block
            .as_ref()
            .map(|(hash, _)| hash.clone())
            .ok_or_else(|| AdapterError::InvalidResponse("no best block scripted".to_string()))
    }

    fn get_best_block_height(&self) -> AdapterResult<u32> {
        self.record("get_best_block_height")?;
        self.best_block
            .as_ref()
            .map(|(_, height)| *height)
            .ok_or_else(|| AdapterError::InvalidResponse("no best block scripted".to_string()))
    }

    fn get_block_header(&self, hash: &str) -> AdapterResult<BlockHeader> {
        self.record("get_block_header")?;
        self.headers
            .get(hash)
            .cloned()
            .ok_or(AdapterError::BlockNotFound)
    }

    fn parser(&self) -> &dyn ChainParser {
        self.parser.as_ref()
    }
}

//! Capability boundary of the adapter under test
//!
//! The harness only ever talks to a node through these two traits:
//! - **ChainParser** - pure amount and transaction codecs of a coin
//! - **NodeAdapter** - block, transaction, mempool and fee queries against a node
//!
//! Implementations shipped with the crate:
//! - `BitcoinParser` - Bitcoin amounts and consensus transactions
//! - `ScriptedAdapter` - canned responses for exercising the harness itself
//! - `crate::rpc::BitcoinRpcAdapter` - Bitcoin Core over JSON-RPC

pub mod bitcoin_parser;
pub mod scripted;

pub use bitcoin_parser::BitcoinParser;
pub use scripted::ScriptedAdapter;

use crate::errors::AdapterResult;
use crate::types::{Block, BlockHeader, BlockRef, Tx};
use num_bigint::BigInt;

/// Coin-specific codecs
pub trait ChainParser {
    /// Convert a display-format amount ("0.0001") into the integer base unit
    fn amount_to_big_int(&self, display: &str) -> AdapterResult<BigInt>;

    /// Convert an integer base-unit amount into its display form
    fn amount_to_decimal_string(&self, amount: &BigInt) -> String;

    /// Serialize a transaction together with its block height and time
    fn pack_tx(&self, tx: &Tx, height: u32, blocktime: i64) -> AdapterResult<Vec<u8>>;

    /// Reverse of `pack_tx`; returns the decoded transaction and its height
    fn unpack_tx(&self, packed: &[u8]) -> AdapterResult<(Tx, u32)>;
}

/// Node queries consumed by the conformance procedures
///
/// All calls are synchronous. `get_block` must answer
/// `AdapterError::BlockNotFound` for heights beyond the tip.
pub trait NodeAdapter {
    fn get_block_hash(&self, height: u32) -> AdapterResult<String>;

    fn get_block(&self, at: BlockRef<'_>) -> AdapterResult<Block>;

    /// Confirmed transaction with confirmations, blocktime and time filled in
    fn get_transaction(&self, txid: &str) -> AdapterResult<Tx>;

    /// Transaction as parsed for the mempool; fewer fields are guaranteed
    fn get_transaction_for_mempool(&self, txid: &str) -> AdapterResult<Tx>;

    fn get_mempool(&self) -> AdapterResult<Vec<String>>;

    /// Refresh the per-address mempool index; returns the entries processed
    fn resync_mempool(&self) -> AdapterResult<usize>;

    /// Mempool transaction ids the index holds for an address
    fn get_mempool_transactions(&self, address: &str) -> AdapterResult<Vec<String>>;

    /// Fee rate per kilobyte in base units; negative means "unknown"
    fn estimate_smart_fee(&self, blocks: u16, conservative: bool) -> AdapterResult<BigInt>;

    /// Fee rate per kilobyte in base units; negative means "unknown"
    fn estimate_fee(&self, blocks: u16) -> AdapterResult<BigInt>;

    fn get_best_block_hash(&self) -> AdapterResult<String>;

    fn get_best_block_height(&self) -> AdapterResult<u32>;

    fn get_block_header(&self, hash: &str) -> AdapterResult<BlockHeader>;

    fn parser(&self) -> &dyn ChainParser;
}

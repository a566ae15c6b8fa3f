//! Common Test Utilities
//!
//! Shared fixtures and adapter builders used across the unit and
//! integration test suites.

#![allow(dead_code)]

pub mod rpc_helpers;

use node_conformance::adapter::{BitcoinParser, ChainParser, ScriptedAdapter};
use node_conformance::config::HarnessConfig;
use node_conformance::fixture::{load_test_data, FixtureDataset};
use node_conformance::types::{Block, BlockHeader, Tx};
use num_bigint::BigInt;
use std::path::PathBuf;

/// Pays 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa and 3Kytpz8jRv1tXKzHUqZcMibJHncnrvwxqL,
/// plus an OP_RETURN output
pub const TX1: &str = "7320b0d6a1c8c7ca57605f1624b035c6ae718c35e5b70d950caa0ed77308e8de";

/// Spends TX1:0, pays 1AZHGX3Y5oqZrT3dwt7xQmci2xzCmxbTDF
pub const TX2: &str = "61039f69347a58b01ef218ca05e2fca48a2e1518b38626292e051a97b167da18";

pub const TX1_ADDRESSES: [&str; 2] = [
    "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
    "3Kytpz8jRv1tXKzHUqZcMibJHncnrvwxqL",
];
pub const TX2_ADDRESS: &str = "1AZHGX3Y5oqZrT3dwt7xQmci2xzCmxbTDF";

pub const BLOCK_HEIGHT: u32 = 100;
pub const BLOCK_HASH: &str = "0000000000000000000000000000000000000000000000000000000000c0ffee";
pub const BLOCK_TIME: i64 = 1_700_000_000;

/// One BTC in satoshi; `-COIN` is the "no estimate" fee rate
pub const COIN: i64 = 100_000_000;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test_data")
}

pub fn load_bitcoin_fixture() -> FixtureDataset {
    load_test_data(&fixtures_dir(), "bitcoin", &BitcoinParser::default())
        .expect("bitcoin fixture loads")
}

/// Harness settings with no pauses between attempts
pub fn fast_settings() -> HarnessConfig {
    HarnessConfig {
        race_backoff_ms: 0,
        ..HarnessConfig::default()
    }
}

/// Transaction as a node would return it: decoded from its raw hex, confirmed
pub fn confirmed(tx: &Tx) -> Tx {
    let mut decoded = BitcoinParser::default()
        .parse_tx_hex(&tx.hex)
        .expect("fixture hex decodes");
    decoded.confirmations = 6;
    decoded.blocktime = BLOCK_TIME;
    decoded.time = BLOCK_TIME;
    decoded
}

pub fn fixture_header(confirmations: u32) -> BlockHeader {
    BlockHeader {
        hash: BLOCK_HASH.to_string(),
        prev: "0000000000000000000000000000000000000000000000000000000000000bad".to_string(),
        next: String::new(),
        height: BLOCK_HEIGHT,
        confirmations,
        time: BLOCK_TIME,
    }
}

pub fn fixture_block(dataset: &FixtureDataset) -> Block {
    Block {
        header: fixture_header(1),
        txs: dataset
            .block_txs()
            .iter()
            .filter_map(|txid| dataset.tx(txid))
            .map(confirmed)
            .collect(),
    }
}

/// Scripted node whose chain tip is the fixture block and whose mempool
/// holds both fixture transactions, indexed correctly
pub fn conforming_adapter(dataset: &FixtureDataset) -> ScriptedAdapter {
    let mut adapter = ScriptedAdapter::new()
        .with_block(fixture_block(dataset))
        .with_best_block(BLOCK_HASH, BLOCK_HEIGHT)
        .with_mempool_snapshot(&[TX1, TX2])
        .with_indexed_address(TX1_ADDRESSES[0], &[TX1])
        .with_indexed_address(TX1_ADDRESSES[1], &[TX1])
        .with_indexed_address(TX2_ADDRESS, &[TX2]);

    for tx in dataset.tx_details().values() {
        adapter = adapter.with_transaction(confirmed(tx));
    }
    for blocks in [1u16, 2, 3, 5, 10] {
        adapter = adapter
            .with_smart_fee(blocks, BigInt::from(1_000 * i64::from(blocks)))
            .with_fee(blocks, BigInt::from(-COIN));
    }
    adapter
}

/// Parser whose unpack loses the last output of every transaction
pub struct LossyParser(pub BitcoinParser);

impl ChainParser for LossyParser {
    fn amount_to_big_int(&self, display: &str) -> node_conformance::errors::AdapterResult<BigInt> {
        self.0.amount_to_big_int(display)
    }

    fn amount_to_decimal_string(&self, amount: &BigInt) -> String {
        self.0.amount_to_decimal_string(amount)
    }

    fn pack_tx(
        &self,
        tx: &Tx,
        height: u32,
        blocktime: i64,
    ) -> node_conformance::errors::AdapterResult<Vec<u8>> {
        self.0.pack_tx(tx, height, blocktime)
    }

    fn unpack_tx(&self, packed: &[u8]) -> node_conformance::errors::AdapterResult<(Tx, u32)> {
        let (mut tx, height) = self.0.unpack_tx(packed)?;
        tx.vout.pop();
        Ok((tx, height))
    }
}

//! Comparison procedures
//!
//! Deterministic queries are checked against the fixture; best-block and
//! fee queries are checked against invariants that hold on any live chain.

use crate::errors::{AdapterError, AdapterResult};
use crate::harness::{Findings, Halt, TestHandler};
use crate::types::{BlockHeader, BlockRef};
use num_bigint::{BigInt, Sign};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Confirmation targets every fee estimator is asked about
pub const FEE_TARGETS: [u16; 5] = [1, 2, 3, 5, 10];

/// Display form of the "no estimate" fee rate
pub const UNKNOWN_FEE: &str = "-1";

pub fn get_block_hash(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    let hash = h.chain.get_block_hash(h.test_data.block_height())?;
    if hash != h.test_data.block_hash() {
        f.error(format!(
            "GetBlockHash() got {:?}, want {:?}",
            hash,
            h.test_data.block_hash()
        ));
    }
    Ok(())
}

pub fn get_block(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    let block = h.chain.get_block(BlockRef::Hash(h.test_data.block_hash()))?;
    let want = h.test_data.block_txs();

    if block.txs.len() != want.len() {
        f.error(format!(
            "GetBlock() number of transactions: got {}, want {}",
            block.txs.len(),
            want.len()
        ));
    }

    for (index, (tx, want_txid)) in block.txs.iter().zip(want).enumerate() {
        if &tx.txid != want_txid {
            f.error(format!(
                "GetBlock() transaction {}: got {}, want {}",
                index, tx.txid, want_txid
            ));
        }
    }
    Ok(())
}

pub fn get_transaction(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    for (txid, want) in h.test_data.tx_details() {
        let got = h.chain.get_transaction(txid)?;

        if got.confirmations == 0 {
            f.error(format!(
                "GetTransaction() got struct with invalid Confirmations field for {}",
                txid
            ));
            continue;
        }

        let (got, want) = (got.without_volatile(), want.without_volatile());
        if got != want {
            f.error(format!("GetTransaction() got {:?}, want {:?}", got, want));
        }
    }
    Ok(())
}

pub fn get_transaction_for_mempool(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    for (txid, want) in h.test_data.tx_details() {
        let got = h.chain.get_transaction_for_mempool(txid)?.without_volatile();
        let want = want.without_volatile();
        if got != want {
            f.error(format!(
                "GetTransactionForMempool() got {:?}, want {:?}",
                got, want
            ));
        }
    }
    Ok(())
}

/// A negative estimate is only acceptable as the "-1" sentinel
fn check_fee_estimates<E>(h: &TestHandler<'_>, f: &mut Findings, name: &str, estimate: E)
where
    E: Fn(u16) -> AdapterResult<BigInt>,
{
    for blocks in FEE_TARGETS {
        match estimate(blocks) {
            Err(e) => f.error(format!("{}({}) failed: {}", name, blocks, e)),
            Ok(fee) if fee.sign() == Sign::Minus => {
                let display = h.chain.parser().amount_to_decimal_string(&fee);
                if display != UNKNOWN_FEE {
                    f.error(format!(
                        "{}() returned unexpected fee rate: {}",
                        name, display
                    ));
                }
            }
            Ok(fee) => debug!("{}({}) = {}", name, blocks, fee),
        }
    }
}

pub fn estimate_smart_fee(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    check_fee_estimates(h, f, "EstimateSmartFee", |blocks| {
        h.chain.estimate_smart_fee(blocks, true)
    });
    Ok(())
}

pub fn estimate_fee(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    check_fee_estimates(h, f, "EstimateFee", |blocks| h.chain.estimate_fee(blocks));
    Ok(())
}

/// Outcome of asking for the block right after a claimed best block
enum Successor {
    Absent,
    Present,
    Failed(AdapterError),
}

fn successor_of(h: &TestHandler<'_>, height: u32) -> Successor {
    match h.chain.get_block(BlockRef::Height(height.saturating_add(1))) {
        Err(AdapterError::BlockNotFound) => Successor::Absent,
        Err(e) => Successor::Failed(e),
        Ok(_) => Successor::Present,
    }
}

pub fn get_best_block_hash(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    for attempt in 1..=h.settings.best_block_attempts {
        let hash = h.chain.get_best_block_hash()?;
        let height = h.chain.get_best_block_height()?;
        let hash_at_height = h.chain.get_block_hash(height)?;

        if hash != hash_at_height {
            debug!(
                "attempt {}: best hash {} differs from hash {} at height {}",
                attempt, hash, hash_at_height, height
            );
            thread::sleep(Duration::from_millis(h.settings.race_backoff_ms));
            continue;
        }

        match successor_of(h, height) {
            Successor::Absent => return Ok(()),
            Successor::Failed(e) => {
                f.error(e.to_string());
                return Ok(());
            }
            Successor::Present => debug!("attempt {}: block {} has a successor", attempt, height),
        }
    }

    f.error("GetBestBlockHash() didn't get the best hash");
    Ok(())
}

pub fn get_best_block_height(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    for attempt in 1..=h.settings.best_block_attempts {
        let height = h.chain.get_best_block_height()?;

        match successor_of(h, height) {
            Successor::Absent => return Ok(()),
            Successor::Failed(e) => {
                f.error(e.to_string());
                return Ok(());
            }
            Successor::Present => debug!("attempt {}: block {} has a successor", attempt, height),
        }
    }

    f.error("GetBestBlockHeight() didn't get the best height");
    Ok(())
}

pub fn get_block_header(h: &TestHandler<'_>, f: &mut Findings) -> Result<(), Halt> {
    let want = BlockHeader {
        hash: h.test_data.block_hash().to_string(),
        height: h.test_data.block_height(),
        time: h.test_data.block_time(),
        ..Default::default()
    };

    let mut got = h.chain.get_block_header(h.test_data.block_hash())?;
    if got.confirmations == 0 {
        return Err(Halt::Fatal(
            "GetBlockHeader() got struct with invalid Confirmations field".to_string(),
        ));
    }
    got.confirmations = 0;
    got.prev.clear();
    got.next.clear();

    if got != want {
        f.error(format!("GetBlockHeader() got={:?}, want={:?}", got, want));
    }
    Ok(())
}

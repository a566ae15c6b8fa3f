//! Fixture loading and normalization
//!
//! A fixture document describes one reference block of a coin: its height,
//! hash and time, the ordered txids it contains and the full record of each
//! of those transactions. Loading turns it into an immutable `FixtureDataset`:
//!
//! 1. every output's display amount (`value`) becomes the integer `value_sat`
//!    and the display form is dropped
//! 2. every transaction is packed and unpacked by the adapter's own parser,
//!    and the output addresses decoded by that round trip replace whatever
//!    the document carried for them

use crate::adapter::ChainParser;
use crate::errors::{AdapterError, FixtureError, FixtureResult};
use crate::types::Tx;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reference data for one coin, ready to compare against an adapter
///
/// Only the loader builds or modifies a dataset; procedures get `&FixtureDataset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDataset {
    block_height: u32,
    block_hash: String,
    block_time: i64,
    block_txs: Vec<String>,
    tx_details: BTreeMap<String, Tx>,
}

/// Fixture document as written on disk, before normalization
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureDocument {
    block_height: u32,
    block_hash: String,
    block_time: i64,
    block_txs: Vec<String>,
    #[serde(default)]
    tx_details: BTreeMap<String, Tx>,
}

impl FixtureDataset {
    pub fn block_height(&self) -> u32 {
        self.block_height
    }

    pub fn block_hash(&self) -> &str {
        &self.block_hash
    }

    pub fn block_time(&self) -> i64 {
        self.block_time
    }

    /// Txids of the reference block, in block order
    pub fn block_txs(&self) -> &[String] {
        &self.block_txs
    }

    /// Normalized transaction records keyed by txid
    pub fn tx_details(&self) -> &BTreeMap<String, Tx> {
        &self.tx_details
    }

    pub fn tx(&self, txid: &str) -> Option<&Tx> {
        self.tx_details.get(txid)
    }
}

/// Location of a coin's fixture document
pub fn fixture_path(dir: &Path, coin: &str) -> PathBuf {
    dir.join(format!("{}.json", coin))
}

/// Read `<dir>/<coin>.json` and normalize it with `parser`
pub fn load_test_data(
    dir: &Path,
    coin: &str,
    parser: &dyn ChainParser,
) -> FixtureResult<FixtureDataset> {
    let path = fixture_path(dir, coin);
    let bytes = fs::read(&path).map_err(|source| FixtureError::NotFound {
        path: path.clone(),
        source,
    })?;

    let dataset = parse_test_data(coin, &bytes, parser)?;
    info!(
        "Loaded {} fixture from {}: block {} with {} transactions, {} detailed",
        coin,
        path.display(),
        dataset.block_height,
        dataset.block_txs.len(),
        dataset.tx_details.len()
    );
    Ok(dataset)
}

/// Decode and normalize a fixture document
pub fn parse_test_data(
    coin: &str,
    document: &[u8],
    parser: &dyn ChainParser,
) -> FixtureResult<FixtureDataset> {
    let mut raw: FixtureDocument =
        serde_json::from_slice(document).map_err(|source| FixtureError::Malformed {
            coin: coin.to_string(),
            source,
        })?;

    for (txid, tx) in raw.tx_details.iter_mut() {
        decode_amounts(txid, tx, parser)?;
        set_tx_addresses(txid, tx, parser)?;
    }

    Ok(FixtureDataset {
        block_height: raw.block_height,
        block_hash: raw.block_hash,
        block_time: raw.block_time,
        block_txs: raw.block_txs,
        tx_details: raw.tx_details,
    })
}

/// Replace each output's display amount with its integer amount
fn decode_amounts(txid: &str, tx: &mut Tx, parser: &dyn ChainParser) -> FixtureResult<()> {
    for (index, vout) in tx.vout.iter_mut().enumerate() {
        let display = vout
            .json_value
            .take()
            .ok_or_else(|| FixtureError::AmountDecode {
                txid: txid.to_string(),
                vout: index,
                source: AdapterError::InvalidAmount("missing value".to_string()),
            })?;

        vout.value_sat = parser
            .amount_to_big_int(&display.to_string())
            .map_err(|source| FixtureError::AmountDecode {
                txid: txid.to_string(),
                vout: index,
                source,
            })?;
    }
    Ok(())
}

/// Derive output addresses by a pack/unpack round trip through the parser
///
/// Only the address lists are transplanted; every other field of the
/// fixture record stays as written.
fn set_tx_addresses(txid: &str, tx: &mut Tx, parser: &dyn ChainParser) -> FixtureResult<()> {
    let derivation_error = |reason: String| FixtureError::AddressDerivation {
        txid: txid.to_string(),
        reason,
    };

    let packed = parser
        .pack_tx(tx, 0, 0)
        .map_err(|e| derivation_error(format!("pack failed: {}", e)))?;
    let (decoded, _) = parser
        .unpack_tx(&packed)
        .map_err(|e| derivation_error(format!("unpack failed: {}", e)))?;

    if decoded.vout.len() != tx.vout.len() {
        return Err(derivation_error(format!(
            "output count mismatch: fixture has {}, round trip yields {}",
            tx.vout.len(),
            decoded.vout.len()
        )));
    }

    for (vout, derived) in tx.vout.iter_mut().zip(decoded.vout) {
        vout.script_pub_key.addresses = derived.script_pub_key.addresses;
    }
    debug!("Derived output addresses for {}", txid);
    Ok(())
}

//! Mempool reconciliation
//!
//! Checks that the adapter's address index agrees with its own view of the
//! mempool. The mempool changes under the test, so each attempt works only
//! on transactions seen in two snapshots taken around a resync, and an
//! attempt the network disturbed is retried instead of failed.

use crate::adapter::NodeAdapter;
use crate::errors::AdapterError;
use crate::harness::{Findings, Halt, TestHandler};
use crate::types::Tx;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Searchable addresses of each stable mempool transaction, keyed by the
/// txid that was requested
pub type AddressIndex = BTreeMap<String, BTreeSet<String>>;

/// How a single reconciliation attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Every indexed address reported its transaction
    Reconciled,
    /// The mempool moved under the attempt; worth retrying
    Unsettled(String),
    /// Stable transactions exist but none carries a searchable address
    NoAddresses,
}

/// Txids present in both snapshots, in first-snapshot order, without duplicates
pub fn intersect(first: &[String], second: &[String]) -> Vec<String> {
    let in_second: HashSet<&str> = second.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    first
        .iter()
        .filter(|txid| in_second.contains(txid.as_str()) && seen.insert(txid.as_str()))
        .cloned()
        .collect()
}

/// Script placeholders such as "OP_RETURN (..)" and very short strings are
/// not addresses a node indexes
pub fn is_searchable_addr(address: &str) -> bool {
    address.len() > 3 && !address.starts_with("OP_")
}

pub fn searchable_addresses(tx: &Tx) -> BTreeSet<String> {
    let inputs = tx.vin.iter().flat_map(|vin| vin.addresses.iter());
    let outputs = tx
        .vout
        .iter()
        .flat_map(|vout| vout.script_pub_key.addresses.iter());

    inputs
        .chain(outputs)
        .filter(|address| is_searchable_addr(address))
        .cloned()
        .collect()
}

/// Build the address index of the stable set
///
/// Returns `None` when a transaction left the mempool before it could be fetched.
pub fn mempool_addresses(
    chain: &dyn NodeAdapter,
    stable: &[String],
) -> Result<Option<AddressIndex>, AdapterError> {
    let mut index = AddressIndex::new();

    for txid in stable {
        let tx = match chain.get_transaction_for_mempool(txid) {
            Ok(tx) => tx,
            Err(AdapterError::TransactionNotFound { .. }) => {
                debug!("{} left the mempool before lookup", txid);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let addresses = searchable_addresses(&tx);
        if !addresses.is_empty() {
            index.insert(txid.clone(), addresses);
        }
    }

    Ok(Some(index))
}

/// One snapshot, resync, snapshot, lookup cycle
///
/// A transaction missing from one of its own addresses is a conformance
/// failure and ends the test.
pub fn reconcile_once(chain: &dyn NodeAdapter) -> Result<Attempt, Halt> {
    let first = chain.get_mempool()?;
    if first.is_empty() {
        return Ok(Attempt::Unsettled("mempool is empty".to_string()));
    }

    let processed = chain.resync_mempool()?;
    if processed == 0 {
        return Ok(Attempt::Unsettled(
            "resync processed no transactions".to_string(),
        ));
    }

    let second = chain.get_mempool()?;
    let stable = intersect(&first, &second);
    if stable.is_empty() {
        return Ok(Attempt::Unsettled(
            "no transaction survived between snapshots".to_string(),
        ));
    }
    debug!(
        "{} of {} transactions stable across resync",
        stable.len(),
        first.len()
    );

    let index = match mempool_addresses(chain, &stable)? {
        Some(index) => index,
        None => {
            return Ok(Attempt::Unsettled(
                "transaction left the mempool during lookup".to_string(),
            ))
        }
    };
    if index.is_empty() {
        return Ok(Attempt::NoAddresses);
    }

    for (txid, addresses) in &index {
        for address in addresses {
            let found = chain.get_mempool_transactions(address)?;
            if !found.iter().any(|candidate| candidate == txid) {
                return Err(Halt::Fatal(format!(
                    "ResyncMempool() - for address {}, transaction {} wasn't found in mempool",
                    address, txid
                )));
            }
        }
    }

    info!(
        "Reconciled {} addresses over {} mempool transactions",
        index.values().map(BTreeSet::len).sum::<usize>(),
        index.len()
    );
    Ok(Attempt::Reconciled)
}

pub fn mempool_sync(h: &TestHandler<'_>, _: &mut Findings) -> Result<(), Halt> {
    let attempts = h.settings.mempool_attempts;
    let mut last_reason = String::new();

    for attempt in 1..=attempts {
        match reconcile_once(h.chain)? {
            Attempt::Reconciled => return Ok(()),
            Attempt::NoAddresses => {
                return Err(Halt::Skip("no addresses in mempool".to_string()));
            }
            Attempt::Unsettled(reason) => {
                warn!("Mempool attempt {}/{} unsettled: {}", attempt, attempts, reason);
                last_reason = reason;
            }
        }
    }

    Err(Halt::Skip(format!(
        "all {} attempts to sync mempool failed due to network state changes ({})",
        attempts, last_reason
    )))
}

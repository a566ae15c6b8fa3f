use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Per-address index over the transactions currently in the mempool
#[derive(Clone, Default)]
pub struct MempoolIndex {
    state: Arc<Mutex<IndexState>>,
}

#[derive(Default)]
struct IndexState {
    /// txid -> addresses the transaction touches
    tx_addresses: HashMap<String, Vec<String>>,
    /// address -> txids touching it, in insertion order
    address_txids: HashMap<String, Vec<String>>,
}

impl MempoolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.lock().tx_addresses.contains_key(txid)
    }

    /// Index a transaction under each of its addresses
    pub fn insert(&self, txid: &str, addresses: Vec<String>) {
        let mut state = self.lock();
        for address in &addresses {
            let txids = state.address_txids.entry(address.clone()).or_default();
            if !txids.iter().any(|t| t == txid) {
                txids.push(txid.to_string());
            }
        }
        debug!("Indexed mempool transaction {} ({} addresses)", txid, addresses.len());
        state.tx_addresses.insert(txid.to_string(), addresses);
    }

    /// Drop every transaction not in `live`; returns how many were evicted
    pub fn retain(&self, live: &HashSet<String>) -> usize {
        let mut state = self.lock();
        let stale: Vec<String> = state
            .tx_addresses
            .keys()
            .filter(|txid| !live.contains(*txid))
            .cloned()
            .collect();

        for txid in &stale {
            if let Some(addresses) = state.tx_addresses.remove(txid) {
                for address in addresses {
                    if let Some(txids) = state.address_txids.get_mut(&address) {
                        txids.retain(|t| t != txid);
                        if txids.is_empty() {
                            state.address_txids.remove(&address);
                        }
                    }
                }
            }
        }
        stale.len()
    }

    pub fn transactions_for(&self, address: &str) -> Vec<String> {
        self.lock()
            .address_txids
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().tx_addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

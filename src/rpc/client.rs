use crate::adapter::{BitcoinParser, ChainParser, NodeAdapter};
use crate::config::BitcoinRpcConfig;
use crate::errors::{AdapterError, AdapterResult};
use crate::rpc::{call_with_retry, MempoolIndex, RetryPolicy};
use crate::types::{Block, BlockHeader, BlockRef, Tx};
use corepc_client::client_sync::{v28::Client, Auth};
use num_bigint::BigInt;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info};

/// Fee rate reported when the node has no estimate
const UNKNOWN_FEE_RATE: &str = "-1";

/// Bitcoin Core adapter speaking JSON-RPC through a synchronous client
///
/// Every call goes through the retry policy; "not found" answers are mapped
/// to their `AdapterError` variants and returned immediately.
pub struct BitcoinRpcAdapter {
    client: Client,
    parser: BitcoinParser,
    retry: RetryPolicy,
    mempool: MempoolIndex,
}

impl BitcoinRpcAdapter {
    /// Create the adapter and verify the node answers
    pub fn new(config: &BitcoinRpcConfig) -> AdapterResult<Self> {
        let parser = BitcoinParser::for_network(&config.network)?;
        let client = Self::create_sync_client(config)?;
        let adapter = Self {
            client,
            parser,
            retry: RetryPolicy::from(config),
            mempool: MempoolIndex::new(),
        };

        let (chain, blocks) = adapter.test_connection().map_err(|e| {
            AdapterError::ConnectionFailed(format!(
                "Failed to connect to Bitcoin RPC - check URL, credentials, and that Bitcoin Core is running: {}",
                e
            ))
        })?;
        info!(
            "Bitcoin RPC connection established - chain: {}, blocks: {}",
            chain, blocks
        );

        Ok(adapter)
    }

    fn create_sync_client(config: &BitcoinRpcConfig) -> AdapterResult<Client> {
        let auth = Auth::UserPass(config.username.clone(), config.password.clone());
        Client::new_with_auth(&config.url, auth).map_err(|e| {
            AdapterError::ConnectionFailed(format!("Failed to create Bitcoin RPC client: {}", e))
        })
    }

    /// Returns the chain name and block count reported by the node
    pub fn test_connection(&self) -> AdapterResult<(String, u64)> {
        let info = self.call("getblockchaininfo", &[])?;
        let chain = info["chain"].as_str().unwrap_or("unknown").to_string();
        let blocks = info["blocks"].as_u64().unwrap_or(0);
        debug!(
            "Bitcoin Core connection test successful - chain: {}, blocks: {}",
            chain, blocks
        );
        Ok((chain, blocks))
    }

    /// Number of transactions held by the mempool index
    pub fn indexed_mempool_size(&self) -> usize {
        self.mempool.len()
    }

    fn call(&self, method: &'static str, args: &[Value]) -> AdapterResult<Value> {
        call_with_retry(&self.retry, method, || {
            debug!("RPC {} {:?}", method, args);
            self.client
                .call::<Value>(method, args)
                .map_err(|e| classify_rpc_error(method, args, e.to_string()))
        })
    }

    fn call_string(&self, method: &'static str, args: &[Value]) -> AdapterResult<String> {
        match self.call(method, args)? {
            Value::String(s) => Ok(s),
            other => Err(AdapterError::InvalidResponse(format!(
                "{} returned {} instead of a string",
                method, other
            ))),
        }
    }

    fn fee_rate(&self, value: &Value) -> AdapterResult<BigInt> {
        match value {
            Value::Number(n) => self.parser.amount_to_big_int(&n.to_string()),
            Value::Null => self.parser.amount_to_big_int(UNKNOWN_FEE_RATE),
            other => Err(AdapterError::InvalidResponse(format!(
                "fee rate is not a number: {}",
                other
            ))),
        }
    }

    /// Output addresses of a transaction plus the addresses of the outputs
    /// its inputs spend
    fn transaction_addresses(&self, tx: &Tx) -> AdapterResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut addresses = Vec::new();

        for vout in &tx.vout {
            for address in &vout.script_pub_key.addresses {
                if seen.insert(address.clone()) {
                    addresses.push(address.clone());
                }
            }
        }

        for vin in tx.vin.iter().filter(|vin| vin.coinbase.is_empty()) {
            let prev = match self.get_transaction_for_mempool(&vin.txid) {
                Ok(prev) => prev,
                Err(AdapterError::TransactionNotFound { txid }) => {
                    debug!("Spent transaction {} unavailable, input skipped", txid);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Some(spent) = prev.vout.get(vin.vout as usize) {
                for address in &spent.script_pub_key.addresses {
                    if seen.insert(address.clone()) {
                        addresses.push(address.clone());
                    }
                }
            }
        }

        Ok(addresses)
    }
}

/// Map an RPC failure message to the adapter error taxonomy
fn classify_rpc_error(method: &str, args: &[Value], message: String) -> AdapterError {
    if message.contains("Block height out of range") || message.contains("Block not found") {
        AdapterError::BlockNotFound
    } else if message.contains("No such mempool or blockchain transaction")
        || message.contains("No such mempool transaction")
    {
        AdapterError::TransactionNotFound {
            txid: args
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    } else if message.contains("Method not found") {
        AdapterError::Unsupported {
            method: method.to_string(),
        }
    } else {
        AdapterError::CallFailed {
            method: method.to_string(),
            message,
        }
    }
}

fn i64_field(value: &Value, field: &str) -> i64 {
    value[field].as_i64().unwrap_or(0)
}

/// Confirmations are -1 for blocks off the main chain; clamp to zero
fn confirmations_field(value: &Value) -> u32 {
    value["confirmations"].as_i64().unwrap_or(0).max(0) as u32
}

impl NodeAdapter for BitcoinRpcAdapter {
    fn get_block_hash(&self, height: u32) -> AdapterResult<String> {
        self.call_string("getblockhash", &[json!(height)])
    }

    fn get_block(&self, at: BlockRef<'_>) -> AdapterResult<Block> {
        let hash = match at {
            BlockRef::Hash(hash) => hash.to_string(),
            BlockRef::Height(height) => self.get_block_hash(height)?,
        };
        let header = self.get_block_header(&hash)?;

        let raw = self.call_string("getblock", &[json!(hash), json!(0)])?;
        let bytes = hex::decode(&raw).map_err(|e| {
            AdapterError::DeserialisationFailed(format!("Failed to decode raw block hex: {}", e))
        })?;
        let block: bitcoin::Block = bitcoin::consensus::deserialize(&bytes).map_err(|e| {
            AdapterError::DeserialisationFailed(format!("Failed to deserialise block {}: {}", hash, e))
        })?;

        let txs = block
            .txdata
            .iter()
            .map(|transaction| {
                let mut tx = self.parser.tx_from_msg(transaction);
                tx.confirmations = header.confirmations;
                tx.blocktime = header.time;
                tx.time = header.time;
                tx
            })
            .collect();

        Ok(Block { header, txs })
    }

    fn get_transaction(&self, txid: &str) -> AdapterResult<Tx> {
        let verbose = self.call("getrawtransaction", &[json!(txid), json!(true)])?;
        let raw = verbose["hex"].as_str().ok_or_else(|| {
            AdapterError::InvalidResponse(format!("getrawtransaction {} has no hex", txid))
        })?;

        let mut tx = self.parser.parse_tx_hex(raw)?;
        tx.confirmations = confirmations_field(&verbose);
        tx.blocktime = i64_field(&verbose, "blocktime");
        tx.time = i64_field(&verbose, "time");
        Ok(tx)
    }

    fn get_transaction_for_mempool(&self, txid: &str) -> AdapterResult<Tx> {
        let raw = self.call_string("getrawtransaction", &[json!(txid), json!(false)])?;
        self.parser.parse_tx_hex(&raw)
    }

    fn get_mempool(&self) -> AdapterResult<Vec<String>> {
        let value = self.call("getrawmempool", &[])?;
        serde_json::from_value(value).map_err(|e| {
            AdapterError::InvalidResponse(format!("getrawmempool returned unexpected data: {}", e))
        })
    }

    fn resync_mempool(&self) -> AdapterResult<usize> {
        let txids = self.get_mempool()?;
        if self.mempool.is_empty() {
            debug!("Building mempool index from {} entries", txids.len());
        }
        let live: HashSet<String> = txids.iter().cloned().collect();
        let evicted = self.mempool.retain(&live);

        let mut added = 0usize;
        for txid in &txids {
            if self.mempool.contains(txid) {
                continue;
            }
            let tx = match self.get_transaction_for_mempool(txid) {
                Ok(tx) => tx,
                Err(AdapterError::TransactionNotFound { .. }) => {
                    debug!("Transaction {} left the mempool during resync", txid);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let addresses = self.transaction_addresses(&tx)?;
            self.mempool.insert(txid, addresses);
            added += 1;
        }

        info!(
            "Mempool resync: {} entries, {} added, {} evicted",
            txids.len(),
            added,
            evicted
        );
        Ok(txids.len())
    }

    fn get_mempool_transactions(&self, address: &str) -> AdapterResult<Vec<String>> {
        Ok(self.mempool.transactions_for(address))
    }

    fn estimate_smart_fee(&self, blocks: u16, conservative: bool) -> AdapterResult<BigInt> {
        let mode = if conservative { "CONSERVATIVE" } else { "ECONOMICAL" };
        let estimate = self.call("estimatesmartfee", &[json!(blocks), json!(mode)])?;
        self.fee_rate(&estimate["feerate"])
    }

    fn estimate_fee(&self, blocks: u16) -> AdapterResult<BigInt> {
        match self.call("estimatefee", &[json!(blocks)]) {
            Ok(estimate) => self.fee_rate(&estimate),
            Err(AdapterError::Unsupported { .. }) => {
                debug!("estimatefee unavailable, falling back to economical estimatesmartfee");
                self.estimate_smart_fee(blocks, false)
            }
            Err(e) => Err(e),
        }
    }

    fn get_best_block_hash(&self) -> AdapterResult<String> {
        self.call_string("getbestblockhash", &[])
    }

    fn get_best_block_height(&self) -> AdapterResult<u32> {
        let count = self.call("getblockcount", &[])?;
        count
            .as_u64()
            .and_then(|height| u32::try_from(height).ok())
            .ok_or_else(|| AdapterError::InvalidResponse(format!("getblockcount returned {}", count)))
    }

    fn get_block_header(&self, hash: &str) -> AdapterResult<BlockHeader> {
        let header = self.call("getblockheader", &[json!(hash), json!(true)])?;
        let height = header["height"]
            .as_u64()
            .and_then(|height| u32::try_from(height).ok())
            .ok_or_else(|| AdapterError::InvalidResponse(format!("header {} has no height", hash)))?;

        Ok(BlockHeader {
            hash: header["hash"].as_str().unwrap_or(hash).to_string(),
            prev: header["previousblockhash"].as_str().unwrap_or_default().to_string(),
            next: header["nextblockhash"].as_str().unwrap_or_default().to_string(),
            height,
            confirmations: confirmations_field(&header),
            time: i64_field(&header, "time"),
        })
    }

    fn parser(&self) -> &dyn ChainParser {
        &self.parser
    }
}

//! Bitcoin amount and transaction codecs
//!
//! Amounts are decimal BTC strings on the display side and satoshi as
//! `BigInt` on the canonical side. Conversion is exact integer arithmetic.
//!
//! Packed transaction layout:
//! `[height: u32 BE][blocktime: i64 BE][consensus-serialized transaction]`

use crate::adapter::ChainParser;
use crate::errors::{AdapterError, AdapterResult};
use crate::types::{ScriptPubKey, ScriptSig, Tx, Vin, Vout};
use bitcoin::script::Instruction;
use bitcoin::{Address, Network, Script, Transaction};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use std::str::FromStr;

/// Satoshi per BTC as a power of ten
const AMOUNT_DECIMAL_POINT: usize = 8;

/// Largest power-of-ten shift accepted while parsing a display amount
const MAX_DECIMAL_SHIFT: i64 = 64;

const PACKED_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy)]
pub struct BitcoinParser {
    network: Network,
}

impl BitcoinParser {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    /// Parser for a network given by name (bitcoin, testnet, signet, regtest)
    pub fn for_network(name: &str) -> AdapterResult<Self> {
        let network = Network::from_str(name)
            .map_err(|e| AdapterError::InvalidResponse(format!("unknown network {}: {}", name, e)))?;
        Ok(Self::new(network))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Build a transaction record from a consensus transaction
    ///
    /// Input addresses are left empty; deriving them needs the spent outputs.
    pub fn tx_from_msg(&self, transaction: &Transaction) -> Tx {
        let coinbase = transaction.is_coinbase();
        let vin = transaction
            .input
            .iter()
            .map(|input| {
                let script_hex = hex::encode(input.script_sig.as_bytes());
                if coinbase {
                    Vin {
                        coinbase: script_hex,
                        sequence: input.sequence.0,
                        ..Default::default()
                    }
                } else {
                    Vin {
                        txid: input.previous_output.txid.to_string(),
                        vout: input.previous_output.vout,
                        script_sig: ScriptSig { hex: script_hex },
                        sequence: input.sequence.0,
                        ..Default::default()
                    }
                }
            })
            .collect();

        let vout = transaction
            .output
            .iter()
            .enumerate()
            .map(|(n, output)| Vout {
                value_sat: BigInt::from(output.value.to_sat()),
                json_value: None,
                n: n as u32,
                script_pub_key: ScriptPubKey {
                    hex: hex::encode(output.script_pubkey.as_bytes()),
                    addresses: self.output_addresses(&output.script_pubkey),
                },
            })
            .collect();

        Tx {
            hex: hex::encode(bitcoin::consensus::serialize(transaction)),
            txid: transaction.compute_txid().to_string(),
            version: transaction.version.0,
            lock_time: transaction.lock_time.to_consensus_u32(),
            vin,
            vout,
            ..Default::default()
        }
    }

    /// Decode a raw transaction hex string into a record
    pub fn parse_tx_hex(&self, raw_hex: &str) -> AdapterResult<Tx> {
        let bytes = hex::decode(raw_hex).map_err(|e| {
            AdapterError::DeserialisationFailed(format!("Failed to decode raw transaction hex: {}", e))
        })?;
        let transaction: Transaction = bitcoin::consensus::deserialize(&bytes).map_err(|e| {
            AdapterError::DeserialisationFailed(format!("Failed to deserialise raw transaction: {}", e))
        })?;
        Ok(self.tx_from_msg(&transaction))
    }

    /// Addresses a scriptPubKey pays to
    ///
    /// OP_RETURN outputs get an `OP_RETURN (<payload hex>)` placeholder so they
    /// stay visible in address lists without being searchable.
    pub fn output_addresses(&self, script: &Script) -> Vec<String> {
        if script.is_op_return() {
            return vec![format!("OP_RETURN ({})", hex::encode(op_return_payload(script)))];
        }
        match Address::from_script(script, self.network) {
            Ok(address) => vec![address.to_string()],
            Err(_) => Vec::new(),
        }
    }
}

impl Default for BitcoinParser {
    fn default() -> Self {
        Self::new(Network::Bitcoin)
    }
}

fn op_return_payload(script: &Script) -> Vec<u8> {
    script
        .instructions()
        .skip(1)
        .filter_map(|instruction| match instruction {
            Ok(Instruction::PushBytes(bytes)) => Some(bytes.as_bytes().to_vec()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Parse a decimal amount (optionally signed, optionally with exponent)
/// into an integer scaled by `10^decimals`
pub fn parse_decimal_amount(raw: &str, decimals: usize) -> AdapterResult<BigInt> {
    let invalid = || AdapterError::InvalidAmount(raw.to_string());

    let text = raw.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (
            &unsigned[..pos],
            unsigned[pos + 1..].parse::<i64>().map_err(|_| invalid())?,
        ),
        None => (unsigned, 0),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(invalid());
    }

    let mut value: BigInt = format!("{}{}", int_part, frac_part)
        .parse()
        .map_err(|_| invalid())?;

    let shift = (decimals as i64)
        .checked_add(exponent)
        .and_then(|shift| shift.checked_sub(frac_part.len() as i64))
        .ok_or_else(invalid)?;
    if shift.unsigned_abs() > MAX_DECIMAL_SHIFT as u64 {
        return Err(invalid());
    }
    if shift >= 0 {
        value *= num_traits::pow(BigInt::from(10u32), shift as usize);
    } else {
        let divisor = num_traits::pow(BigInt::from(10u32), (-shift) as usize);
        // sub-unit precision cannot be represented
        if !(&value % &divisor).is_zero() {
            return Err(invalid());
        }
        value /= divisor;
    }

    Ok(if negative { -value } else { value })
}

/// Format an integer amount scaled by `10^decimals` as a trimmed decimal
pub fn format_decimal_amount(amount: &BigInt, decimals: usize) -> String {
    let digits = amount.magnitude().to_string();
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(padded.len() + 2);
    if amount.sign() == Sign::Minus {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

impl ChainParser for BitcoinParser {
    fn amount_to_big_int(&self, display: &str) -> AdapterResult<BigInt> {
        parse_decimal_amount(display, AMOUNT_DECIMAL_POINT)
    }

    fn amount_to_decimal_string(&self, amount: &BigInt) -> String {
        format_decimal_amount(amount, AMOUNT_DECIMAL_POINT)
    }

    fn pack_tx(&self, tx: &Tx, height: u32, blocktime: i64) -> AdapterResult<Vec<u8>> {
        if tx.hex.is_empty() {
            return Err(AdapterError::PackFailed(format!(
                "transaction {} carries no raw hex",
                tx.txid
            )));
        }
        let raw = hex::decode(&tx.hex)
            .map_err(|e| AdapterError::PackFailed(format!("raw hex of {}: {}", tx.txid, e)))?;

        let mut packed = Vec::with_capacity(PACKED_HEADER_LEN + raw.len());
        packed
            .write_u32::<BigEndian>(height)
            .and_then(|_| packed.write_i64::<BigEndian>(blocktime))
            .map_err(|e| AdapterError::PackFailed(e.to_string()))?;
        packed.extend_from_slice(&raw);
        Ok(packed)
    }

    fn unpack_tx(&self, packed: &[u8]) -> AdapterResult<(Tx, u32)> {
        if packed.len() < PACKED_HEADER_LEN {
            return Err(AdapterError::DeserialisationFailed(format!(
                "packed transaction too short: {} bytes",
                packed.len()
            )));
        }
        let mut reader = packed;
        let height = reader
            .read_u32::<BigEndian>()
            .map_err(|e| AdapterError::DeserialisationFailed(e.to_string()))?;
        let blocktime = reader
            .read_i64::<BigEndian>()
            .map_err(|e| AdapterError::DeserialisationFailed(e.to_string()))?;

        let transaction: Transaction = bitcoin::consensus::deserialize(reader).map_err(|e| {
            AdapterError::DeserialisationFailed(format!("Failed to deserialise packed transaction: {}", e))
        })?;

        let mut tx = self.tx_from_msg(&transaction);
        tx.blocktime = blocktime;
        Ok((tx, height))
    }
}

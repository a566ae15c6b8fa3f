use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Transaction record as produced by an adapter and as stored in fixtures
///
/// Field names follow the fixture JSON format. `confirmations`, `blocktime`
/// and `time` depend on adapter state and are not part of any comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    #[serde(default)]
    pub hex: String,
    pub txid: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default, rename = "locktime")]
    pub lock_time: u32,
    #[serde(default)]
    pub vin: Vec<Vin>,
    #[serde(default)]
    pub vout: Vec<Vout>,
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default)]
    pub blocktime: i64,
    #[serde(default)]
    pub time: i64,
}

impl Tx {
    /// Copy of this record with the adapter-state-dependent fields zeroed
    pub fn without_volatile(&self) -> Tx {
        Tx {
            confirmations: 0,
            blocktime: 0,
            time: 0,
            ..self.clone()
        }
    }
}

/// Transaction input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vin {
    /// Hex of the coinbase script, set only on coinbase inputs
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub coinbase: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub txid: String,
    #[serde(default)]
    pub vout: u32,
    #[serde(default, rename = "scriptSig")]
    pub script_sig: ScriptSig,
    #[serde(default)]
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptSig {
    #[serde(default)]
    pub hex: String,
}

/// Transaction output
///
/// `value` is the display-format amount as written in a fixture document.
/// It only exists until the fixture is loaded; from then on `value_sat`
/// is the authoritative amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vout {
    #[serde(default, rename = "valueSat", with = "sat_string")]
    pub value_sat: BigInt,
    #[serde(default, rename = "value", skip_serializing_if = "Option::is_none")]
    pub json_value: Option<serde_json::Number>,
    #[serde(default)]
    pub n: u32,
    #[serde(default, rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub hex: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Block header as reported by an adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub hash: String,
    #[serde(default, rename = "previousblockhash")]
    pub prev: String,
    #[serde(default, rename = "nextblockhash")]
    pub next: String,
    pub height: u32,
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default)]
    pub time: i64,
}

/// Block with its transactions in block order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Tx>,
}

/// Addressing mode of a block lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef<'a> {
    Hash(&'a str),
    Height(u32),
}

impl std::fmt::Display for BlockRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockRef::Hash(hash) => write!(f, "hash {}", hash),
            BlockRef::Height(height) => write!(f, "height {}", height),
        }
    }
}

/// Integer amounts travel as decimal strings in JSON
mod sat_string {
    use num_bigint::BigInt;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration issues (no tests declared, bad suite file, bad settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fixture loading - fatal to the whole run
    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),

    /// Adapter operations outside of a test procedure
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The whole run exceeded its hard timeout
    #[error("Run timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },
}

/// Errors raised by an adapter under test (or by its parser)
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Requested block is beyond the tip or unknown to the node
    #[error("Block not found")]
    BlockNotFound,

    /// Transaction is neither in the mempool nor in the chain
    #[error("Transaction not found: {txid}")]
    TransactionNotFound { txid: String },

    /// Failed to establish connection to the node
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// RPC method call failed (covers network errors, authentication, etc.)
    #[error("RPC call failed: {method} - {message}")]
    CallFailed { method: String, message: String },

    /// Retry limit exceeded for RPC operation
    #[error("Max retries exceeded: {operation}")]
    MaxRetriesExceeded { operation: String },

    /// Node returned unexpected or malformed response data
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Failed to deserialise a transaction or block
    #[error("Deserialisation failed: {0}")]
    DeserialisationFailed(String),

    /// Display amount cannot be represented as an integer amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Node does not implement the RPC method
    #[error("Method not supported by node: {method}")]
    Unsupported { method: String },

    /// Transaction cannot be packed
    #[error("Pack failed: {0}")]
    PackFailed(String),
}

/// Fixture loading errors
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Fixture document missing or unreadable
    #[error("Fixture not found: {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fixture document is not valid fixture JSON
    #[error("Fixture malformed for {coin}: {source}")]
    Malformed {
        coin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Display amount of an output could not be converted
    #[error("Amount decode failed for {txid}:{vout}: {source}")]
    AmountDecode {
        txid: String,
        vout: usize,
        #[source]
        source: AdapterError,
    },

    /// Address derivation through pack/unpack failed
    #[error("Address derivation failed for {txid}: {reason}")]
    AddressDerivation { txid: String, reason: String },
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for fixture loading
pub type FixtureResult<T> = Result<T, FixtureError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

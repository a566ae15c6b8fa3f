//! Bitcoin RPC Test Utilities and Configuration
//!
//! Provides standardised RPC configuration and helper functions for tests
//! that require a Bitcoin Core node on localhost.

use node_conformance::config::BitcoinRpcConfig;
use node_conformance::rpc::BitcoinRpcAdapter;

/// Standard test RPC URL (localhost)
pub const TEST_RPC_URL: &str = "http://localhost:8332";

/// Standard test RPC username
pub const TEST_RPC_USERNAME: &str = "bitcoin";

/// Standard test RPC password
pub const TEST_RPC_PASSWORD: &str = "bitcoin";

/// Create standard Bitcoin RPC configuration for tests
///
/// The network defaults to mainnet; set `BITCOIN_RPC_NETWORK` to point the
/// live tests at another chain.
pub fn create_test_rpc_config() -> BitcoinRpcConfig {
    BitcoinRpcConfig {
        url: TEST_RPC_URL.to_string(),
        username: TEST_RPC_USERNAME.to_string(),
        password: TEST_RPC_PASSWORD.to_string(),
        network: std::env::var("BITCOIN_RPC_NETWORK").unwrap_or_else(|_| "bitcoin".to_string()),
        timeout_seconds: 30,
        max_retries: 3,
        initial_backoff_ms: 100,
        backoff_multiplier: 1.5,
        max_backoff_seconds: 10,
    }
}

/// Create a test adapter, or a printable reason why no node is usable
pub fn create_test_rpc_adapter() -> Result<BitcoinRpcAdapter, String> {
    BitcoinRpcAdapter::new(&create_test_rpc_config())
        .map_err(|e| format!("Failed to create RPC adapter: {}", e))
}

/// Helper to check if Bitcoin RPC is available
///
/// Prints a warning naming `test_name` when it is not.
pub fn is_rpc_available(test_name: &str) -> bool {
    match test_rpc_connectivity(&create_test_rpc_config()) {
        Ok(()) => true,
        Err(e) => {
            eprintln!(
                "⚠️  Skipping {} - Bitcoin RPC not available: {}",
                test_name, e
            );
            false
        }
    }
}

/// Lightweight reachability check: a TCP connect to the RPC port
fn test_rpc_connectivity(config: &BitcoinRpcConfig) -> anyhow::Result<()> {
    use std::net::TcpStream;
    use std::time::Duration;

    let url = config
        .url
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    let host_port = if url.contains(':') {
        url.trim_end_matches('/').to_string()
    } else {
        format!("{}:8332", url)
    };
    let host_port = host_port.replace("localhost", "127.0.0.1");

    TcpStream::connect_timeout(&host_port.parse()?, Duration::from_millis(500))?;
    Ok(())
}

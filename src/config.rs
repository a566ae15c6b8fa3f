use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub bitcoin_rpc: BitcoinRpcConfig,
    pub harness: HarnessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding one `<coin>.json` fixture per coin
    pub fixtures_dir: PathBuf,
}

/// Bitcoin Core RPC configuration for the networked adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinRpcConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Network used for address decoding (bitcoin, testnet, signet, regtest)
    pub network: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_seconds: u64,
}

impl Default for BitcoinRpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8332".to_string(),
            username: "bitcoin".to_string(),
            password: "password".to_string(),
            network: "bitcoin".to_string(),
            timeout_seconds: 60,
            max_retries: 5,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_seconds: 30,
        }
    }
}

/// Knobs of the conformance procedures themselves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Attempts of the mempool reconciliation before it is inconclusive
    pub mempool_attempts: usize,
    /// Attempts of the best-block checks before they fail
    pub best_block_attempts: usize,
    /// Pause after a suspected best-block race
    pub race_backoff_ms: u64,
    /// Hard timeout for a whole run, enforced by the CLI
    pub run_timeout_seconds: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mempool_attempts: 3,
            best_block_attempts: 3,
            race_backoff_ms: 100,
            run_timeout_seconds: 600,
        }
    }
}

pub const DEFAULT_FIXTURES_DIR: &str = "./tests/test_data";

impl AppConfig {
    /// Load configuration from config.toml file and environment variables
    /// Environment variables take precedence over file configuration
    pub fn load() -> Result<Self, ConfigError> {
        let rpc = BitcoinRpcConfig::default();
        let harness = HarnessConfig::default();
        let config = Config::builder()
            .set_default("paths.fixtures_dir", DEFAULT_FIXTURES_DIR)?
            // Bitcoin RPC defaults
            .set_default("bitcoin_rpc.url", rpc.url)?
            .set_default("bitcoin_rpc.username", rpc.username)?
            .set_default("bitcoin_rpc.password", rpc.password)?
            .set_default("bitcoin_rpc.network", rpc.network)?
            .set_default("bitcoin_rpc.timeout_seconds", rpc.timeout_seconds)?
            .set_default("bitcoin_rpc.max_retries", rpc.max_retries as i64)?
            .set_default("bitcoin_rpc.initial_backoff_ms", rpc.initial_backoff_ms)?
            .set_default("bitcoin_rpc.backoff_multiplier", rpc.backoff_multiplier)?
            .set_default("bitcoin_rpc.max_backoff_seconds", rpc.max_backoff_seconds)?
            // Harness defaults
            .set_default("harness.mempool_attempts", harness.mempool_attempts as i64)?
            .set_default(
                "harness.best_block_attempts",
                harness.best_block_attempts as i64,
            )?
            .set_default("harness.race_backoff_ms", harness.race_backoff_ms)?
            .set_default("harness.run_timeout_seconds", harness.run_timeout_seconds)?
            // Load from config.toml if it exists
            .add_source(File::with_name("config").required(false))
            // BITCOIN_RPC_* env variables can override RPC settings
            .add_source(config::Environment::with_prefix("BITCOIN_RPC"))
            // CONFORMANCE_* env variables can override harness settings
            .add_source(config::Environment::with_prefix("CONFORMANCE"))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(dir) = env::var("CONFORMANCE_FIXTURES_DIR") {
            app_config.paths.fixtures_dir = PathBuf::from(dir);
        }

        if app_config.harness.mempool_attempts == 0 || app_config.harness.best_block_attempts == 0
        {
            return Err(ConfigError::Message(
                "harness attempts must be at least 1".to_string(),
            ));
        }

        Ok(app_config)
    }

    /// Get default config values for CLI argument defaults
    pub fn get_defaults() -> Result<Self, ConfigError> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(_) => Ok(Self {
                paths: PathsConfig {
                    fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
                },
                bitcoin_rpc: BitcoinRpcConfig::default(),
                harness: HarnessConfig::default(),
            }),
        }
    }
}

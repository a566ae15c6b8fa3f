use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::harness::{integration_test, tests_from_suite};
use crate::rpc::{execute_with_timeout, BitcoinRpcAdapter};
use clap::Args;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Run conformance tests against a Bitcoin Core node
#[derive(Args)]
pub struct RunCommand {
    /// Coin name; selects `<fixtures-dir>/<coin>.json`
    #[arg(long, default_value = "bitcoin")]
    pub coin: String,

    /// Fixture directory (overrides config.toml)
    #[arg(long)]
    pub fixtures_dir: Option<PathBuf>,

    /// JSON array of test names, e.g. '["GetBlockHash","MempoolSync"]'
    #[arg(long, conflicts_with = "suite")]
    pub tests: Option<String>,

    /// Suite file mapping each coin to `{"rpc": [test names]}`
    #[arg(long)]
    pub suite: Option<PathBuf>,

    /// Bitcoin RPC URL (overrides config.toml)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Bitcoin RPC username (overrides config.toml)
    #[arg(long)]
    pub rpc_username: Option<String>,

    /// Bitcoin RPC password (overrides config.toml)
    #[arg(long)]
    pub rpc_password: Option<String>,

    /// Network used to decode addresses (overrides config.toml)
    #[arg(long)]
    pub network: Option<String>,

    /// Hard timeout for the whole run in seconds (overrides config.toml)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    /// The declared tests as the JSON array the harness consumes
    pub fn test_selection(&self) -> AppResult<Value> {
        if let Some(raw) = &self.tests {
            return Ok(serde_json::from_str(raw)?);
        }
        if let Some(path) = &self.suite {
            let document = fs::read(path)?;
            let suite: Value = serde_json::from_slice(&document)?;
            return Ok(Value::from(tests_from_suite(&suite, &self.coin)?));
        }
        Err(AppError::Config(
            "No tests declared: pass --tests or --suite".to_string(),
        ))
    }

    pub async fn run(&self) -> AppResult<()> {
        info!("=== Node Conformance - {} ===", self.coin);

        let app_config = AppConfig::load().map_err(|e| AppError::Config(e.to_string()))?;
        let tests_cfg = self.test_selection()?;

        let fixtures_dir = self
            .fixtures_dir
            .clone()
            .unwrap_or(app_config.paths.fixtures_dir);
        let mut rpc_config = app_config.bitcoin_rpc;
        if let Some(url) = self.rpc_url.clone() {
            rpc_config.url = url;
        }
        if let Some(username) = self.rpc_username.clone() {
            rpc_config.username = username;
        }
        if let Some(password) = self.rpc_password.clone() {
            rpc_config.password = password;
        }
        if let Some(network) = self.network.clone() {
            rpc_config.network = network;
        }
        let settings = app_config.harness;
        let timeout_seconds = self.timeout.unwrap_or(settings.run_timeout_seconds);

        info!("Configuration:");
        info!("  Fixtures: {}", fixtures_dir.display());
        info!("  Bitcoin RPC: {}", rpc_config.url);
        info!("  Network: {}", rpc_config.network);
        info!("  Mempool attempts: {}", settings.mempool_attempts);
        info!("  Run timeout: {}s", timeout_seconds);

        let coin = self.coin.clone();
        let outcome = execute_with_timeout(timeout_seconds, move || {
            let adapter = BitcoinRpcAdapter::new(&rpc_config)?;
            integration_test(&coin, &adapter, &fixtures_dir, &tests_cfg, &settings)
        })
        .await;

        let report = match outcome {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(AppError::InvalidData(format!(
                    "Conformance run aborted: {}",
                    join_error
                )))
            }
            Err(_) => return Err(AppError::Timeout { timeout_seconds }),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report);
        }

        if !report.is_success() {
            return Err(AppError::InvalidData(format!(
                "{} of {} tests failed",
                report.failed(),
                report.results.len()
            )));
        }
        Ok(())
    }
}

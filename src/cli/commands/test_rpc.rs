use crate::config::{AppConfig, BitcoinRpcConfig};
use crate::errors::{AppError, AppResult};
use crate::rpc::{execute_with_timeout, BitcoinRpcAdapter};
use clap::Args;
use tracing::{error, info};

/// Test Bitcoin RPC connectivity
#[derive(Args)]
pub struct TestRpcCommand {
    /// Bitcoin RPC URL
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Bitcoin RPC username
    #[arg(long)]
    pub rpc_username: Option<String>,

    /// Bitcoin RPC password
    #[arg(long)]
    pub rpc_password: Option<String>,
}

impl TestRpcCommand {
    pub fn rpc_config(&self, mut rpc_config: BitcoinRpcConfig) -> BitcoinRpcConfig {
        if let Some(url) = &self.rpc_url {
            rpc_config.url = url.clone();
        }
        if let Some(username) = &self.rpc_username {
            rpc_config.username = username.clone();
        }
        if let Some(password) = &self.rpc_password {
            rpc_config.password = password.clone();
        }
        rpc_config
    }

    pub async fn run(&self) -> AppResult<()> {
        info!("=== Testing Bitcoin RPC Connection ===");

        let app_config = AppConfig::get_defaults()?;
        let rpc_config = self.rpc_config(app_config.bitcoin_rpc);
        let timeout_seconds = rpc_config.timeout_seconds;

        info!("Testing connection to: {}", rpc_config.url);
        info!("Username: {}", rpc_config.username);

        let outcome = execute_with_timeout(timeout_seconds, move || {
            let adapter = BitcoinRpcAdapter::new(&rpc_config)?;
            adapter.test_connection()
        })
        .await;

        match outcome {
            Ok(Ok(Ok((chain, blocks)))) => {
                println!("Bitcoin RPC connection test PASSED");
                println!("Chain: {}, blocks: {}", chain, blocks);
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                error!("Failed to create RPC adapter: {}", e);
                println!("Bitcoin RPC connection test FAILED");
                println!("Error: {}", e);
                println!("\nTroubleshooting tips:");
                println!("1. Check that Bitcoin Core is running");
                println!("2. Verify the RPC URL is correct");
                println!("3. Ensure RPC credentials are valid");
                println!("4. Check that RPC server is enabled in bitcoin.conf");
                Err(AppError::Adapter(e))
            }
            Ok(Err(join_error)) => Err(AppError::InvalidData(format!(
                "RPC test task failed: {}",
                join_error
            ))),
            Err(_) => Err(AppError::Timeout { timeout_seconds }),
        }
    }
}

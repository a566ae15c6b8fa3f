use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Conformance harness for blockchain node adapters
#[derive(Parser)]
#[command(name = "node-conformance")]
#[command(about = "Conformance harness for blockchain node adapters")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run conformance tests against a Bitcoin Core node
    Run(commands::run::RunCommand),
    /// List the recognized test names
    ListTests(commands::list_tests::ListTestsCommand),
    /// Test Bitcoin RPC connectivity
    TestRpc(commands::test_rpc::TestRpcCommand),
}

pub async fn run() -> AppResult<()> {
    // Initialise tracing subscriber to capture info!() macros
    // Uses RUST_LOG environment variable (defaults to "error" if not set)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(command) => command.run().await,
        Commands::ListTests(command) => command.run(),
        Commands::TestRpc(command) => command.run().await,
    }
}

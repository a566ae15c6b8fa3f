//! Conformance runner
//!
//! Maps declared test names to procedures through a flat table and runs
//! them in declaration order against one adapter and one fixture dataset.
//!
//! - **checks** - straight comparisons against fixture values and invariants
//! - **mempool** - mempool reconciliation over a live, mutating mempool

pub mod checks;
pub mod mempool;

use crate::adapter::NodeAdapter;
use crate::config::HarnessConfig;
use crate::errors::{AdapterError, AppError, AppResult};
use crate::fixture::{load_test_data, FixtureDataset};
use crate::types::{ConformanceReport, TestOutcome};
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, warn};

/// Read-only context shared by every procedure of a run
pub struct TestHandler<'a> {
    pub chain: &'a dyn NodeAdapter,
    pub test_data: &'a FixtureDataset,
    pub settings: &'a HarnessConfig,
}

/// Early exit of a procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// Stop and fail the test
    Fatal(String),
    /// Stop without a verdict; the network state carried no information
    Skip(String),
}

impl From<AdapterError> for Halt {
    fn from(err: AdapterError) -> Self {
        Halt::Fatal(err.to_string())
    }
}

/// Non-fatal assertion failures collected while a procedure keeps going
#[derive(Debug, Default)]
pub struct Findings {
    errors: Vec<String>,
}

impl Findings {
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.errors.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

pub type Procedure = fn(&TestHandler<'_>, &mut Findings) -> Result<(), Halt>;

/// Every recognized test name and the procedure behind it
pub const PROCEDURES: &[(&str, Procedure)] = &[
    ("GetBlockHash", checks::get_block_hash),
    ("GetBlock", checks::get_block),
    ("GetTransaction", checks::get_transaction),
    ("GetTransactionForMempool", checks::get_transaction_for_mempool),
    ("MempoolSync", mempool::mempool_sync),
    ("EstimateSmartFee", checks::estimate_smart_fee),
    ("EstimateFee", checks::estimate_fee),
    ("GetBestBlockHash", checks::get_best_block_hash),
    ("GetBestBlockHeight", checks::get_best_block_height),
    ("GetBlockHeader", checks::get_block_header),
];

pub fn lookup(name: &str) -> Option<Procedure> {
    PROCEDURES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, procedure)| *procedure)
}

pub fn test_names() -> impl Iterator<Item = &'static str> {
    PROCEDURES.iter().map(|(name, _)| *name)
}

/// Parse the test selection: a non-empty JSON array of test names
pub fn get_tests(cfg: &Value) -> AppResult<Vec<String>> {
    let tests: Vec<String> = serde_json::from_value(cfg.clone())
        .map_err(|e| AppError::Config(format!("Invalid test list: {}", e)))?;
    if tests.is_empty() {
        return Err(AppError::Config("No tests declared".to_string()));
    }
    Ok(tests)
}

/// Select the `rpc` test list of a coin from a suite document
/// (`{"<coin>": {"rpc": [...]}}`)
pub fn tests_from_suite(suite: &Value, coin: &str) -> AppResult<Vec<String>> {
    let declared = &suite[coin]["rpc"];
    if declared.is_null() {
        return Err(AppError::Config(format!("No tests declared for {}", coin)));
    }
    get_tests(declared)
}

/// Run a single procedure and fold its findings into an outcome
pub fn run_procedure(procedure: Procedure, handler: &TestHandler<'_>) -> TestOutcome {
    let mut findings = Findings::default();
    let halt = procedure(handler, &mut findings).err();
    let mut errors = findings.into_errors();

    match halt {
        Some(Halt::Fatal(message)) => {
            error!("{}", message);
            errors.push(message);
            TestOutcome::Failed(errors)
        }
        Some(Halt::Skip(reason)) if errors.is_empty() => TestOutcome::Inconclusive(reason),
        _ if errors.is_empty() => TestOutcome::Passed,
        _ => TestOutcome::Failed(errors),
    }
}

/// Run the named tests; unknown names fail without stopping the others
pub fn run_tests(handler: &TestHandler<'_>, tests: &[String], coin: &str) -> ConformanceReport {
    let mut report = ConformanceReport::new(coin);

    for name in tests {
        let outcome = match lookup(name) {
            Some(procedure) => {
                info!("Running {} for {}", name, coin);
                run_procedure(procedure, handler)
            }
            None => {
                error!("{}: test not found", name);
                TestOutcome::Failed(vec![format!("{}: test not found", name)])
            }
        };
        info!("{}: {}", name, outcome);
        report.push(name, outcome);
    }

    report
}

/// Full run for one coin: test selection, fixture loading, then every test
///
/// Configuration and fixture errors abort the run; everything else is
/// reported per test.
pub fn integration_test(
    coin: &str,
    chain: &dyn NodeAdapter,
    fixtures_dir: &Path,
    tests_cfg: &Value,
    settings: &HarnessConfig,
) -> AppResult<ConformanceReport> {
    let tests = get_tests(tests_cfg)?;
    let test_data = load_test_data(fixtures_dir, coin, chain.parser())?;

    let handler = TestHandler {
        chain,
        test_data: &test_data,
        settings,
    };
    Ok(run_tests(&handler, &tests, coin))
}

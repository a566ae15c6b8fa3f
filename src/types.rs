//! Conformance Harness - Type System
//!
//! - `chain`: Chain records exchanged with an adapter (Tx, Vin, Vout, Block, BlockHeader)
//! - `report`: Per-test outcomes and the run report

mod chain;
mod report;

pub use chain::*;
pub use report::*;

//! Conformance harness for blockchain node adapters
//!

pub mod adapter;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fixture;
pub mod harness;
pub mod rpc;
pub mod types;

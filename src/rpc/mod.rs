//! Bitcoin Core RPC integration module
//!
//! This module provides the networked adapter used against a real node:
//! - **Client** - `BitcoinRpcAdapter`, the `NodeAdapter` over Bitcoin Core JSON-RPC
//! - **MempoolIndex** - per-address index rebuilt by `resync_mempool`
//! - **Retry** - Exponential backoff retry utilities and timeout wrappers
//!
//! The adapter uses the synchronous `corepc-client` client; the harness
//! drives it from a single thread.

pub mod client;
pub mod mempool_index;
pub mod retry;

// Re-export main types
pub use client::BitcoinRpcAdapter;
pub use mempool_index::MempoolIndex;
pub use retry::{calculate_next_backoff, call_with_retry, execute_with_timeout, RetryPolicy};

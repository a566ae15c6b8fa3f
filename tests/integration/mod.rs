//! Integration Tests Module
//!
//! End-to-end runs: test selection, fixture loading and every procedure,
//! against the scripted adapter and, when one is reachable, a live node.

//! Unit Tests Module
//!
//! Component tests against the scripted adapter; no node required.

pub mod checks;
pub mod fixture_loader;

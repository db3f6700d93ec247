//! Treeforge library exports for testing.
//!
//! The binary in `main.rs` is a thin CLI wrapper; everything it does is
//! exposed here so the integration tests can exercise the same code paths.

pub mod config;
pub mod engine;
pub mod logging;
pub mod overrides;
pub mod process;
pub mod repo;
pub mod validate;
pub mod workspace;

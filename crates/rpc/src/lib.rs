//! Guardian RPC - operator CLI and wiring
//!
//! This crate provides the `guardian` binary, its configuration loading and
//! the context that connects store, ledger, oracle, bus and pipeline.

pub mod commands;
pub mod config;
pub mod context;

pub use config::{GuardianConfig, OracleConfig};
pub use context::AppContext;

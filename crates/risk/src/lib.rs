//! Guardian Risk Scoring Client
//!
//! Turns a [`guardian_core::TransactionContext`] into a bounded
//! [`guardian_core::RiskVerdict`] using an external oracle, without ever
//! trusting the oracle or the transaction data.
//!
//! - [`sanitize`] - prompt-injection screening (fail closed)
//! - [`prompt`] - immutable system framing
//! - [`validate`] - balanced JSON extraction and output bounds
//! - [`RiskScoringClient`] - timeout, fallback, orchestration of the above
//! - [`OpenAiOracle`], [`MockOracle`], [`UnavailableOracle`] - oracle adapters

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod openai;
pub mod oracle;
pub mod prompt;
pub mod sanitize;
pub mod validate;

pub use client::{RiskScoringClient, FLAG_SCAN_FALLBACK};
pub use config::ScoringConfig;
pub use error::{OracleError, OracleResult};
pub use mock::MockOracle;
pub use openai::OpenAiOracle;
pub use oracle::{Prompt, RiskOracle, UnavailableOracle};
pub use validate::{OutputLimits, SAFE_DEFAULT_SCORE};

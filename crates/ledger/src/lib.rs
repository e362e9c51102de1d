//! Guardian Audit Ledger
//!
//! Tamper-evident anchoring of audit actions on an external append-only ledger.
//!
//! - [`canonical`] - canonical JSON and SHA-256 content hashes
//! - [`AuditLedgerWriter`] - best-effort writes, never fails the caller
//! - [`LedgerClient`] - the seam to the external ledger
//! - [`JsonlLedger`] - local hash-chained ledger with [`chain::verify_chain`]
//! - [`InMemoryLedger`] - test double with failure injection

pub mod canonical;
pub mod chain;
pub mod client;
pub mod error;
pub mod jsonl;
pub mod memory;
pub mod writer;

pub use chain::{ChainError, LedgerRecord};
pub use client::{LedgerClient, LedgerReceipt, LedgerSubmission};
pub use error::{LedgerError, LedgerResult};
pub use jsonl::JsonlLedger;
pub use memory::InMemoryLedger;
pub use writer::{AuditLedgerWriter, LedgerOutcome};

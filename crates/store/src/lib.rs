//! Guardian Store - SQLite system of record
//!
//! Holds agents, transactions, risk assessments, alerts and the append-only
//! audit log. Ledger references are kept in a separate anchor table so audit
//! rows never need an UPDATE.

pub mod commit;
pub mod error;
mod rows;
pub mod schema;
pub mod stats;
pub mod store;

pub use commit::{
    AlertCommit, CommitOutcome, EvaluationCommit, FreezeCommit, ResolutionCommit, ScanCommit,
};
pub use error::{StoreError, StoreResult};
pub use stats::DashboardStats;
pub use store::{AuditFilter, GuardianStore, TransactionFilter};

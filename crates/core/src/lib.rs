//! Guardian Core - Domain types
//!
//! Types shared across the compliance pipeline:
//! - `Amount`, `Currency`: what a transaction moves
//! - `Transaction`, `Agent`, `Alert`: the mutable records
//! - `RiskVerdict`, `RiskAssessment`, `AuditLogEntry`: the append-only history
//! - `TransactionContext`: what the risk oracle is allowed to see

pub mod agent;
pub mod alert;
pub mod amount;
pub mod assessment;
pub mod audit;
pub mod context;
pub mod currency;
pub mod id;
pub mod transaction;

pub use agent::{Agent, AgentStatus, DEFAULT_TRUST_SCORE};
pub use alert::{Alert, AlertResolution, AlertSeverity, AlertStatus, ReviewDecision};
pub use amount::{Amount, AmountError};
pub use assessment::{OracleDecision, RiskAssessment, RiskVerdict, VerdictSource};
pub use audit::{AuditAction, AuditLogEntry};
pub use context::{HistoryItem, TransactionContext, MAX_HISTORY};
pub use currency::{Currency, CurrencyError};
pub use transaction::{ComplianceDecision, Transaction, TransactionStatus};

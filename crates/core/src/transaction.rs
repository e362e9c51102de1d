//! Transactions submitted by agents and their compliance state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::agent::Agent;
use crate::amount::Amount;
use crate::currency::Currency;
use crate::id;

/// Lifecycle status of a transaction
///
/// ```text
/// PENDING ──► EVALUATING ──► APPROVED ──► COMPLETED
///                       ├──► QUARANTINE ──► COMPLETED | BLOCKED   (human)
///                       └──► BLOCKED ─────► COMPLETED | BLOCKED   (human)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Evaluating,
    Approved,
    Completed,
    Quarantine,
    Blocked,
}

impl TransactionStatus {
    /// Statuses that only a human can move out of
    pub fn awaits_review(&self) -> bool {
        matches!(self, TransactionStatus::Quarantine | TransactionStatus::Blocked)
    }
}

/// Compliance decision attached to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceDecision {
    Pending,
    AutoApprove,
    AutoBlock,
    ManualApprove,
    ManualDeny,
}

impl ComplianceDecision {
    /// Human decisions are terminal for automated evaluation
    pub fn is_manual(&self) -> bool {
        matches!(self, ComplianceDecision::ManualApprove | ComplianceDecision::ManualDeny)
    }
}

/// A financial transaction submitted by an autonomous agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub organization_id: String,
    pub agent_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub from_address: String,
    pub to_address: String,
    pub status: TransactionStatus,
    pub decision: ComplianceDecision,
    /// Score of the latest applied evaluation
    pub risk_score: Option<f64>,
    /// Provider transfer id when ingested from a webhook
    pub external_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a fresh `PENDING` transaction owned by the agent's organization
    pub fn new(
        agent: &Agent,
        amount: Amount,
        currency: Currency,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
    ) -> Self {
        Self {
            id: id::generate(id::TRANSACTION),
            organization_id: agent.organization_id.clone(),
            agent_id: agent.id.clone(),
            amount,
            currency,
            from_address: from_address.into(),
            to_address: to_address.into(),
            status: TransactionStatus::Pending,
            decision: ComplianceDecision::Pending,
            risk_score: None,
            external_id: None,
            submitted_at: Utc::now(),
            executed_at: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// True when automated evaluation must not touch this transaction again
    pub fn is_settled(&self) -> bool {
        self.decision.is_manual() || self.status == TransactionStatus::Completed
    }
}

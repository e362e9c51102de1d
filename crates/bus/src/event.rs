//! Pipeline events for pub/sub distribution

use chrono::{DateTime, Utc};
use guardian_core::{
    AgentStatus, AlertSeverity, ComplianceDecision, ReviewDecision, TransactionStatus,
};
use serde::{Deserialize, Serialize};

/// Events emitted after a state change has been committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuardianEvent {
    /// An evaluation wrote a decision
    EvaluationCompleted {
        transaction_id: String,
        agent_id: String,
        score: f64,
        decision: ComplianceDecision,
        status: TransactionStatus,
        timestamp: DateTime<Utc>,
    },

    /// An evaluation found the transaction already settled and wrote nothing
    EvaluationYielded {
        transaction_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A new alert needs attention
    AlertRaised {
        alert_id: String,
        agent_id: String,
        transaction_id: Option<String>,
        severity: AlertSeverity,
        timestamp: DateTime<Utc>,
    },

    /// A reviewer adjudicated an alert
    AlertResolved {
        alert_id: String,
        decision: ReviewDecision,
        timestamp: DateTime<Utc>,
    },

    /// Agent quarantined, frozen or otherwise changed status
    AgentStatusChanged {
        agent_id: String,
        status: AgentStatus,
        timestamp: DateTime<Utc>,
    },
}

impl GuardianEvent {
    pub fn evaluation_completed(
        transaction_id: impl Into<String>,
        agent_id: impl Into<String>,
        score: f64,
        decision: ComplianceDecision,
        status: TransactionStatus,
    ) -> Self {
        Self::EvaluationCompleted {
            transaction_id: transaction_id.into(),
            agent_id: agent_id.into(),
            score,
            decision,
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn evaluation_yielded(transaction_id: impl Into<String>) -> Self {
        Self::EvaluationYielded {
            transaction_id: transaction_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn alert_raised(
        alert_id: impl Into<String>,
        agent_id: impl Into<String>,
        transaction_id: Option<String>,
        severity: AlertSeverity,
    ) -> Self {
        Self::AlertRaised {
            alert_id: alert_id.into(),
            agent_id: agent_id.into(),
            transaction_id,
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn alert_resolved(alert_id: impl Into<String>, decision: ReviewDecision) -> Self {
        Self::AlertResolved {
            alert_id: alert_id.into(),
            decision,
            timestamp: Utc::now(),
        }
    }

    pub fn agent_status_changed(agent_id: impl Into<String>, status: AgentStatus) -> Self {
        Self::AgentStatusChanged {
            agent_id: agent_id.into(),
            status,
            timestamp: Utc::now(),
        }
    }

    /// Stable snake_case name, used as the message subject suffix
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EvaluationCompleted { .. } => "evaluation_completed",
            Self::EvaluationYielded { .. } => "evaluation_yielded",
            Self::AlertRaised { .. } => "alert_raised",
            Self::AlertResolved { .. } => "alert_resolved",
            Self::AgentStatusChanged { .. } => "agent_status_changed",
        }
    }
}

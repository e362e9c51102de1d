//! Alerts raised for human adjudication
//!
//! Severity forms a total order: `LOW < MEDIUM < HIGH < CRITICAL`.
//! Alerts reference an agent and, when raised by an evaluation, a transaction.
//! Freezes and behavioural scans raise alerts with no transaction attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum_macros::{Display, EnumString};

use crate::id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl PartialOrd for AlertSeverity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AlertSeverity {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Reviewing,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    /// Open alerts can still be adjudicated
    pub fn is_open(&self) -> bool {
        matches!(self, AlertStatus::Pending | AlertStatus::Reviewing)
    }
}

/// Outcome chosen by a human reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approve,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertResolution {
    pub decision: ReviewDecision,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub organization_id: String,
    pub agent_id: String,
    pub transaction_id: Option<String>,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub reasons: Vec<String>,
    pub ai_explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<AlertResolution>,
}

impl Alert {
    /// Create a `PENDING` alert for an agent
    pub fn new(
        organization_id: impl Into<String>,
        agent_id: impl Into<String>,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id: id::generate(id::ALERT),
            organization_id: organization_id.into(),
            agent_id: agent_id.into(),
            transaction_id: None,
            severity,
            status: AlertStatus::Pending,
            reasons: Vec::new(),
            ai_explanation: None,
            created_at: Utc::now(),
            resolved_at: None,
            resolution: None,
        }
    }

    pub fn for_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.ai_explanation = Some(explanation.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
        assert!(AlertSeverity::High < AlertSeverity::Critical);
        assert_eq!(
            [AlertSeverity::High, AlertSeverity::Critical, AlertSeverity::Low]
                .into_iter()
                .max(),
            Some(AlertSeverity::Critical)
        );
    }

    #[test]
    fn test_alert_without_transaction() {
        let alert = Alert::new("ORG-1", "AGT-1", AlertSeverity::High)
            .with_reasons(vec!["MANUAL_FREEZE".to_string()]);
        assert!(alert.transaction_id.is_none());
        assert!(alert.status.is_open());
        assert!(alert.id.starts_with("ALRT-"));
    }

    #[test]
    fn test_closed_statuses() {
        assert!(!AlertStatus::Resolved.is_open());
        assert!(!AlertStatus::Dismissed.is_open());
        assert!(AlertStatus::Reviewing.is_open());
    }
}

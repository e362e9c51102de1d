//! Human adjudication of alerts

use guardian_core::{
    Alert, AuditAction, ComplianceDecision, ReviewDecision, Transaction, TransactionStatus,
};

use crate::decision::Outcome;
use crate::error::{ComplianceError, ComplianceResult};
use crate::transition::{self, Actor};

/// Every change a resolution commits, as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPlan {
    pub decision: ReviewDecision,
    /// New transaction state, when the alert is linked to one
    pub transaction: Option<Outcome>,
    pub quarantine_agent: bool,
    pub audit_action: AuditAction,
}

/// Plan the resolution of `alert`.
///
/// Fails when the alert is already closed or the linked transaction can no
/// longer be adjudicated.
pub fn plan_resolution(
    alert: &Alert,
    transaction: Option<&Transaction>,
    decision: ReviewDecision,
) -> ComplianceResult<ResolutionPlan> {
    if !alert.status.is_open() {
        return Err(ComplianceError::AlertClosed {
            alert_id: alert.id.clone(),
            status: alert.status,
        });
    }

    let outcome = match decision {
        ReviewDecision::Approve => Outcome {
            decision: ComplianceDecision::ManualApprove,
            status: TransactionStatus::Completed,
        },
        ReviewDecision::Block => Outcome {
            decision: ComplianceDecision::ManualDeny,
            status: TransactionStatus::Blocked,
        },
    };

    let transaction = match transaction {
        Some(tx) => {
            transition::check_transition(tx.status, outcome.status, Actor::Human)?;
            Some(outcome)
        }
        None => None,
    };

    Ok(ResolutionPlan {
        decision,
        transaction,
        quarantine_agent: decision == ReviewDecision::Block,
        audit_action: match decision {
            ReviewDecision::Approve => AuditAction::AlertApproved,
            ReviewDecision::Block => AuditAction::AlertBlocked,
        },
    })
}

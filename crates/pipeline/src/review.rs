//! Human adjudication of alerts

use chrono::Utc;
use guardian_bus::GuardianEvent;
use guardian_compliance::{plan_resolution, Outcome};
use guardian_core::{AgentStatus, AlertResolution, AuditLogEntry, ReviewDecision};
use guardian_store::ResolutionCommit;
use serde_json::json;

use crate::audit;
use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::EvaluationOrchestrator;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionReport {
    pub alert_id: String,
    pub decision: ReviewDecision,
    /// Linked transaction and the state it was moved to
    pub transaction: Option<(String, Outcome)>,
    pub agent_quarantined: bool,
    pub ledger_ref: Option<String>,
}

impl EvaluationOrchestrator {
    /// Resolve an open alert. Approve completes the linked transaction;
    /// block denies it and quarantines the agent.
    pub async fn resolve_alert(
        &self,
        alert_id: &str,
        decision: ReviewDecision,
        reason: &str,
    ) -> PipelineResult<ResolutionReport> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PipelineError::InvalidInput(
                "a reason is required to resolve an alert".to_string(),
            ));
        }

        let alert = self.store.get_alert(alert_id)?;
        let tx = alert
            .transaction_id
            .as_deref()
            .map(|id| self.store.get_transaction(id))
            .transpose()?;
        let plan = plan_resolution(&alert, tx.as_ref(), decision)?;

        let transaction = tx.as_ref().zip(plan.transaction).map(|(t, o)| (t.id.clone(), o));
        let sealed = audit::seal(
            AuditLogEntry::new(&alert.organization_id, &alert.id, plan.audit_action)
                .before(json!({
                    "alert_status": alert.status,
                    "transaction": tx.as_ref().map(|t| json!({
                        "id": t.id,
                        "status": t.status,
                        "decision": t.decision,
                    })),
                }))
                .after(json!({
                    "alert_status": "RESOLVED",
                    "transaction": transaction.as_ref().map(|(id, o)| json!({
                        "id": id,
                        "status": o.status,
                        "decision": o.decision,
                    })),
                    "quarantine_agent": plan.quarantine_agent,
                }))
                .metadata(json!({ "reason": reason, "agent_id": alert.agent_id })),
        );

        let resolution = AlertResolution {
            decision,
            reason: reason.to_string(),
        };
        let agent_quarantined = self.store.commit_resolution(ResolutionCommit {
            alert_id: &alert.id,
            resolution: &resolution,
            transaction: transaction.as_ref().map(|(id, o)| (id.as_str(), *o)),
            quarantine_agent: plan.quarantine_agent.then_some(alert.agent_id.as_str()),
            audit: &sealed.entry,
            resolved_at: Utc::now(),
        })?;

        tracing::info!(
            alert_id = %alert.id,
            decision = %decision,
            transaction_id = ?alert.transaction_id,
            "Alert resolved"
        );

        let ledger_ref = audit::anchor(&self.ledger, &self.store, &sealed).await;

        self.events.publish(GuardianEvent::alert_resolved(&alert.id, decision));
        if agent_quarantined {
            tracing::warn!(agent_id = %alert.agent_id, "Agent quarantined by reviewer");
            self.events.publish(GuardianEvent::agent_status_changed(
                &alert.agent_id,
                AgentStatus::Quarantine,
            ));
        }

        Ok(ResolutionReport {
            alert_id: alert.id,
            decision,
            transaction,
            agent_quarantined,
            ledger_ref,
        })
    }
}

//! Agent-level actions: manual wallet freeze and behavioural scan

use chrono::Utc;
use guardian_bus::GuardianEvent;
use guardian_core::{
    AgentStatus, Alert, AlertResolution, AlertSeverity, AlertStatus, AuditAction, AuditLogEntry,
    ReviewDecision, RiskVerdict, MAX_HISTORY,
};
use guardian_store::{FreezeCommit, ScanCommit};
use serde_json::json;

use crate::audit;
use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::EvaluationOrchestrator;

/// Shown in the freeze alert when the ledger write did not confirm
const PENDING_CHAIN: &str = "PENDING_CHAIN";

#[derive(Debug, Clone, PartialEq)]
pub struct FreezeReport {
    pub agent_id: String,
    pub alert_id: String,
    pub ledger_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub agent_id: String,
    pub verdict: RiskVerdict,
    pub trust_score: f64,
    pub transactions_analyzed: usize,
    pub alert_id: Option<String>,
}

impl EvaluationOrchestrator {
    /// Suspend an agent's wallet.
    ///
    /// The ledger write happens first so the alert can carry its reference;
    /// the suspension is committed even when the ledger is down.
    pub async fn freeze_agent(
        &self,
        agent_id: &str,
        reason: &str,
        wallet_id: Option<&str>,
    ) -> PipelineResult<FreezeReport> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PipelineError::InvalidInput(
                "a reason is required to freeze an agent".to_string(),
            ));
        }

        let agent = self.store.get_agent(agent_id)?;
        let sealed = audit::seal(
            AuditLogEntry::new(&agent.organization_id, &agent.id, AuditAction::FreezeAgentWallet)
                .before(json!({ "status": agent.status }))
                .after(json!({ "status": AgentStatus::Suspended }))
                .metadata(json!({
                    "reason": reason,
                    "wallet_id": wallet_id.or(agent.wallet_id.as_deref()),
                })),
        );

        let ledger_ref = self.ledger.submit(&sealed.submission).await;

        let now = Utc::now();
        let mut alert = Alert::new(&agent.organization_id, &agent.id, AlertSeverity::High)
            .with_reasons(vec!["Manual Intervention".to_string(), reason.to_string()])
            .with_explanation(format!(
                "Agent frozen by compliance officer. Audit Hash: {}.",
                ledger_ref.as_deref().unwrap_or(PENDING_CHAIN)
            ));
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(now);
        alert.resolution = Some(AlertResolution {
            decision: ReviewDecision::Block,
            reason: reason.to_string(),
        });

        self.store.commit_agent_freeze(FreezeCommit {
            agent_id: &agent.id,
            alert: &alert,
            audit: &sealed.entry,
            anchor: ledger_ref.as_deref(),
        })?;

        tracing::warn!(
            agent_id = %agent.id,
            alert_id = %alert.id,
            anchored = ledger_ref.is_some(),
            "Agent wallet frozen"
        );
        self.events.publish(GuardianEvent::agent_status_changed(&agent.id, AgentStatus::Suspended));

        Ok(FreezeReport {
            agent_id: agent.id,
            alert_id: alert.id,
            ledger_ref,
        })
    }

    /// Score an agent's recent behaviour and refresh its trust score
    pub async fn scan_agent(&self, agent_id: &str) -> PipelineResult<ScanReport> {
        let agent = self.store.get_agent(agent_id)?;
        let history = self.store.recent_history(&agent.id, MAX_HISTORY)?;

        let verdict = self.scoring.scan_agent(&agent.id, &history).await;
        let trust_score = ((1.0 - verdict.score).clamp(0.0, 1.0) * 100.0).round() / 100.0;

        let scan_audit = audit::seal(
            AuditLogEntry::new(&agent.organization_id, &agent.id, AuditAction::AgentScanned)
                .before(json!({ "trust_score": agent.trust_score }))
                .after(json!({ "trust_score": trust_score }))
                .metadata(json!({
                    "score": verdict.score,
                    "flags": verdict.flags,
                    "source": verdict.source,
                    "transactions_analyzed": history.len(),
                })),
        );

        let alert = self
            .alerts
            .policy()
            .scan_severity_for(verdict.score)
            .map(|severity| {
                let reasons = if verdict.flags.is_empty() {
                    vec![format!("Behavioural scan scored {:.2}", verdict.score)]
                } else {
                    verdict.flags.clone()
                };
                let alert = Alert::new(&agent.organization_id, &agent.id, severity)
                    .with_reasons(reasons)
                    .with_explanation(&verdict.explanation);
                let alert_audit = audit::seal(
                    AuditLogEntry::new(&agent.organization_id, &alert.id, AuditAction::AlertCreated)
                        .after(json!({
                            "severity": severity,
                            "status": alert.status,
                            "agent_id": agent.id,
                        }))
                        .metadata(json!({ "score": verdict.score, "trigger": "AGENT_SCAN" })),
                );
                (alert, alert_audit)
            });

        self.store.commit_agent_scan(ScanCommit {
            agent_id: &agent.id,
            trust_score,
            audit: &scan_audit.entry,
            alert: alert.as_ref().map(|(a, s)| (a, &s.entry)),
        })?;

        tracing::info!(
            agent_id = %agent.id,
            score = verdict.score,
            trust_score,
            transactions = history.len(),
            "Agent scanned"
        );

        audit::anchor(&self.ledger, &self.store, &scan_audit).await;
        if let Some((alert, alert_audit)) = &alert {
            audit::anchor(&self.ledger, &self.store, alert_audit).await;
            self.events.publish(GuardianEvent::alert_raised(
                &alert.id,
                &agent.id,
                None,
                alert.severity,
            ));
        }

        Ok(ScanReport {
            agent_id: agent.id,
            verdict,
            trust_score,
            transactions_analyzed: history.len(),
            alert_id: alert.map(|(a, _)| a.id),
        })
    }
}

//! Evaluation Orchestrator - runs one transaction through the pipeline
//!
//! ```text
//! transaction_id
//!        │
//!        ▼
//! ┌─────────────────┐
//! │ Risk Scoring    │──► injection / oracle failure → safe verdict
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Decision Engine │──► settled? yield, write nothing
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Alert Manager   │──► reserve alert in the breaker window
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Persist         │──► assessment + decision + audit + alert
//! └────────┬────────┘    (+ agent quarantine), one SQL transaction
//!          ▼
//! ┌─────────────────┐
//! │ Audit Ledger    │──► best-effort anchors
//! └─────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use guardian_bus::{EventPublisher, GuardianEvent};
use guardian_compliance::{AlertManager, AlertPlan, ComplianceConfig, DecisionEngine, EvaluationPlan};
use guardian_core::{
    Alert, AgentStatus, AlertSeverity, AuditAction, AuditLogEntry, ComplianceDecision,
    RiskVerdict, Transaction, TransactionContext, TransactionStatus,
};
use guardian_ledger::AuditLedgerWriter;
use guardian_risk::RiskScoringClient;
use guardian_store::{AlertCommit, CommitOutcome, EvaluationCommit, GuardianStore};
use serde_json::json;
use std::sync::Arc;

use crate::audit::{self, SealedEntry};
use crate::error::{PipelineError, PipelineResult};
use crate::guard::InFlight;

/// Alert raised by an evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct RaisedAlert {
    pub alert_id: String,
    pub severity: AlertSeverity,
    pub agent_quarantined: bool,
}

/// Alert built before the evaluation commit
struct PendingAlert {
    alert: Alert,
    plan: AlertPlan,
    audit: SealedEntry,
    quarantine: Option<SealedEntry>,
}

impl PendingAlert {
    fn commit(&self) -> AlertCommit<'_> {
        AlertCommit {
            alert: &self.alert,
            audit: &self.audit.entry,
            quarantine: self.quarantine.as_ref().map(|s| &s.entry),
        }
    }
}

/// An evaluation that wrote its decision
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedEvaluation {
    pub verdict: RiskVerdict,
    pub decision: ComplianceDecision,
    pub status: TransactionStatus,
    pub trust_score: f64,
    pub alert: Option<RaisedAlert>,
    /// Ledger reference of the evaluation audit entry
    pub ledger_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    Applied(AppliedEvaluation),
    /// The transaction was already settled; its current state is reported
    Yielded {
        decision: ComplianceDecision,
        status: TransactionStatus,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub transaction_id: String,
    pub outcome: EvaluationOutcome,
}

impl EvaluationReport {
    pub fn applied(&self) -> Option<&AppliedEvaluation> {
        match &self.outcome {
            EvaluationOutcome::Applied(applied) => Some(applied),
            EvaluationOutcome::Yielded { .. } => None,
        }
    }

    pub fn is_yielded(&self) -> bool {
        matches!(self.outcome, EvaluationOutcome::Yielded { .. })
    }
}

pub struct EvaluationOrchestrator {
    pub(crate) store: Arc<GuardianStore>,
    pub(crate) scoring: RiskScoringClient,
    pub(crate) decisions: DecisionEngine,
    pub(crate) alerts: AlertManager,
    pub(crate) ledger: AuditLedgerWriter,
    pub(crate) events: Arc<dyn EventPublisher>,
    in_flight: InFlight,
}

impl EvaluationOrchestrator {
    pub fn new(
        store: Arc<GuardianStore>,
        scoring: RiskScoringClient,
        compliance: ComplianceConfig,
        ledger: AuditLedgerWriter,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            scoring,
            decisions: DecisionEngine::new(compliance.decision),
            alerts: AlertManager::new(compliance.alerts),
            ledger,
            events,
            in_flight: InFlight::new(),
        }
    }

    pub fn store(&self) -> &GuardianStore {
        &self.store
    }

    pub fn decisions(&self) -> &DecisionEngine {
        &self.decisions
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn ledger(&self) -> &AuditLedgerWriter {
        &self.ledger
    }

    /// Replay recent evaluation alerts into the circuit breaker window.
    ///
    /// Call once at startup; returns the number of alerts replayed.
    pub fn rebuild_alert_window(&self) -> PipelineResult<usize> {
        let window = Duration::minutes(i64::from(self.alerts.policy().window_minutes));
        let recent = self.store.alerts_since(Utc::now() - window)?;
        let replayed: Vec<_> = recent
            .iter()
            .filter(|a| a.transaction_id.is_some())
            .map(|a| (a.agent_id.as_str(), a.severity, a.created_at))
            .collect();
        let count = replayed.len();
        self.alerts.rebuild(replayed);
        tracing::info!(alerts = count, "Alert window rebuilt");
        Ok(count)
    }

    /// Evaluate one transaction: score, decide, persist, alert, audit.
    pub async fn evaluate(&self, transaction_id: &str) -> PipelineResult<EvaluationReport> {
        let _guard = self
            .in_flight
            .acquire(transaction_id)
            .ok_or_else(|| PipelineError::EvaluationInFlight(transaction_id.to_string()))?;

        let tx = self.store.get_transaction(transaction_id)?;
        if tx.is_settled() {
            return Ok(self.yielded(&tx));
        }

        let history = self
            .store
            .recent_history(&tx.agent_id, self.scoring.config().history_limit() + 1)?;
        let context = TransactionContext::new(&tx, &history);
        let verdict = self.scoring.score(&context).await;

        // A reviewer may have acted while the oracle was busy
        let current = self.store.get_transaction(transaction_id)?;
        let outcome = match self.decisions.plan(&current, verdict.score) {
            EvaluationPlan::Apply(outcome) => outcome,
            EvaluationPlan::Yield(reason) => {
                tracing::info!(transaction_id, ?reason, "Evaluation yielded to prior decision");
                return Ok(self.yielded(&current));
            }
        };

        let assessment = verdict.clone().into_assessment(&current.id);
        let evaluation_audit = audit::seal(
            AuditLogEntry::new(&current.organization_id, &current.id, AuditAction::TransactionEvaluated)
                .before(json!({
                    "status": current.status,
                    "decision": current.decision,
                    "risk_score": current.risk_score,
                }))
                .after(json!({
                    "status": outcome.status,
                    "decision": outcome.decision,
                    "risk_score": verdict.score,
                }))
                .metadata(json!({
                    "assessment_id": assessment.id,
                    "flags": verdict.flags,
                    "confidence": verdict.confidence,
                    "source": verdict.source,
                    "oracle": self.scoring.oracle_id(),
                })),
        );

        let now = Utc::now();
        let pending = self.prepare_alert(&current, &verdict, now);
        let committed = self.store.commit_evaluation(EvaluationCommit {
            assessment: &assessment,
            outcome,
            audit: &evaluation_audit.entry,
            alert: pending.as_ref().map(PendingAlert::commit),
        });
        let (trust_score, agent_quarantined) = match committed {
            Ok(CommitOutcome::Applied {
                trust_score,
                agent_quarantined,
            }) => (trust_score, agent_quarantined),
            Ok(CommitOutcome::Yielded) => {
                self.release_alert(&current, pending.as_ref(), now);
                let settled = self.store.get_transaction(transaction_id)?;
                return Ok(self.yielded(&settled));
            }
            Err(e) => {
                self.release_alert(&current, pending.as_ref(), now);
                return Err(e.into());
            }
        };

        tracing::info!(
            transaction_id,
            agent_id = %current.agent_id,
            score = verdict.score,
            decision = %outcome.decision,
            status = %outcome.status,
            "Transaction evaluated"
        );

        let ledger_ref = audit::anchor(&self.ledger, &self.store, &evaluation_audit).await;
        if let Some(pending) = &pending {
            audit::anchor(&self.ledger, &self.store, &pending.audit).await;
            if agent_quarantined {
                if let Some(quarantine) = &pending.quarantine {
                    audit::anchor(&self.ledger, &self.store, quarantine).await;
                }
            }
        }

        self.events.publish(GuardianEvent::evaluation_completed(
            &current.id,
            &current.agent_id,
            verdict.score,
            outcome.decision,
            outcome.status,
        ));
        let alert = pending.map(|pending| self.announce_alert(&current, pending, agent_quarantined));

        Ok(EvaluationReport {
            transaction_id: current.id,
            outcome: EvaluationOutcome::Applied(AppliedEvaluation {
                verdict,
                decision: outcome.decision,
                status: outcome.status,
                trust_score,
                alert,
                ledger_ref,
            }),
        })
    }

    /// Build the alert for a score above the alert threshold.
    ///
    /// The alert is reserved in the circuit breaker window before it is
    /// committed; a failed or yielded commit releases it.
    fn prepare_alert(&self, tx: &Transaction, verdict: &RiskVerdict, now: DateTime<Utc>) -> Option<PendingAlert> {
        let plan = self.alerts.reserve(&tx.agent_id, verdict.score, now)?;

        let reasons = if verdict.flags.is_empty() {
            vec![format!("Risk score {:.2} above alert threshold", verdict.score)]
        } else {
            verdict.flags.clone()
        };
        let alert = Alert::new(&tx.organization_id, &tx.agent_id, plan.severity)
            .for_transaction(&tx.id)
            .with_reasons(reasons)
            .with_explanation(&verdict.explanation);

        let audit = audit::seal(
            AuditLogEntry::new(&tx.organization_id, &alert.id, AuditAction::AlertCreated)
                .after(json!({
                    "severity": plan.severity,
                    "status": alert.status,
                    "transaction_id": tx.id,
                    "agent_id": tx.agent_id,
                }))
                .metadata(json!({ "score": verdict.score })),
        );
        let quarantine = plan.quarantine_agent.then(|| {
            audit::seal(
                AuditLogEntry::new(&tx.organization_id, &tx.agent_id, AuditAction::AgentQuarantined)
                    .after(json!({ "status": AgentStatus::Quarantine }))
                    .metadata(json!({
                        "trigger_alert_id": alert.id,
                        "high_or_worse_in_window": plan.counts.high_or_worse,
                        "critical_in_window": plan.counts.critical,
                        "window_minutes": self.alerts.policy().window_minutes,
                    })),
            )
        });

        Some(PendingAlert {
            alert,
            plan,
            audit,
            quarantine,
        })
    }

    fn release_alert(&self, tx: &Transaction, pending: Option<&PendingAlert>, reserved_at: DateTime<Utc>) {
        if let Some(pending) = pending {
            self.alerts.release(&tx.agent_id, pending.plan.severity, reserved_at);
        }
    }

    /// Log and publish a committed alert
    fn announce_alert(&self, tx: &Transaction, pending: PendingAlert, agent_quarantined: bool) -> RaisedAlert {
        let PendingAlert { alert, plan, .. } = pending;
        tracing::warn!(
            alert_id = %alert.id,
            transaction_id = %tx.id,
            agent_id = %tx.agent_id,
            severity = %plan.severity,
            "Compliance alert raised"
        );
        self.events.publish(GuardianEvent::alert_raised(
            &alert.id,
            &tx.agent_id,
            Some(tx.id.clone()),
            plan.severity,
        ));

        if agent_quarantined {
            tracing::warn!(agent_id = %tx.agent_id, "Agent quarantined by circuit breaker");
            self.events.publish(GuardianEvent::agent_status_changed(
                &tx.agent_id,
                AgentStatus::Quarantine,
            ));
        }

        RaisedAlert {
            alert_id: alert.id,
            severity: plan.severity,
            agent_quarantined,
        }
    }

    fn yielded(&self, tx: &Transaction) -> EvaluationReport {
        self.events.publish(GuardianEvent::evaluation_yielded(&tx.id));
        EvaluationReport {
            transaction_id: tx.id.clone(),
            outcome: EvaluationOutcome::Yielded {
                decision: tx.decision,
                status: tx.status,
            },
        }
    }
}

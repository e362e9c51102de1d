//! Atomic multi-row commits
//!
//! Each commit runs in one SQLite transaction: either every row it touches
//! is written or none is. Conditional updates guard against racing writers;
//! the losing side sees `Yielded` or `Conflict` instead of overwriting.

use chrono::{DateTime, Utc};
use guardian_compliance::{trust_from_scores, Outcome};
use guardian_core::{
    Alert, AlertResolution, AuditLogEntry, RiskAssessment, TransactionStatus, MAX_HISTORY,
};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{StoreError, StoreResult};
use crate::rows;
use crate::store::{recent_scores, GuardianStore};

/// One applied evaluation: the assessment, the decision, its audit entry
/// and the alert it raised, if any
#[derive(Debug, Clone, Copy)]
pub struct EvaluationCommit<'a> {
    pub assessment: &'a RiskAssessment,
    pub outcome: Outcome,
    pub audit: &'a AuditLogEntry,
    pub alert: Option<AlertCommit<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommitOutcome {
    /// Decision written; the agent's trust score was refreshed
    Applied {
        trust_score: f64,
        /// The alert tripped the circuit breaker on a still-active agent
        agent_quarantined: bool,
    },
    /// A manual decision or completion got there first; nothing was written
    Yielded,
}

/// A new alert, optionally quarantining its agent
#[derive(Debug, Clone, Copy)]
pub struct AlertCommit<'a> {
    pub alert: &'a Alert,
    pub audit: &'a AuditLogEntry,
    /// Present when the circuit breaker tripped
    pub quarantine: Option<&'a AuditLogEntry>,
}

/// A human adjudication of an open alert
#[derive(Debug, Clone, Copy)]
pub struct ResolutionCommit<'a> {
    pub alert_id: &'a str,
    pub resolution: &'a AlertResolution,
    pub transaction: Option<(&'a str, Outcome)>,
    pub quarantine_agent: Option<&'a str>,
    pub audit: &'a AuditLogEntry,
    pub resolved_at: DateTime<Utc>,
}

/// Manual wallet freeze
#[derive(Debug, Clone, Copy)]
pub struct FreezeCommit<'a> {
    pub agent_id: &'a str,
    pub alert: &'a Alert,
    pub audit: &'a AuditLogEntry,
    /// Ledger reference obtained before the commit
    pub anchor: Option<&'a str>,
}

/// Result of an agent-level scan
#[derive(Debug, Clone, Copy)]
pub struct ScanCommit<'a> {
    pub agent_id: &'a str,
    pub trust_score: f64,
    pub audit: &'a AuditLogEntry,
    pub alert: Option<(&'a Alert, &'a AuditLogEntry)>,
}

impl GuardianStore {
    /// Write an evaluation result unless a human decision or completion
    /// already happened.
    pub fn commit_evaluation(&self, commit: EvaluationCommit<'_>) -> StoreResult<CommitOutcome> {
        let transaction_id = commit.assessment.transaction_id.as_str();
        let mut conn = self.lock()?;
        let db = conn.transaction()?;

        let agent_id: String = db
            .query_row(
                "SELECT agent_id FROM transactions WHERE id = ?1",
                params![transaction_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("Transaction", transaction_id))?;

        let updated = db.execute(
            "UPDATE transactions SET status = ?1, decision = ?2, risk_score = ?3
             WHERE id = ?4
               AND decision NOT IN ('MANUAL_APPROVE', 'MANUAL_DENY')
               AND status != 'COMPLETED'",
            params![
                commit.outcome.status.to_string(),
                commit.outcome.decision.to_string(),
                commit.assessment.score,
                transaction_id,
            ],
        )?;
        if updated == 0 {
            tracing::debug!(transaction_id, "Evaluation yielded to a settled transaction");
            // Dropping `db` rolls back
            return Ok(CommitOutcome::Yielded);
        }

        rows::insert_assessment(&db, commit.assessment)?;
        rows::insert_audit(&db, commit.audit)?;
        let agent_quarantined = match &commit.alert {
            Some(alert) => write_alert(&db, alert)?,
            None => false,
        };

        let scores = recent_scores(&db, &agent_id, MAX_HISTORY)?;
        let trust_score = trust_from_scores(&scores);
        db.execute(
            "UPDATE agents SET trust_score = ?1 WHERE id = ?2",
            params![trust_score, agent_id],
        )?;

        db.commit()?;
        Ok(CommitOutcome::Applied {
            trust_score,
            agent_quarantined,
        })
    }

    /// Insert a standalone alert; returns whether the agent was moved to
    /// QUARANTINE.
    pub fn commit_alert(&self, commit: AlertCommit<'_>) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let db = conn.transaction()?;
        let quarantined = write_alert(&db, &commit)?;
        db.commit()?;
        Ok(quarantined)
    }

    /// Resolve an open alert and apply the human decision.
    ///
    /// Returns whether the agent was moved to QUARANTINE; an agent that is
    /// already quarantined, suspended or archived keeps its status.
    /// Fails with `Conflict` when the alert is no longer open or the
    /// transaction has been completed in the meantime.
    pub fn commit_resolution(&self, commit: ResolutionCommit<'_>) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let db = conn.transaction()?;

        let updated = db.execute(
            "UPDATE alerts
             SET status = 'RESOLVED', resolved_at = ?1,
                 resolution_decision = ?2, resolution_reason = ?3
             WHERE id = ?4 AND status IN ('PENDING', 'REVIEWING')",
            params![
                rows::timestamp(&commit.resolved_at),
                commit.resolution.decision.to_string(),
                commit.resolution.reason,
                commit.alert_id,
            ],
        )?;
        if updated == 0 {
            let exists: bool = db.query_row(
                "SELECT EXISTS(SELECT 1 FROM alerts WHERE id = ?1)",
                params![commit.alert_id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                StoreError::Conflict(format!("alert {} is already closed", commit.alert_id))
            } else {
                StoreError::not_found("Alert", commit.alert_id)
            });
        }

        if let Some((transaction_id, outcome)) = commit.transaction {
            let executed_at = (outcome.status == TransactionStatus::Completed)
                .then(|| rows::timestamp(&commit.resolved_at));
            let updated = db.execute(
                "UPDATE transactions
                 SET status = ?1, decision = ?2, executed_at = COALESCE(?3, executed_at)
                 WHERE id = ?4 AND status != 'COMPLETED'",
                params![
                    outcome.status.to_string(),
                    outcome.decision.to_string(),
                    executed_at,
                    transaction_id,
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::Conflict(format!(
                    "transaction {} was completed before the review",
                    transaction_id
                )));
            }
        }

        let quarantined = match commit.quarantine_agent {
            Some(agent_id) => quarantine_agent(&db, agent_id)?,
            None => false,
        };

        rows::insert_audit(&db, commit.audit)?;
        db.commit()?;
        Ok(quarantined)
    }

    /// Suspend an agent's wallet and record the intervention
    pub fn commit_agent_freeze(&self, commit: FreezeCommit<'_>) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let db = conn.transaction()?;

        let updated = db.execute(
            "UPDATE agents SET status = 'SUSPENDED' WHERE id = ?1",
            params![commit.agent_id],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found("Agent", commit.agent_id));
        }

        rows::insert_alert(&db, commit.alert)?;
        rows::insert_audit(&db, commit.audit)?;
        if let Some(reference) = commit.anchor {
            rows::insert_anchor(&db, &commit.audit.id, reference, &Utc::now())?;
        }

        db.commit()?;
        Ok(())
    }

    /// Store a scan result: trust score, audit entry and optional alert
    pub fn commit_agent_scan(&self, commit: ScanCommit<'_>) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let db = conn.transaction()?;

        let updated = db.execute(
            "UPDATE agents SET trust_score = ?1 WHERE id = ?2",
            params![commit.trust_score, commit.agent_id],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found("Agent", commit.agent_id));
        }

        rows::insert_audit(&db, commit.audit)?;
        if let Some((alert, alert_audit)) = commit.alert {
            rows::insert_alert(&db, alert)?;
            rows::insert_audit(&db, alert_audit)?;
        }

        db.commit()?;
        Ok(())
    }
}

/// Only ACTIVE or PAUSED agents move to QUARANTINE
fn quarantine_agent(db: &Connection, agent_id: &str) -> StoreResult<bool> {
    let updated = db.execute(
        "UPDATE agents SET status = 'QUARANTINE'
         WHERE id = ?1 AND status IN ('ACTIVE', 'PAUSED')",
        params![agent_id],
    )?;
    Ok(updated > 0)
}

/// Insert an alert inside an open transaction.
///
/// The quarantine audit entry is written only when the agent actually
/// changed status, so a repeated trip leaves a single entry.
fn write_alert(db: &Connection, commit: &AlertCommit<'_>) -> StoreResult<bool> {
    rows::insert_alert(db, commit.alert)?;
    rows::insert_audit(db, commit.audit)?;

    let Some(quarantine_audit) = commit.quarantine else {
        return Ok(false);
    };
    if !quarantine_agent(db, &commit.alert.agent_id)? {
        return Ok(false);
    }
    rows::insert_audit(db, quarantine_audit)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AuditFilter;
    use guardian_core::{
        Agent, AgentStatus, AlertSeverity, AlertStatus, Amount, AuditAction, ComplianceDecision,
        Currency, OracleDecision, ReviewDecision, RiskVerdict, Transaction, VerdictSource,
    };
    use rust_decimal_macros::dec;

    fn seed(store: &GuardianStore) -> (Agent, Transaction) {
        let agent = Agent::new("ORG-1", "payments-bot", "0xagent");
        store.insert_agent(&agent).unwrap();
        let tx = Transaction::new(
            &agent,
            Amount::new(dec!(2000)).unwrap(),
            Currency::Usdc,
            "0xagent",
            "0xmerchant",
        );
        let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionIngested);
        store.insert_transaction(&tx, &audit).unwrap();
        (agent, tx)
    }

    fn verdict(score: f64) -> RiskVerdict {
        RiskVerdict {
            score,
            recommendation: OracleDecision::from_score(score),
            explanation: "test".to_string(),
            flags: vec![],
            confidence: 0.9,
            requires_human_review: score > 0.6,
            source: VerdictSource::Oracle,
        }
    }

    fn quarantine() -> Outcome {
        Outcome {
            decision: ComplianceDecision::Pending,
            status: TransactionStatus::Quarantine,
        }
    }

    fn evaluate(store: &GuardianStore, tx: &Transaction, score: f64, outcome: Outcome) -> CommitOutcome {
        let assessment = verdict(score).into_assessment(&tx.id);
        let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionEvaluated);
        store
            .commit_evaluation(EvaluationCommit {
                assessment: &assessment,
                outcome,
                audit: &audit,
                alert: None,
            })
            .unwrap()
    }

    fn open_alert(store: &GuardianStore, agent: &Agent, tx: &Transaction) -> Alert {
        let alert = Alert::new("ORG-1", &agent.id, AlertSeverity::High).for_transaction(&tx.id);
        let audit = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertCreated);
        store
            .commit_alert(AlertCommit {
                alert: &alert,
                audit: &audit,
                quarantine: None,
            })
            .unwrap();
        alert
    }

    #[test]
    fn test_commit_evaluation_applies() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, tx) = seed(&store);

        let result = evaluate(&store, &tx, 0.85, quarantine());
        assert_eq!(
            result,
            CommitOutcome::Applied {
                trust_score: 0.15,
                agent_quarantined: false
            }
        );

        let loaded = store.get_transaction(&tx.id).unwrap();
        assert_eq!(loaded.status, TransactionStatus::Quarantine);
        assert_eq!(loaded.decision, ComplianceDecision::Pending);
        assert_eq!(loaded.risk_score, Some(0.85));

        assert_eq!(store.assessments_for(&tx.id).unwrap().len(), 1);
        assert_eq!(store.get_agent(&agent.id).unwrap().trust_score, 0.15);
    }

    #[test]
    fn test_commit_evaluation_unknown_transaction() {
        let store = GuardianStore::in_memory().unwrap();
        seed(&store);
        let assessment = verdict(0.1).into_assessment("TX-missing");
        let audit = AuditLogEntry::new("ORG-1", "TX-missing", AuditAction::TransactionEvaluated);

        let result = store.commit_evaluation(EvaluationCommit {
            assessment: &assessment,
            outcome: quarantine(),
            audit: &audit,
            alert: None,
        });
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_commit_evaluation_yields_to_manual_decision() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, tx) = seed(&store);
        evaluate(&store, &tx, 0.85, quarantine());
        let alert = open_alert(&store, &agent, &tx);

        let resolution = AlertResolution {
            decision: ReviewDecision::Approve,
            reason: "known counterparty".to_string(),
        };
        let audit = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertApproved);
        store
            .commit_resolution(ResolutionCommit {
                alert_id: &alert.id,
                resolution: &resolution,
                transaction: Some((
                    &tx.id,
                    Outcome {
                        decision: ComplianceDecision::ManualApprove,
                        status: TransactionStatus::Completed,
                    },
                )),
                quarantine_agent: None,
                audit: &audit,
                resolved_at: Utc::now(),
            })
            .unwrap();

        // A late evaluation must not overwrite the human decision
        let result = evaluate(&store, &tx, 0.99, quarantine());
        assert_eq!(result, CommitOutcome::Yielded);

        let loaded = store.get_transaction(&tx.id).unwrap();
        assert_eq!(loaded.decision, ComplianceDecision::ManualApprove);
        assert_eq!(loaded.status, TransactionStatus::Completed);
        assert!(loaded.executed_at.is_some());
        assert_eq!(loaded.risk_score, Some(0.85));
        // No assessment or audit row from the yielded attempt
        assert_eq!(store.assessments_for(&tx.id).unwrap().len(), 1);
        let evaluated = store
            .audit_log(&AuditFilter {
                action: Some(AuditAction::TransactionEvaluated),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(evaluated.len(), 1);
    }

    #[test]
    fn test_commit_alert_quarantines_once() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, tx) = seed(&store);

        for _ in 0..2 {
            let alert = Alert::new("ORG-1", &agent.id, AlertSeverity::Critical).for_transaction(&tx.id);
            let audit = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertCreated);
            let q = AuditLogEntry::new("ORG-1", &agent.id, AuditAction::AgentQuarantined);
            store
                .commit_alert(AlertCommit {
                    alert: &alert,
                    audit: &audit,
                    quarantine: Some(&q),
                })
                .unwrap();
        }

        assert_eq!(store.get_agent(&agent.id).unwrap().status, AgentStatus::Quarantine);
        let quarantines = store
            .audit_log(&AuditFilter {
                action: Some(AuditAction::AgentQuarantined),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(quarantines.len(), 1);
        assert_eq!(store.list_alerts(Some(AlertStatus::Pending)).unwrap().len(), 2);
    }

    #[test]
    fn test_resolution_block_and_double_resolve() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, tx) = seed(&store);
        evaluate(&store, &tx, 0.85, quarantine());
        let alert = open_alert(&store, &agent, &tx);

        let resolution = AlertResolution {
            decision: ReviewDecision::Block,
            reason: "mixer destination".to_string(),
        };
        let blocked = Outcome {
            decision: ComplianceDecision::ManualDeny,
            status: TransactionStatus::Blocked,
        };
        let commit = |audit: &AuditLogEntry| {
            store.commit_resolution(ResolutionCommit {
                alert_id: &alert.id,
                resolution: &resolution,
                transaction: Some((&tx.id, blocked)),
                quarantine_agent: Some(&agent.id),
                audit,
                resolved_at: Utc::now(),
            })
        };

        let audit = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertBlocked);
        assert!(commit(&audit).unwrap());

        let loaded = store.get_alert(&alert.id).unwrap();
        assert_eq!(loaded.status, AlertStatus::Resolved);
        assert_eq!(loaded.resolution.unwrap().decision, ReviewDecision::Block);
        assert_eq!(store.get_transaction(&tx.id).unwrap().decision, ComplianceDecision::ManualDeny);
        assert_eq!(store.get_agent(&agent.id).unwrap().status, AgentStatus::Quarantine);

        let again = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertBlocked);
        assert!(matches!(commit(&again), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_resolution_keeps_suspended_agent() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, tx) = seed(&store);
        evaluate(&store, &tx, 0.85, quarantine());
        let alert = open_alert(&store, &agent, &tx);
        store
            .lock()
            .unwrap()
            .execute(
                "UPDATE agents SET status = 'SUSPENDED' WHERE id = ?1",
                params![agent.id],
            )
            .unwrap();

        let resolution = AlertResolution {
            decision: ReviewDecision::Block,
            reason: "stolen key".to_string(),
        };
        let audit = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertBlocked);
        let quarantined = store
            .commit_resolution(ResolutionCommit {
                alert_id: &alert.id,
                resolution: &resolution,
                transaction: Some((
                    &tx.id,
                    Outcome {
                        decision: ComplianceDecision::ManualDeny,
                        status: TransactionStatus::Blocked,
                    },
                )),
                quarantine_agent: Some(&agent.id),
                audit: &audit,
                resolved_at: Utc::now(),
            })
            .unwrap();

        assert!(!quarantined);
        assert_eq!(store.get_agent(&agent.id).unwrap().status, AgentStatus::Suspended);
        assert_eq!(store.get_transaction(&tx.id).unwrap().status, TransactionStatus::Blocked);
    }

    #[test]
    fn test_commit_evaluation_with_alert_quarantines() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, tx) = seed(&store);

        let assessment = verdict(0.97).into_assessment(&tx.id);
        let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionEvaluated);
        let alert = Alert::new("ORG-1", &agent.id, AlertSeverity::Critical).for_transaction(&tx.id);
        let alert_audit = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertCreated);
        let q = AuditLogEntry::new("ORG-1", &agent.id, AuditAction::AgentQuarantined);

        let result = store
            .commit_evaluation(EvaluationCommit {
                assessment: &assessment,
                outcome: quarantine(),
                audit: &audit,
                alert: Some(AlertCommit {
                    alert: &alert,
                    audit: &alert_audit,
                    quarantine: Some(&q),
                }),
            })
            .unwrap();

        assert!(matches!(
            result,
            CommitOutcome::Applied {
                agent_quarantined: true,
                ..
            }
        ));
        assert_eq!(store.get_alert(&alert.id).unwrap().severity, AlertSeverity::Critical);
        assert_eq!(store.get_agent(&agent.id).unwrap().status, AgentStatus::Quarantine);
    }

    #[test]
    fn test_failed_alert_insert_rolls_back_evaluation() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, tx) = seed(&store);
        store
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_alerts BEFORE INSERT ON alerts
                 BEGIN SELECT RAISE(ABORT, 'alerts table unavailable'); END;",
            )
            .unwrap();

        let assessment = verdict(0.85).into_assessment(&tx.id);
        let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionEvaluated);
        let alert = Alert::new("ORG-1", &agent.id, AlertSeverity::High).for_transaction(&tx.id);
        let alert_audit = AuditLogEntry::new("ORG-1", &alert.id, AuditAction::AlertCreated);

        let result = store.commit_evaluation(EvaluationCommit {
            assessment: &assessment,
            outcome: quarantine(),
            audit: &audit,
            alert: Some(AlertCommit {
                alert: &alert,
                audit: &alert_audit,
                quarantine: None,
            }),
        });
        assert!(result.is_err());

        // Nothing from the failed commit is visible
        let loaded = store.get_transaction(&tx.id).unwrap();
        assert_eq!(loaded.status, TransactionStatus::Pending);
        assert_eq!(loaded.risk_score, None);
        assert!(store.assessments_for(&tx.id).unwrap().is_empty());
        assert!(store
            .audit_log(&AuditFilter {
                action: Some(AuditAction::TransactionEvaluated),
                ..Default::default()
            })
            .unwrap()
            .is_empty());
        assert_eq!(store.get_agent(&agent.id).unwrap().trust_score, agent.trust_score);
    }

    #[test]
    fn test_resolution_unknown_alert() {
        let store = GuardianStore::in_memory().unwrap();
        let resolution = AlertResolution {
            decision: ReviewDecision::Approve,
            reason: "ok".to_string(),
        };
        let audit = AuditLogEntry::new("ORG-1", "ALRT-missing", AuditAction::AlertApproved);
        let result = store.commit_resolution(ResolutionCommit {
            alert_id: "ALRT-missing",
            resolution: &resolution,
            transaction: None,
            quarantine_agent: None,
            audit: &audit,
            resolved_at: Utc::now(),
        });
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_freeze_commit() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, _) = seed(&store);

        let mut alert = Alert::new("ORG-1", &agent.id, AlertSeverity::High)
            .with_reasons(vec!["Manual Intervention".to_string(), "stolen key".to_string()]);
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(Utc::now());
        let audit = AuditLogEntry::new("ORG-1", &agent.id, AuditAction::FreezeAgentWallet);

        store
            .commit_agent_freeze(FreezeCommit {
                agent_id: &agent.id,
                alert: &alert,
                audit: &audit,
                anchor: Some("ledger-ref"),
            })
            .unwrap();

        assert_eq!(store.get_agent(&agent.id).unwrap().status, AgentStatus::Suspended);
        let stored = store.get_alert(&alert.id).unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert!(stored.transaction_id.is_none());
        assert_eq!(
            store.get_audit_entry(&audit.id).unwrap().ledger_ref.as_deref(),
            Some("ledger-ref")
        );
    }

    #[test]
    fn test_scan_commit_updates_trust() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, _) = seed(&store);

        let audit = AuditLogEntry::new("ORG-1", &agent.id, AuditAction::AgentScanned);
        store
            .commit_agent_scan(ScanCommit {
                agent_id: &agent.id,
                trust_score: 0.8,
                audit: &audit,
                alert: None,
            })
            .unwrap();
        assert_eq!(store.get_agent(&agent.id).unwrap().trust_score, 0.8);

        let missing = store.commit_agent_scan(ScanCommit {
            agent_id: "AGT-missing",
            trust_score: 0.8,
            audit: &audit,
            alert: None,
        });
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }
}

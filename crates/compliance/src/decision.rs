//! Decision Engine - maps a risk score onto a binding decision
//!
//! Bands (defaults):
//!
//! ```text
//! 0.0 ──── 0.3 ─────────────── 0.7 ──── 1.0
//!  AUTO_APPROVE │  PENDING/QUARANTINE  │ AUTO_BLOCK
//!   APPROVED    │  (both ends inclusive)│  BLOCKED
//! ```
//!
//! A score exactly on a threshold always goes to human review.

use guardian_core::{ComplianceDecision, Transaction, TransactionStatus};
use serde::{Deserialize, Serialize};

use crate::transition::{self, Actor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// Scores strictly below are auto-approved
    #[serde(default = "default_auto_approve_threshold")]
    pub auto_approve_threshold: f64,

    /// Scores strictly above are auto-blocked
    #[serde(default = "default_auto_block_threshold")]
    pub auto_block_threshold: f64,
}

fn default_auto_approve_threshold() -> f64 {
    0.3
}

fn default_auto_block_threshold() -> f64 {
    0.7
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            auto_approve_threshold: default_auto_approve_threshold(),
            auto_block_threshold: default_auto_block_threshold(),
        }
    }
}

/// Decision and status written together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub decision: ComplianceDecision,
    pub status: TransactionStatus,
}

/// Why an evaluation did not write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YieldReason {
    /// A human already decided
    ManualDecision(ComplianceDecision),
    /// The transaction was executed
    Completed,
}

/// What an evaluation should do with the current transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationPlan {
    Apply(Outcome),
    Yield(YieldReason),
}

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    policy: DecisionPolicy,
}

impl DecisionEngine {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Pure threshold mapping
    pub fn decide(&self, score: f64) -> Outcome {
        if score < self.policy.auto_approve_threshold {
            Outcome {
                decision: ComplianceDecision::AutoApprove,
                status: TransactionStatus::Approved,
            }
        } else if score > self.policy.auto_block_threshold {
            Outcome {
                decision: ComplianceDecision::AutoBlock,
                status: TransactionStatus::Blocked,
            }
        } else {
            Outcome {
                decision: ComplianceDecision::Pending,
                status: TransactionStatus::Quarantine,
            }
        }
    }

    /// Decide against the current state, yielding to human decisions
    pub fn plan(&self, current: &Transaction, score: f64) -> EvaluationPlan {
        if current.decision.is_manual() {
            return EvaluationPlan::Yield(YieldReason::ManualDecision(current.decision));
        }
        if current.status == TransactionStatus::Completed {
            return EvaluationPlan::Yield(YieldReason::Completed);
        }

        let outcome = self.decide(score);
        if !transition::is_allowed(current.status, outcome.status, Actor::Automated) {
            // Only COMPLETED is unreachable here and it is handled above.
            tracing::warn!(
                transaction_id = %current.id,
                from = %current.status,
                to = %outcome.status,
                "Unexpected automated transition"
            );
            return EvaluationPlan::Yield(YieldReason::Completed);
        }
        EvaluationPlan::Apply(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_core::{Agent, Amount, Currency};

    fn engine() -> DecisionEngine {
        DecisionEngine::default()
    }

    fn tx() -> Transaction {
        let agent = Agent::new("ORG-1", "bot", "0x1");
        Transaction::new(&agent, Amount::ZERO, Currency::Usdc, "0x1", "0x2")
    }

    #[test]
    fn test_bands() {
        let e = engine();
        assert_eq!(e.decide(0.0).decision, ComplianceDecision::AutoApprove);
        assert_eq!(e.decide(0.29).status, TransactionStatus::Approved);
        assert_eq!(e.decide(0.5).decision, ComplianceDecision::Pending);
        assert_eq!(e.decide(0.5).status, TransactionStatus::Quarantine);
        assert_eq!(e.decide(0.71).decision, ComplianceDecision::AutoBlock);
        assert_eq!(e.decide(1.0).status, TransactionStatus::Blocked);
    }

    #[test]
    fn test_thresholds_go_to_review() {
        let e = engine();
        assert_eq!(e.decide(0.3).status, TransactionStatus::Quarantine);
        assert_eq!(e.decide(0.7).status, TransactionStatus::Quarantine);
    }

    #[test]
    fn test_custom_policy() {
        let e = DecisionEngine::new(DecisionPolicy {
            auto_approve_threshold: 0.3,
            auto_block_threshold: 0.95,
        });
        assert_eq!(e.decide(0.85).status, TransactionStatus::Quarantine);
        assert_eq!(e.decide(0.95).status, TransactionStatus::Quarantine);
        assert_eq!(e.decide(0.96).status, TransactionStatus::Blocked);
    }

    #[test]
    fn test_plan_yields_to_manual_decision() {
        let mut current = tx();
        current.status = TransactionStatus::Blocked;
        current.decision = ComplianceDecision::ManualDeny;

        assert_eq!(
            engine().plan(&current, 0.01),
            EvaluationPlan::Yield(YieldReason::ManualDecision(ComplianceDecision::ManualDeny))
        );
    }

    #[test]
    fn test_plan_yields_when_completed() {
        let mut current = tx();
        current.status = TransactionStatus::Completed;
        current.decision = ComplianceDecision::AutoApprove;
        assert_eq!(engine().plan(&current, 0.9), EvaluationPlan::Yield(YieldReason::Completed));
    }

    #[test]
    fn test_last_evaluation_wins() {
        let mut current = tx();
        current.status = TransactionStatus::Quarantine;
        current.decision = ComplianceDecision::Pending;

        match engine().plan(&current, 0.1) {
            EvaluationPlan::Apply(outcome) => assert_eq!(outcome.status, TransactionStatus::Approved),
            other => panic!("expected apply, got {:?}", other),
        }
    }
}

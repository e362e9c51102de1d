//! Transaction state machine
//!
//! ```text
//!            automated                         human
//! PENDING ──► EVALUATING ──► APPROVED ───────► COMPLETED (execution)
//!    │            │      ├──► QUARANTINE ─┬──► COMPLETED (approve)
//!    └────────────┴──────┴──► BLOCKED ────┴──► BLOCKED   (deny)
//! ```
//!
//! Automated evaluation may move between the three outcome states while no
//! human decision exists (last evaluation wins). `COMPLETED` is final.

use guardian_core::TransactionStatus;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::{ComplianceError, ComplianceResult};

/// Who is driving a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Actor {
    Automated,
    Human,
}

/// Whether `actor` may move a transaction from `from` to `to`
pub fn is_allowed(from: TransactionStatus, to: TransactionStatus, actor: Actor) -> bool {
    use TransactionStatus::*;

    match actor {
        Actor::Automated => matches!(
            (from, to),
            (Pending, Evaluating)
                | (Evaluating, Pending)
                | (Pending | Evaluating | Approved | Quarantine | Blocked, Approved | Quarantine | Blocked)
                | (Approved, Completed)
        ),
        Actor::Human => from != Completed && matches!(to, Completed | Blocked),
    }
}

pub fn check_transition(
    from: TransactionStatus,
    to: TransactionStatus,
    actor: Actor,
) -> ComplianceResult<()> {
    if is_allowed(from, to, actor) {
        Ok(())
    } else {
        Err(ComplianceError::InvalidTransition { from, to, actor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransactionStatus::*;

    #[test]
    fn test_automated_outcomes() {
        for to in [Approved, Quarantine, Blocked] {
            assert!(is_allowed(Pending, to, Actor::Automated));
            assert!(is_allowed(Evaluating, to, Actor::Automated));
            assert!(is_allowed(Quarantine, to, Actor::Automated));
        }
        assert!(is_allowed(Approved, Completed, Actor::Automated));
    }

    #[test]
    fn test_automated_cannot_complete_quarantined() {
        assert!(!is_allowed(Quarantine, Completed, Actor::Automated));
        assert!(!is_allowed(Blocked, Completed, Actor::Automated));
        assert!(!is_allowed(Completed, Approved, Actor::Automated));
    }

    #[test]
    fn test_human_adjudication() {
        assert!(is_allowed(Quarantine, Completed, Actor::Human));
        assert!(is_allowed(Quarantine, Blocked, Actor::Human));
        assert!(is_allowed(Blocked, Completed, Actor::Human));
        assert!(!is_allowed(Quarantine, Approved, Actor::Human));
    }

    #[test]
    fn test_completed_is_final() {
        let err = check_transition(Completed, Blocked, Actor::Human).unwrap_err();
        assert_eq!(err.to_string(), "Human transition COMPLETED -> BLOCKED is not allowed");
    }
}

//! Guardian Compliance Policy
//!
//! Pure decision logic, no I/O:
//!
//! - [`decision::DecisionEngine`] - score thresholds to decision and status, idempotency
//! - [`transition`] - transaction state machine per actor
//! - [`alert::AlertManager`] - alert severity and the per-agent circuit breaker
//! - [`resolution`] - what a human approve/block changes
//! - [`trust`] - agent trust score
//! - [`config::ComplianceConfig`] - configurable thresholds (not hardcoded)

pub mod alert;
pub mod config;
pub mod decision;
pub mod error;
pub mod resolution;
pub mod transition;
pub mod trust;

pub use alert::{AlertManager, AlertPlan, AlertPolicy, AlertTracker, WindowCounts};
pub use config::ComplianceConfig;
pub use decision::{DecisionEngine, DecisionPolicy, EvaluationPlan, Outcome, YieldReason};
pub use error::{ComplianceError, ComplianceResult};
pub use resolution::{plan_resolution, ResolutionPlan};
pub use transition::Actor;
pub use trust::trust_from_scores;

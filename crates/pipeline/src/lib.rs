//! Guardian Pipeline - Evaluation Orchestrator and operator actions
//!
//! Entry points on [`EvaluationOrchestrator`]:
//!
//! - `evaluate` - score, decide, persist, alert, audit one transaction
//! - `ingest_transaction` / `handle_webhook` - create and evaluate
//! - `resolve_alert` - human approve/block
//! - `freeze_agent`, `scan_agent` - agent-level actions
//! - `reanchor` - retry failed ledger writes

pub mod agents;
pub mod anchor;
pub mod audit;
pub mod error;
pub mod guard;
pub mod ingest;
pub mod orchestrator;
pub mod review;
pub mod webhook;

pub use agents::{FreezeReport, ScanReport};
pub use anchor::ReanchorReport;
pub use error::{PipelineError, PipelineResult};
pub use ingest::{IngestReceipt, NewTransaction};
pub use orchestrator::{
    AppliedEvaluation, EvaluationOrchestrator, EvaluationOutcome, EvaluationReport, RaisedAlert,
};
pub use review::ResolutionReport;
pub use webhook::{parse_notification, TransferNotification, WebhookOutcome};

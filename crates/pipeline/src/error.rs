//! Pipeline errors

use guardian_compliance::ComplianceError;
use guardian_core::AgentStatus;
use guardian_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Compliance error: {0}")]
    Compliance(#[from] ComplianceError),

    #[error("Agent {agent_id} is {status} and cannot submit transactions")]
    AgentNotActive { agent_id: String, status: AgentStatus },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Evaluation already in progress for {0}")]
    EvaluationInFlight(String),

    #[error("Malformed webhook: {0}")]
    MalformedWebhook(String),
}

impl PipelineError {
    /// True for errors a caller may simply retry later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::EvaluationInFlight(_)
                | PipelineError::Store(StoreError::Database(_))
                | PipelineError::Store(StoreError::LockPoisoned)
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

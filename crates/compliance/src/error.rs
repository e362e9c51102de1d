//! Compliance errors

use guardian_core::{AlertStatus, TransactionStatus};
use thiserror::Error;

use crate::transition::Actor;

#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("{actor} transition {from} -> {to} is not allowed")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
        actor: Actor,
    },

    #[error("Alert {alert_id} is already {status}")]
    AlertClosed { alert_id: String, status: AlertStatus },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type ComplianceResult<T> = Result<T, ComplianceError>;

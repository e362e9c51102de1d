//! Ledger errors

use thiserror::Error;

use crate::chain::ChainError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger rejected the write: {0}")]
    Rejected(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger chain corrupted: {0}")]
    Corrupted(#[from] ChainError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

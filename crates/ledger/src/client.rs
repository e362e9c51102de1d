//! Ledger client seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;

/// The single write sent to the immutable ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSubmission {
    pub entity_hash: String,
    pub action_type: String,
    pub payload_hash: String,
}

/// Confirmation of a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Opaque reference (transaction hash, record hash, ...)
    pub reference: String,
}

/// An external append-only ledger.
///
/// A returned receipt means the write is durable. Retries and
/// deduplication are the caller's concern.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(&self, submission: &LedgerSubmission) -> LedgerResult<LedgerReceipt>;
}

//! Audit Ledger Writer
//!
//! Best-effort anchoring of audit actions. The write is a side channel:
//! it never fails the caller, it only decides whether a reference exists.

use guardian_core::AuditAction;
use serde_json::Value;
use std::sync::Arc;

use crate::canonical;
use crate::client::{LedgerClient, LedgerSubmission};

/// Result of a recording attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOutcome {
    pub entity_hash: String,
    pub payload_hash: String,
    /// `Some` only for a confirmed write
    pub reference: Option<String>,
}

#[derive(Clone, Default)]
pub struct AuditLedgerWriter {
    client: Option<Arc<dyn LedgerClient>>,
}

impl AuditLedgerWriter {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Writer with no ledger; every write is skipped
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Compute the hashes for an action without writing anything
    pub fn prepare(entity_id: &str, action: AuditAction, payload: &Value) -> LedgerSubmission {
        LedgerSubmission {
            entity_hash: canonical::entity_hash(entity_id),
            action_type: action.to_string(),
            payload_hash: canonical::payload_hash(payload),
        }
    }

    /// Submit prepared hashes; `None` on any failure
    pub async fn submit(&self, submission: &LedgerSubmission) -> Option<String> {
        let Some(client) = &self.client else {
            tracing::info!(action = %submission.action_type, "Audit ledger not configured, skipping write");
            return None;
        };

        match client.submit(submission).await {
            Ok(receipt) => {
                tracing::debug!(
                    ledger = client.name(),
                    action = %submission.action_type,
                    reference = %receipt.reference,
                    "Audit action anchored"
                );
                Some(receipt.reference)
            }
            Err(e) => {
                tracing::warn!(
                    ledger = client.name(),
                    action = %submission.action_type,
                    entity_hash = %submission.entity_hash,
                    error = %e,
                    "Audit ledger write failed"
                );
                None
            }
        }
    }

    /// Hash and record one audit action
    pub async fn record(&self, entity_id: &str, action: AuditAction, payload: &Value) -> LedgerOutcome {
        let submission = Self::prepare(entity_id, action, payload);
        let reference = self.submit(&submission).await;
        LedgerOutcome {
            entity_hash: submission.entity_hash,
            payload_hash: submission.payload_hash,
            reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLedger;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_submits_hashes() {
        let ledger = Arc::new(InMemoryLedger::new());
        let writer = AuditLedgerWriter::new(ledger.clone());

        let outcome = writer
            .record("TX-1", AuditAction::TransactionEvaluated, &json!({"score": 0.08}))
            .await;

        assert_eq!(outcome.reference.as_deref(), Some("mem-1"));
        assert_eq!(outcome.entity_hash, canonical::entity_hash("TX-1"));

        let sent = ledger.submissions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action_type, "TRANSACTION_EVALUATED");
        assert_eq!(sent[0].payload_hash, outcome.payload_hash);
    }

    #[tokio::test]
    async fn test_failure_yields_none() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_failing(true);
        let writer = AuditLedgerWriter::new(ledger.clone());

        let outcome = writer.record("ALRT-1", AuditAction::AlertCreated, &json!({})).await;
        assert!(outcome.reference.is_none());
        assert_eq!(outcome.payload_hash, canonical::payload_hash(&json!({})));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_writer_skips() {
        let writer = AuditLedgerWriter::disabled();
        assert!(!writer.is_configured());
        let outcome = writer.record("AGT-1", AuditAction::FreezeAgentWallet, &json!({"reason": "x"})).await;
        assert!(outcome.reference.is_none());
    }

    #[tokio::test]
    async fn test_no_deduplication() {
        let ledger = Arc::new(InMemoryLedger::new());
        let writer = AuditLedgerWriter::new(ledger.clone());
        let payload = json!({"b": 2, "a": 1});

        let first = writer.record("TX-1", AuditAction::AlertApproved, &payload).await;
        let second = writer.record("TX-1", AuditAction::AlertApproved, &payload).await;
        assert_eq!(first.payload_hash, second.payload_hash);
        assert_eq!(ledger.len(), 2);
    }
}

//! Audit entries sealed with their ledger hashes before commit

use guardian_core::AuditLogEntry;
use guardian_ledger::{AuditLedgerWriter, LedgerSubmission};
use guardian_store::GuardianStore;

/// An audit entry whose hashes are fixed, plus the matching ledger submission
#[derive(Debug, Clone)]
pub struct SealedEntry {
    pub entry: AuditLogEntry,
    pub submission: LedgerSubmission,
}

pub fn seal(mut entry: AuditLogEntry) -> SealedEntry {
    let submission =
        AuditLedgerWriter::prepare(&entry.entity_id, entry.action, &entry.ledger_payload());
    entry.entity_hash = Some(submission.entity_hash.clone());
    entry.payload_hash = Some(submission.payload_hash.clone());
    SealedEntry { entry, submission }
}

/// Submit a committed entry and record the reference on success.
///
/// Never fails: a missing reference is left for `reanchor`.
pub async fn anchor(
    ledger: &AuditLedgerWriter,
    store: &GuardianStore,
    sealed: &SealedEntry,
) -> Option<String> {
    let reference = ledger.submit(&sealed.submission).await?;
    if let Err(e) = store.record_anchor(&sealed.entry.id, &reference) {
        tracing::warn!(
            audit_id = %sealed.entry.id,
            reference = %reference,
            error = %e,
            "Failed to record ledger anchor"
        );
        return None;
    }
    Some(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_core::AuditAction;
    use guardian_ledger::canonical;
    use serde_json::json;

    #[test]
    fn test_seal_sets_hashes() {
        let entry = AuditLogEntry::new("ORG-1", "TX-1", AuditAction::TransactionEvaluated)
            .after(json!({"status": "APPROVED"}));
        let sealed = seal(entry);

        assert_eq!(sealed.entry.entity_hash.as_deref(), Some(canonical::entity_hash("TX-1").as_str()));
        assert_eq!(sealed.entry.payload_hash, Some(sealed.submission.payload_hash.clone()));
        assert_eq!(sealed.submission.action_type, "TRANSACTION_EVALUATED");
    }
}

//! Re-anchoring audit entries whose ledger write failed

use guardian_ledger::AuditLedgerWriter;

use crate::audit::{self, SealedEntry};
use crate::error::PipelineResult;
use crate::orchestrator::EvaluationOrchestrator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReanchorReport {
    pub attempted: usize,
    pub anchored: usize,
    /// Stored hashes no longer match the entry content
    pub mismatched: usize,
}

impl EvaluationOrchestrator {
    /// Resubmit up to `limit` unanchored audit entries, oldest first
    pub async fn reanchor(&self, limit: usize) -> PipelineResult<ReanchorReport> {
        let mut report = ReanchorReport::default();
        if !self.ledger.is_configured() {
            tracing::info!("Audit ledger not configured, nothing to re-anchor");
            return Ok(report);
        }

        for entry in self.store.unanchored(limit)? {
            let submission =
                AuditLedgerWriter::prepare(&entry.entity_id, entry.action, &entry.ledger_payload());
            if entry.entity_hash.as_deref() != Some(submission.entity_hash.as_str())
                || entry.payload_hash.as_deref() != Some(submission.payload_hash.as_str())
            {
                tracing::error!(audit_id = %entry.id, "Audit entry content does not match its hashes");
                report.mismatched += 1;
                continue;
            }

            report.attempted += 1;
            let sealed = SealedEntry { entry, submission };
            if audit::anchor(&self.ledger, &self.store, &sealed).await.is_some() {
                report.anchored += 1;
            }
        }

        tracing::info!(
            attempted = report.attempted,
            anchored = report.anchored,
            mismatched = report.mismatched,
            "Re-anchoring finished"
        );
        Ok(report)
    }
}

//! Transaction ingestion

use guardian_core::{Amount, AuditAction, AuditLogEntry, Currency, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit;
use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::{EvaluationOrchestrator, EvaluationReport};

/// A transfer submitted on behalf of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub agent_id: String,
    pub amount: Amount,
    #[serde(default)]
    pub currency: Currency,
    /// Defaults to the agent's wallet address
    #[serde(default)]
    pub from_address: Option<String>,
    pub to_address: String,
    /// Payment provider transfer id; repeated ids are not ingested twice
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug)]
pub struct IngestReceipt {
    pub transaction_id: String,
    /// The external id was already known; nothing new was created
    pub duplicate: bool,
    /// `None` for duplicates. An `Err` still means the row was created.
    pub evaluation: Option<PipelineResult<EvaluationReport>>,
}

impl EvaluationOrchestrator {
    /// Create a `PENDING` transaction and evaluate it
    pub async fn ingest_transaction(&self, new: NewTransaction) -> PipelineResult<IngestReceipt> {
        if new.to_address.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "destination address is required".to_string(),
            ));
        }

        let agent = self.store.get_agent(&new.agent_id)?;
        if !agent.status.can_submit() {
            return Err(PipelineError::AgentNotActive {
                agent_id: agent.id,
                status: agent.status,
            });
        }

        if let Some(external_id) = &new.external_id {
            if let Some(existing) = self.store.find_transaction_by_external_id(external_id)? {
                tracing::info!(
                    transaction_id = %existing.id,
                    external_id = %external_id,
                    "Transfer already ingested"
                );
                return Ok(IngestReceipt {
                    transaction_id: existing.id,
                    duplicate: true,
                    evaluation: None,
                });
            }
        }

        let from_address = new
            .from_address
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| agent.wallet_address.clone());
        let mut tx = Transaction::new(&agent, new.amount, new.currency, from_address, new.to_address);
        tx.external_id = new.external_id;

        let sealed = audit::seal(
            AuditLogEntry::new(&tx.organization_id, &tx.id, AuditAction::TransactionIngested)
                .after(json!({
                    "agent_id": tx.agent_id,
                    "amount": tx.amount.to_string(),
                    "currency": tx.currency.code(),
                    "from_address": tx.from_address,
                    "to_address": tx.to_address,
                    "status": tx.status,
                }))
                .metadata(json!({ "external_id": tx.external_id })),
        );
        self.store.insert_transaction(&tx, &sealed.entry)?;
        tracing::info!(
            transaction_id = %tx.id,
            agent_id = %tx.agent_id,
            amount = %tx.amount,
            currency = %tx.currency,
            "Transaction ingested"
        );
        audit::anchor(&self.ledger, &self.store, &sealed).await;

        let evaluation = self.evaluate(&tx.id).await;
        if let Err(e) = &evaluation {
            tracing::error!(transaction_id = %tx.id, error = %e, "Evaluation failed after ingestion");
        }

        Ok(IngestReceipt {
            transaction_id: tx.id,
            duplicate: false,
            evaluation: Some(evaluation),
        })
    }
}

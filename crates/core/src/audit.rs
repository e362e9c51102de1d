//! Append-only audit log entries
//!
//! Entries are written inside the same database transaction as the state
//! change they describe and are never updated afterwards. The external ledger
//! reference is attached later through a separate anchor record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum_macros::{Display, EnumString};

use crate::id;

/// Closed vocabulary of auditable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TransactionIngested,
    TransactionEvaluated,
    AlertCreated,
    AlertApproved,
    AlertBlocked,
    AgentQuarantined,
    FreezeAgentWallet,
    AgentScanned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub organization_id: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub metadata: Value,
    /// sha256 of the entity id, set before the entry is committed
    pub entity_hash: Option<String>,
    /// sha256 of [`AuditLogEntry::ledger_payload`]
    pub payload_hash: Option<String>,
    /// External ledger reference, joined from the anchor table on read
    pub ledger_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        organization_id: impl Into<String>,
        entity_id: impl Into<String>,
        action: AuditAction,
    ) -> Self {
        Self {
            id: id::generate(id::AUDIT),
            organization_id: organization_id.into(),
            entity_id: entity_id.into(),
            action,
            before: None,
            after: None,
            metadata: Value::Null,
            entity_hash: None,
            payload_hash: None,
            ledger_ref: None,
            created_at: Utc::now(),
        }
    }

    pub fn before(mut self, value: Value) -> Self {
        self.before = Some(value);
        self
    }

    pub fn after(mut self, value: Value) -> Self {
        self.after = Some(value);
        self
    }

    pub fn metadata(mut self, value: Value) -> Self {
        self.metadata = value;
        self
    }

    /// The logical content recorded on the external ledger.
    ///
    /// Excludes the entry id and timestamp so that the same logical action
    /// always produces the same payload.
    pub fn ledger_payload(&self) -> Value {
        json!({
            "action": self.action.to_string(),
            "entity_id": self.entity_id,
            "before": self.before,
            "after": self.after,
            "metadata": self.metadata,
        })
    }

    pub fn is_anchored(&self) -> bool {
        self.ledger_ref.is_some()
    }
}

//! SQLite storage for agents, transactions, assessments, alerts and audit rows

use chrono::{DateTime, Utc};
use guardian_core::{
    Agent, Alert, AlertStatus, AuditAction, AuditLogEntry, RiskAssessment, Transaction,
    TransactionStatus,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};
use crate::rows::{self, ALERT_COLUMNS, AGENT_COLUMNS, ASSESSMENT_COLUMNS, AUDIT_SELECT, TRANSACTION_COLUMNS};
use crate::schema;

/// Query options for transaction listings
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub agent_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub limit: Option<usize>,
}

/// Query options for the audit trail
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<usize>,
}

/// SQLite limit where a negative value means "no limit"
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}

/// System of record for the pipeline
///
/// Every multi-row state change goes through one of the `commit_*`
/// operations, each of which runs inside a single SQLite transaction.
pub struct GuardianStore {
    conn: Mutex<Connection>,
}

impl GuardianStore {
    /// Open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // === Agents ===

    /// Register an agent; wallet ids are unique
    pub fn insert_agent(&self, agent: &Agent) -> StoreResult<()> {
        let conn = self.lock()?;
        rows::insert_agent(&conn, agent).map_err(|e| {
            rows::constraint_conflict(e, format!("agent {} or its wallet already exists", agent.id))
        })
    }

    pub fn get_agent(&self, id: &str) -> StoreResult<Agent> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
            params![id],
            rows::agent_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Agent", id))
    }

    pub fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agents ORDER BY created_at",
            AGENT_COLUMNS
        ))?;
        let agents = stmt
            .query_map([], rows::agent_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(agents)
    }

    /// Resolve the agent owning a payment provider wallet
    pub fn find_agent_by_wallet_id(&self, wallet_id: &str) -> StoreResult<Option<Agent>> {
        let conn = self.lock()?;
        let agent = conn
            .query_row(
                &format!("SELECT {} FROM agents WHERE wallet_id = ?1", AGENT_COLUMNS),
                params![wallet_id],
                rows::agent_from_row,
            )
            .optional()?;
        Ok(agent)
    }

    // === Transactions ===

    /// Insert a new transaction together with its ingestion audit entry
    pub fn insert_transaction(&self, tx: &Transaction, audit: &AuditLogEntry) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let db = conn.transaction()?;
        rows::insert_transaction(&db, tx).map_err(|e| {
            rows::constraint_conflict(e, format!("transaction {} already ingested", tx.id))
        })?;
        rows::insert_audit(&db, audit)?;
        db.commit()?;
        Ok(())
    }

    pub fn get_transaction(&self, id: &str) -> StoreResult<Transaction> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?1", TRANSACTION_COLUMNS),
            params![id],
            rows::transaction_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Transaction", id))
    }

    /// Look up a transaction by its payment provider id (webhook redelivery)
    pub fn find_transaction_by_external_id(&self, external_id: &str) -> StoreResult<Option<Transaction>> {
        let conn = self.lock()?;
        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE external_id = ?1",
                    TRANSACTION_COLUMNS
                ),
                params![external_id],
                rows::transaction_from_row,
            )
            .optional()?;
        Ok(tx)
    }

    /// Newest first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions
             WHERE (?1 IS NULL OR agent_id = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY submitted_at DESC, rowid DESC
             LIMIT ?3",
            TRANSACTION_COLUMNS
        ))?;
        let txs = stmt
            .query_map(
                params![
                    filter.agent_id,
                    filter.status.map(|s| s.to_string()),
                    sql_limit(filter.limit),
                ],
                rows::transaction_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(txs)
    }

    /// An agent's most recent transactions, newest first
    pub fn recent_history(&self, agent_id: &str, limit: usize) -> StoreResult<Vec<Transaction>> {
        self.list_transactions(&TransactionFilter {
            agent_id: Some(agent_id.to_string()),
            status: None,
            limit: Some(limit),
        })
    }

    // === Risk assessments ===

    /// Every assessment recorded for a transaction, oldest first
    pub fn assessments_for(&self, transaction_id: &str) -> StoreResult<Vec<RiskAssessment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM risk_assessments WHERE transaction_id = ?1
             ORDER BY created_at, rowid",
            ASSESSMENT_COLUMNS
        ))?;
        let assessments = stmt
            .query_map(params![transaction_id], rows::assessment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assessments)
    }

    /// Scores of the agent's most recent assessments, newest first
    pub fn recent_scores(&self, agent_id: &str, limit: usize) -> StoreResult<Vec<f64>> {
        let conn = self.lock()?;
        recent_scores(&conn, agent_id, limit)
    }

    // === Alerts ===

    pub fn get_alert(&self, id: &str) -> StoreResult<Alert> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM alerts WHERE id = ?1", ALERT_COLUMNS),
            params![id],
            rows::alert_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Alert", id))
    }

    /// Newest first, optionally restricted to one status
    pub fn list_alerts(&self, status: Option<AlertStatus>) -> StoreResult<Vec<Alert>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at DESC, rowid DESC",
            ALERT_COLUMNS
        ))?;
        let alerts = stmt
            .query_map(params![status.map(|s| s.to_string())], rows::alert_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(alerts)
    }

    /// Alerts created at or after `since`, oldest first
    pub fn alerts_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Alert>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts WHERE created_at >= ?1 ORDER BY created_at, rowid",
            ALERT_COLUMNS
        ))?;
        let alerts = stmt
            .query_map(params![rows::timestamp(&since)], rows::alert_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(alerts)
    }

    // === Audit log ===

    /// Audit trail in chronological order with ledger references joined in
    pub fn audit_log(&self, filter: &AuditFilter) -> StoreResult<Vec<AuditLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR a.entity_id = ?1) AND (?2 IS NULL OR a.action = ?2)
             ORDER BY a.created_at, a.rowid
             LIMIT ?3",
            AUDIT_SELECT
        ))?;
        let entries = stmt
            .query_map(
                params![
                    filter.entity_id,
                    filter.action.map(|a| a.to_string()),
                    sql_limit(filter.limit),
                ],
                rows::audit_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get_audit_entry(&self, id: &str) -> StoreResult<AuditLogEntry> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE a.id = ?1", AUDIT_SELECT),
            params![id],
            rows::audit_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Audit entry", id))
    }

    /// Attach a confirmed ledger reference to an audit row.
    ///
    /// Returns `false` when the row was already anchored; the first
    /// reference is kept.
    pub fn record_anchor(&self, audit_id: &str, reference: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        rows::insert_anchor(&conn, audit_id, reference, &Utc::now())
    }

    /// Hashed audit rows still waiting for a ledger reference, oldest first
    pub fn unanchored(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE l.audit_id IS NULL AND a.entity_hash IS NOT NULL
             ORDER BY a.created_at, a.rowid
             LIMIT ?1",
            AUDIT_SELECT
        ))?;
        let entries = stmt
            .query_map(params![limit as i64], rows::audit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

pub(crate) fn recent_scores(conn: &Connection, agent_id: &str, limit: usize) -> StoreResult<Vec<f64>> {
    let mut stmt = conn.prepare(
        "SELECT ra.score FROM risk_assessments ra
         JOIN transactions t ON t.id = ra.transaction_id
         WHERE t.agent_id = ?1
         ORDER BY ra.created_at DESC, ra.rowid DESC
         LIMIT ?2",
    )?;
    let scores = stmt
        .query_map(params![agent_id, limit as i64], |row| row.get(0))?
        .collect::<Result<Vec<f64>, _>>()?;
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_core::{Amount, Currency};
    use rust_decimal_macros::dec;

    fn seed(store: &GuardianStore) -> (Agent, Transaction) {
        let agent = Agent::new("ORG-1", "payments-bot", "0xagent").with_wallet_id("wallet-1");
        store.insert_agent(&agent).unwrap();

        let tx = Transaction::new(
            &agent,
            Amount::new(dec!(125.50)).unwrap(),
            Currency::Usdc,
            "0xagent",
            "0xmerchant",
        );
        let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionIngested);
        store.insert_transaction(&tx, &audit).unwrap();
        (agent, tx)
    }

    #[test]
    fn test_agent_roundtrip() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, _) = seed(&store);

        let loaded = store.get_agent(&agent.id).unwrap();
        assert_eq!(loaded.name, "payments-bot");
        assert_eq!(loaded.status, agent.status);
        assert_eq!(loaded.wallet_id.as_deref(), Some("wallet-1"));

        let by_wallet = store.find_agent_by_wallet_id("wallet-1").unwrap().unwrap();
        assert_eq!(by_wallet.id, agent.id);
        assert!(store.find_agent_by_wallet_id("wallet-2").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_wallet_is_conflict() {
        let store = GuardianStore::in_memory().unwrap();
        seed(&store);

        let other = Agent::new("ORG-1", "copycat", "0xother").with_wallet_id("wallet-1");
        assert!(matches!(store.insert_agent(&other), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_transaction_roundtrip() {
        let store = GuardianStore::in_memory().unwrap();
        let (_, tx) = seed(&store);

        let loaded = store.get_transaction(&tx.id).unwrap();
        assert_eq!(loaded.amount, tx.amount);
        assert_eq!(loaded.currency, Currency::Usdc);
        assert_eq!(loaded.status, TransactionStatus::Pending);
        assert!(loaded.risk_score.is_none());

        let audit = store
            .audit_log(&AuditFilter {
                entity_id: Some(tx.id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::TransactionIngested);
    }

    #[test]
    fn test_missing_rows_are_not_found() {
        let store = GuardianStore::in_memory().unwrap();
        assert!(matches!(
            store.get_transaction("TX-missing"),
            Err(StoreError::NotFound { entity: "Transaction", .. })
        ));
        assert!(matches!(store.get_alert("ALRT-missing"), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.get_agent("AGT-missing"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_external_id_lookup() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, _) = seed(&store);

        let tx = Transaction::new(&agent, Amount::new(dec!(10)).unwrap(), Currency::Usdc, "w", "0xdest")
            .with_external_id("circle-123");
        let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionIngested);
        store.insert_transaction(&tx, &audit).unwrap();

        let found = store.find_transaction_by_external_id("circle-123").unwrap().unwrap();
        assert_eq!(found.id, tx.id);

        let replay = Transaction::new(&agent, Amount::new(dec!(10)).unwrap(), Currency::Usdc, "w", "0xdest")
            .with_external_id("circle-123");
        let audit = AuditLogEntry::new("ORG-1", &replay.id, AuditAction::TransactionIngested);
        assert!(matches!(
            store.insert_transaction(&replay, &audit),
            Err(StoreError::Conflict(_))
        ));
        // The failed insert left no audit row behind
        assert!(store
            .audit_log(&AuditFilter {
                entity_id: Some(replay.id),
                ..Default::default()
            })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_transactions_filters() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, _) = seed(&store);
        for i in 0..4 {
            let tx = Transaction::new(
                &agent,
                Amount::new(rust_decimal::Decimal::from(i + 1)).unwrap(),
                Currency::Usdc,
                "0xagent",
                "0xdest",
            );
            let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionIngested);
            store.insert_transaction(&tx, &audit).unwrap();
        }

        let all = store.list_transactions(&TransactionFilter::default()).unwrap();
        assert_eq!(all.len(), 5);

        let limited = store.recent_history(&agent.id, 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert!(limited[0].submitted_at >= limited[1].submitted_at);

        let blocked = store
            .list_transactions(&TransactionFilter {
                status: Some(TransactionStatus::Blocked),
                ..Default::default()
            })
            .unwrap();
        assert!(blocked.is_empty());
    }

    #[test]
    fn test_anchor_first_reference_wins() {
        let store = GuardianStore::in_memory().unwrap();
        let (agent, _) = seed(&store);

        let mut entry = AuditLogEntry::new("ORG-1", &agent.id, AuditAction::AgentScanned);
        entry.entity_hash = Some("e".repeat(64));
        entry.payload_hash = Some("p".repeat(64));
        {
            let conn = store.lock().unwrap();
            rows::insert_audit(&conn, &entry).unwrap();
        }

        assert_eq!(store.unanchored(10).unwrap().len(), 1);
        assert!(store.record_anchor(&entry.id, "ref-1").unwrap());
        assert!(!store.record_anchor(&entry.id, "ref-2").unwrap());

        let loaded = store.get_audit_entry(&entry.id).unwrap();
        assert_eq!(loaded.ledger_ref.as_deref(), Some("ref-1"));
        assert!(store.unanchored(10).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guardian.db");

        let agent_id = {
            let store = GuardianStore::open(&path).unwrap();
            let (agent, _) = seed(&store);
            agent.id
        };

        let store = GuardianStore::open(&path).unwrap();
        assert_eq!(store.get_agent(&agent_id).unwrap().id, agent_id);
        assert_eq!(store.list_transactions(&TransactionFilter::default()).unwrap().len(), 1);
    }
}

//! Database schema

use rusqlite::Connection;

use crate::error::StoreResult;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    name TEXT NOT NULL,
    wallet_address TEXT NOT NULL,
    wallet_id TEXT UNIQUE,
    status TEXT NOT NULL,
    trust_score REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(id),
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    from_address TEXT NOT NULL,
    to_address TEXT NOT NULL,
    status TEXT NOT NULL,
    decision TEXT NOT NULL,
    risk_score REAL,
    external_id TEXT UNIQUE,
    submitted_at TEXT NOT NULL,
    executed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_transactions_agent ON transactions(agent_id, submitted_at);
CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status);

CREATE TABLE IF NOT EXISTS risk_assessments (
    id TEXT PRIMARY KEY,
    transaction_id TEXT NOT NULL REFERENCES transactions(id),
    score REAL NOT NULL,
    confidence REAL NOT NULL,
    explanation TEXT NOT NULL,
    flags_json TEXT NOT NULL,
    requires_human_review INTEGER NOT NULL,
    recommendation TEXT NOT NULL,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_assessments_transaction ON risk_assessments(transaction_id, created_at);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    agent_id TEXT NOT NULL REFERENCES agents(id),
    transaction_id TEXT REFERENCES transactions(id),
    severity TEXT NOT NULL,
    status TEXT NOT NULL,
    reasons_json TEXT NOT NULL,
    ai_explanation TEXT,
    created_at TEXT NOT NULL,
    resolved_at TEXT,
    resolution_decision TEXT,
    resolution_reason TEXT
);
CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(status);
CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at);

CREATE TABLE IF NOT EXISTS audit_log (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    action TEXT NOT NULL,
    before_json TEXT,
    after_json TEXT,
    metadata_json TEXT NOT NULL,
    entity_hash TEXT,
    payload_hash TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_id);

CREATE TABLE IF NOT EXISTS ledger_anchors (
    audit_id TEXT PRIMARY KEY REFERENCES audit_log(id),
    reference TEXT NOT NULL,
    anchored_at TEXT NOT NULL
);
";

/// Initialize the database schema
pub fn init(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

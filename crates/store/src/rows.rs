//! Row encoding and decoding
//!
//! Enums are stored as their SCREAMING_SNAKE_CASE names, timestamps as
//! RFC 3339 with fixed microsecond precision so that text ordering matches
//! time ordering, amounts as decimal strings.

use chrono::{DateTime, SecondsFormat, Utc};
use guardian_core::{
    Agent, Alert, AlertResolution, AuditLogEntry, RiskAssessment, Transaction,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

pub(crate) fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion(idx, e))
}

fn opt_parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<T>().map_err(|e| conversion(idx, e)))
        .transpose()
}

pub(crate) fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn opt_time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion(idx, e))
    })
    .transpose()
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion(idx, e))
}

fn opt_json_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion(idx, e)))
        .transpose()
}

fn opt_json(value: &Option<Value>) -> StoreResult<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

// === Agents ===

pub(crate) const AGENT_COLUMNS: &str =
    "id, organization_id, name, wallet_address, wallet_id, status, trust_score, created_at";

pub(crate) fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        wallet_address: row.get(3)?,
        wallet_id: row.get(4)?,
        status: parse_col(row, 5)?,
        trust_score: row.get(6)?,
        created_at: time_col(row, 7)?,
    })
}

pub(crate) fn insert_agent(conn: &Connection, agent: &Agent) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO agents
         (id, organization_id, name, wallet_address, wallet_id, status, trust_score, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            agent.id,
            agent.organization_id,
            agent.name,
            agent.wallet_address,
            agent.wallet_id,
            agent.status.to_string(),
            agent.trust_score,
            timestamp(&agent.created_at),
        ],
    )?;
    Ok(())
}

// === Transactions ===

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, organization_id, agent_id, amount, currency, from_address, to_address,
     status, decision, risk_score, external_id, submitted_at, executed_at";

pub(crate) fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        agent_id: row.get(2)?,
        amount: parse_col(row, 3)?,
        currency: parse_col(row, 4)?,
        from_address: row.get(5)?,
        to_address: row.get(6)?,
        status: parse_col(row, 7)?,
        decision: parse_col(row, 8)?,
        risk_score: row.get(9)?,
        external_id: row.get(10)?,
        submitted_at: time_col(row, 11)?,
        executed_at: opt_time_col(row, 12)?,
    })
}

pub(crate) fn insert_transaction(conn: &Connection, tx: &Transaction) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO transactions
         (id, organization_id, agent_id, amount, currency, from_address, to_address,
          status, decision, risk_score, external_id, submitted_at, executed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            tx.id,
            tx.organization_id,
            tx.agent_id,
            tx.amount.to_string(),
            tx.currency.code(),
            tx.from_address,
            tx.to_address,
            tx.status.to_string(),
            tx.decision.to_string(),
            tx.risk_score,
            tx.external_id,
            timestamp(&tx.submitted_at),
            tx.executed_at.as_ref().map(timestamp),
        ],
    )?;
    Ok(())
}

// === Risk assessments ===

pub(crate) const ASSESSMENT_COLUMNS: &str =
    "id, transaction_id, score, confidence, explanation, flags_json,
     requires_human_review, recommendation, source, created_at";

pub(crate) fn assessment_from_row(row: &Row<'_>) -> rusqlite::Result<RiskAssessment> {
    Ok(RiskAssessment {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        score: row.get(2)?,
        confidence: row.get(3)?,
        explanation: row.get(4)?,
        flags: json_col(row, 5)?,
        requires_human_review: row.get(6)?,
        recommendation: parse_col(row, 7)?,
        source: parse_col(row, 8)?,
        created_at: time_col(row, 9)?,
    })
}

pub(crate) fn insert_assessment(conn: &Connection, assessment: &RiskAssessment) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO risk_assessments
         (id, transaction_id, score, confidence, explanation, flags_json,
          requires_human_review, recommendation, source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            assessment.id,
            assessment.transaction_id,
            assessment.score,
            assessment.confidence,
            assessment.explanation,
            serde_json::to_string(&assessment.flags)?,
            assessment.requires_human_review,
            assessment.recommendation.to_string(),
            assessment.source.to_string(),
            timestamp(&assessment.created_at),
        ],
    )?;
    Ok(())
}

// === Alerts ===

pub(crate) const ALERT_COLUMNS: &str =
    "id, organization_id, agent_id, transaction_id, severity, status, reasons_json,
     ai_explanation, created_at, resolved_at, resolution_decision, resolution_reason";

pub(crate) fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let reason: Option<String> = row.get(11)?;
    let resolution = opt_parse_col(row, 10)?.map(|decision| AlertResolution {
        decision,
        reason: reason.unwrap_or_default(),
    });

    Ok(Alert {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        agent_id: row.get(2)?,
        transaction_id: row.get(3)?,
        severity: parse_col(row, 4)?,
        status: parse_col(row, 5)?,
        reasons: json_col(row, 6)?,
        ai_explanation: row.get(7)?,
        created_at: time_col(row, 8)?,
        resolved_at: opt_time_col(row, 9)?,
        resolution,
    })
}

pub(crate) fn insert_alert(conn: &Connection, alert: &Alert) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO alerts
         (id, organization_id, agent_id, transaction_id, severity, status, reasons_json,
          ai_explanation, created_at, resolved_at, resolution_decision, resolution_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            alert.id,
            alert.organization_id,
            alert.agent_id,
            alert.transaction_id,
            alert.severity.to_string(),
            alert.status.to_string(),
            serde_json::to_string(&alert.reasons)?,
            alert.ai_explanation,
            timestamp(&alert.created_at),
            alert.resolved_at.as_ref().map(timestamp),
            alert.resolution.as_ref().map(|r| r.decision.to_string()),
            alert.resolution.as_ref().map(|r| r.reason.clone()),
        ],
    )?;
    Ok(())
}

// === Audit log ===

pub(crate) const AUDIT_SELECT: &str =
    "SELECT a.id, a.organization_id, a.entity_id, a.action, a.before_json, a.after_json,
            a.metadata_json, a.entity_hash, a.payload_hash, l.reference, a.created_at
     FROM audit_log a LEFT JOIN ledger_anchors l ON l.audit_id = a.id";

pub(crate) fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        entity_id: row.get(2)?,
        action: parse_col(row, 3)?,
        before: opt_json_col(row, 4)?,
        after: opt_json_col(row, 5)?,
        metadata: json_col(row, 6)?,
        entity_hash: row.get(7)?,
        payload_hash: row.get(8)?,
        ledger_ref: row.get(9)?,
        created_at: time_col(row, 10)?,
    })
}

/// Audit rows are insert-only; the ledger reference lives in `ledger_anchors`
pub(crate) fn insert_audit(conn: &Connection, entry: &AuditLogEntry) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO audit_log
         (id, organization_id, entity_id, action, before_json, after_json,
          metadata_json, entity_hash, payload_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.id,
            entry.organization_id,
            entry.entity_id,
            entry.action.to_string(),
            opt_json(&entry.before)?,
            opt_json(&entry.after)?,
            serde_json::to_string(&entry.metadata)?,
            entry.entity_hash,
            entry.payload_hash,
            timestamp(&entry.created_at),
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_anchor(
    conn: &Connection,
    audit_id: &str,
    reference: &str,
    at: &DateTime<Utc>,
) -> StoreResult<bool> {
    // First confirmed reference wins
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO ledger_anchors (audit_id, reference, anchored_at)
         VALUES (?1, ?2, ?3)",
        params![audit_id, reference, timestamp(at)],
    )?;
    Ok(inserted > 0)
}

/// Map unique constraint failures onto `Conflict`
pub(crate) fn constraint_conflict(err: StoreError, what: impl Into<String>) -> StoreError {
    match err {
        StoreError::Database(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(what.into())
        }
        other => other,
    }
}

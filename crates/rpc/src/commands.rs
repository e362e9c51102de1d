//! CLI commands

use anyhow::Context;
use guardian_core::{
    Agent, AlertStatus, Amount, AuditAction, Currency, ReviewDecision, TransactionStatus,
};
use guardian_pipeline::{EvaluationOutcome, EvaluationReport, NewTransaction, WebhookOutcome};
use guardian_store::{AuditFilter, TransactionFilter};
use rust_decimal::Decimal;
use std::path::Path;

use crate::context::AppContext;

fn parse_code<T>(value: &str, what: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .to_uppercase()
        .parse()
        .with_context(|| format!("unknown {} '{}'", what, value))
}

fn print_report(report: &EvaluationReport) {
    match &report.outcome {
        EvaluationOutcome::Applied(applied) => {
            let icon = match applied.status {
                TransactionStatus::Approved => "✅",
                TransactionStatus::Blocked => "⛔",
                _ => "⚠️ ",
            };
            println!(
                "{} {} → {} ({}) score {:.2}",
                icon, report.transaction_id, applied.status, applied.decision, applied.verdict.score
            );
            println!("   {}", applied.verdict.explanation);
            if !applied.verdict.flags.is_empty() {
                println!("   Flags: {}", applied.verdict.flags.join(", "));
            }
            println!("   Agent trust score: {:.2}", applied.trust_score);
            if let Some(alert) = &applied.alert {
                println!("🚨 Alert {} ({})", alert.alert_id, alert.severity);
                if alert.agent_quarantined {
                    println!("🔒 Agent quarantined by circuit breaker");
                }
            }
            if let Some(reference) = &applied.ledger_ref {
                println!("   Ledger: {}", reference);
            }
        }
        EvaluationOutcome::Yielded { decision, status } => {
            println!(
                "⏭️  {} already settled ({} / {}), left unchanged",
                report.transaction_id, status, decision
            );
        }
    }
}

/// Register a new agent
pub fn agent_add(
    ctx: &AppContext,
    organization: &str,
    name: &str,
    wallet_address: &str,
    wallet_id: Option<&str>,
) -> anyhow::Result<Agent> {
    let mut agent = Agent::new(organization, name, wallet_address);
    if let Some(wallet_id) = wallet_id {
        agent = agent.with_wallet_id(wallet_id);
    }
    ctx.store.insert_agent(&agent)?;

    println!("✅ Registered agent {} ({})", agent.id, agent.name);
    Ok(agent)
}

pub fn agent_list(ctx: &AppContext) -> anyhow::Result<()> {
    let agents = ctx.store.list_agents()?;
    if agents.is_empty() {
        println!("No agents registered");
        return Ok(());
    }

    println!("{:<40} {:<20} {:<12} {:>6}", "ID", "NAME", "STATUS", "TRUST");
    for agent in agents {
        println!(
            "{:<40} {:<20} {:<12} {:>6.2}",
            agent.id, agent.name, agent.status, agent.trust_score
        );
    }
    Ok(())
}

/// Create a transaction for an agent and evaluate it
pub async fn ingest(
    ctx: &AppContext,
    agent_id: &str,
    amount: Decimal,
    currency: &str,
    to_address: &str,
    external_id: Option<String>,
) -> anyhow::Result<String> {
    let amount = Amount::new(amount)?;
    let currency: Currency = currency.parse()?;

    let receipt = ctx
        .pipeline
        .ingest_transaction(NewTransaction {
            agent_id: agent_id.to_string(),
            amount,
            currency: currency.clone(),
            from_address: None,
            to_address: to_address.to_string(),
            external_id,
        })
        .await?;

    if receipt.duplicate {
        println!("↩️  Already ingested as {}", receipt.transaction_id);
        return Ok(receipt.transaction_id);
    }

    println!("📥 Ingested {} {} as {}", amount, currency, receipt.transaction_id);
    match receipt.evaluation {
        Some(Ok(report)) => print_report(&report),
        Some(Err(e)) => println!("❌ Evaluation failed, transaction left PENDING: {}", e),
        None => {}
    }
    Ok(receipt.transaction_id)
}

/// Re-run evaluation for a stored transaction
pub async fn evaluate(ctx: &AppContext, transaction_id: &str) -> anyhow::Result<()> {
    let report = ctx.pipeline.evaluate(transaction_id).await?;
    print_report(&report);
    Ok(())
}

/// Process a webhook body stored in a file
pub async fn webhook(ctx: &AppContext, path: &Path) -> anyhow::Result<()> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading webhook body {}", path.display()))?;

    match ctx.pipeline.handle_webhook(&body).await? {
        WebhookOutcome::Ignored(reason) => println!("ℹ️  Ignored: {}", reason),
        WebhookOutcome::Duplicate { transaction_id } => {
            println!("↩️  Redelivery of {}", transaction_id)
        }
        WebhookOutcome::Ingested(receipt) => {
            println!("📥 Ingested transfer as {}", receipt.transaction_id);
            match receipt.evaluation {
                Some(Ok(report)) => print_report(&report),
                Some(Err(e)) => println!("❌ Evaluation failed: {}", e),
                None => {}
            }
        }
    }
    Ok(())
}

/// Approve or block the subject of an alert
pub async fn resolve(
    ctx: &AppContext,
    alert_id: &str,
    decision: ReviewDecision,
    reason: &str,
) -> anyhow::Result<()> {
    let report = ctx.pipeline.resolve_alert(alert_id, decision, reason).await?;

    println!("✅ Alert {} resolved: {}", report.alert_id, report.decision);
    if let Some((transaction_id, outcome)) = &report.transaction {
        println!("   {} → {} ({})", transaction_id, outcome.status, outcome.decision);
    }
    if report.agent_quarantined {
        println!("🔒 Agent quarantined");
    }
    if let Some(reference) = &report.ledger_ref {
        println!("   Ledger: {}", reference);
    }
    Ok(())
}

pub async fn freeze(
    ctx: &AppContext,
    agent_id: &str,
    reason: &str,
    wallet_id: Option<&str>,
) -> anyhow::Result<()> {
    let report = ctx.pipeline.freeze_agent(agent_id, reason, wallet_id).await?;

    println!("🧊 Agent {} suspended", report.agent_id);
    println!("   Alert: {}", report.alert_id);
    match &report.ledger_ref {
        Some(reference) => println!("   Ledger: {}", reference),
        None => println!("   ⚠️  Ledger write pending, run `guardian reanchor`"),
    }
    Ok(())
}

pub async fn scan(ctx: &AppContext, agent_id: &str) -> anyhow::Result<()> {
    let report = ctx.pipeline.scan_agent(agent_id).await?;

    println!(
        "🔎 Agent {} scanned over {} transactions: score {:.2}",
        report.agent_id, report.transactions_analyzed, report.verdict.score
    );
    println!("   {}", report.verdict.explanation);
    println!("   Trust score: {:.2}", report.trust_score);
    if let Some(alert_id) = &report.alert_id {
        println!("🚨 Alert {}", alert_id);
    }
    Ok(())
}

pub fn transactions(
    ctx: &AppContext,
    agent_id: Option<String>,
    status: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let status = status
        .map(|s| parse_code::<TransactionStatus>(s, "status"))
        .transpose()?;
    let rows = ctx.store.list_transactions(&TransactionFilter {
        agent_id,
        status,
        limit: Some(limit),
    })?;

    if rows.is_empty() {
        println!("No transactions found");
        return Ok(());
    }

    println!(
        "{:<40} {:>14} {:<6} {:<12} {:<16} {:>5}",
        "ID", "AMOUNT", "CCY", "STATUS", "DECISION", "RISK"
    );
    for tx in rows {
        let risk = tx
            .risk_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:>14} {:<6} {:<12} {:<16} {:>5}",
            tx.id, tx.amount, tx.currency, tx.status, tx.decision, risk
        );
    }
    Ok(())
}

pub fn alerts(ctx: &AppContext, status: Option<&str>) -> anyhow::Result<()> {
    let status = status
        .map(|s| parse_code::<AlertStatus>(s, "alert status"))
        .transpose()?;
    let rows = ctx.store.list_alerts(status)?;

    if rows.is_empty() {
        println!("No alerts found");
        return Ok(());
    }

    for alert in rows {
        println!(
            "{} [{}] {} agent={} tx={}",
            alert.id,
            alert.severity,
            alert.status,
            alert.agent_id,
            alert.transaction_id.as_deref().unwrap_or("-")
        );
        for reason in &alert.reasons {
            println!("   - {}", reason);
        }
    }
    Ok(())
}

pub fn audit_log(
    ctx: &AppContext,
    entity_id: Option<String>,
    action: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let action = action
        .map(|a| parse_code::<AuditAction>(a, "audit action"))
        .transpose()?;
    let entries = ctx.store.audit_log(&AuditFilter {
        entity_id,
        action,
        limit: Some(limit),
    })?;

    for entry in &entries {
        println!(
            "{} {} {} {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.action,
            entry.entity_id,
            entry.ledger_ref.as_deref().unwrap_or("(unanchored)")
        );
    }
    println!("{} entries", entries.len());
    Ok(())
}

/// Verify the local ledger hash chain
pub fn audit_verify(ctx: &AppContext) -> anyhow::Result<bool> {
    match ctx.ledger.verify() {
        Ok(count) => {
            println!("✅ Ledger chain verified ({} records)", count);
            Ok(true)
        }
        Err(e) => {
            println!("❌ Ledger chain broken: {}", e);
            Ok(false)
        }
    }
}

pub async fn reanchor(ctx: &AppContext, limit: usize) -> anyhow::Result<()> {
    let report = ctx.pipeline.reanchor(limit).await?;

    println!(
        "⚓ Re-anchored {}/{} audit entries",
        report.anchored, report.attempted
    );
    if report.mismatched > 0 {
        println!(
            "❌ {} entries no longer match their stored hashes",
            report.mismatched
        );
    }
    Ok(())
}

pub fn stats(ctx: &AppContext) -> anyhow::Result<()> {
    let stats = ctx.store.stats()?;

    println!("📊 Guardian dashboard");
    println!("   Total volume:     {}", stats.total_volume);
    println!("   Transactions:     {}", stats.transaction_count);
    println!("   Active agents:    {}", stats.active_agents);
    println!("   Blocked:          {}", stats.blocked_count);
    println!("   Pending review:   {}", stats.pending_review);
    println!("   Open alerts:      {}", stats.open_alerts);
    match stats.average_risk_score {
        Some(avg) => println!("   Avg risk score:   {:.2}", avg),
        None => println!("   Avg risk score:   -"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_is_case_insensitive() {
        let status: TransactionStatus = parse_code("quarantine", "status").unwrap();
        assert_eq!(status, TransactionStatus::Quarantine);

        let action: AuditAction = parse_code("agent_scanned", "audit action").unwrap();
        assert_eq!(action, AuditAction::AgentScanned);

        assert!(parse_code::<AlertStatus>("bogus", "alert status").is_err());
    }
}

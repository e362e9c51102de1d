//! Dashboard aggregates

use guardian_core::Amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::rows::parse_col;
use crate::store::GuardianStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Sum of all transaction amounts, across currencies
    pub total_volume: Decimal,
    pub transaction_count: u64,
    pub active_agents: u64,
    pub blocked_count: u64,
    /// Transactions waiting in QUARANTINE
    pub pending_review: u64,
    pub open_alerts: u64,
    /// `None` until at least one transaction has been scored
    pub average_risk_score: Option<f64>,
}

impl GuardianStore {
    pub fn stats(&self) -> StoreResult<DashboardStats> {
        let conn = self.lock()?;

        // Amounts are decimal text; sum them exactly here rather than in SQL
        let mut stmt = conn.prepare("SELECT amount FROM transactions")?;
        let amounts = stmt
            .query_map([], |row| parse_col::<Amount>(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        let total_volume = amounts.iter().map(|a| a.value()).sum();

        let count = |sql: &str| -> StoreResult<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let average_risk_score: Option<f64> = conn.query_row(
            "SELECT AVG(risk_score) FROM transactions WHERE risk_score IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        Ok(DashboardStats {
            total_volume,
            transaction_count: amounts.len() as u64,
            active_agents: count("SELECT COUNT(*) FROM agents WHERE status = 'ACTIVE'")?,
            blocked_count: count("SELECT COUNT(*) FROM transactions WHERE status = 'BLOCKED'")?,
            pending_review: count("SELECT COUNT(*) FROM transactions WHERE status = 'QUARANTINE'")?,
            open_alerts: count(
                "SELECT COUNT(*) FROM alerts WHERE status IN ('PENDING', 'REVIEWING')",
            )?,
            average_risk_score: average_risk_score.map(|s| (s * 100.0).round() / 100.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_core::{Agent, AuditAction, AuditLogEntry, Currency, Transaction};
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_stats() {
        let store = GuardianStore::in_memory().unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_volume, Decimal::ZERO);
        assert_eq!(stats.transaction_count, 0);
        assert!(stats.average_risk_score.is_none());
    }

    #[test]
    fn test_volume_is_exact() {
        let store = GuardianStore::in_memory().unwrap();
        let agent = Agent::new("ORG-1", "bot", "0xagent");
        store.insert_agent(&agent).unwrap();

        for amount in [dec!(0.1), dec!(0.2), dec!(15)] {
            let tx = Transaction::new(&agent, Amount::new(amount).unwrap(), Currency::Usdc, "a", "b");
            let audit = AuditLogEntry::new("ORG-1", &tx.id, AuditAction::TransactionIngested);
            store.insert_transaction(&tx, &audit).unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_volume, dec!(15.3));
        assert_eq!(stats.transaction_count, 3);
        assert_eq!(stats.active_agents, 1);
        assert_eq!(stats.blocked_count, 0);
    }
}

//! Input handed to the risk scoring client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::currency::Currency;
use crate::transaction::{Transaction, TransactionStatus};

/// Maximum number of prior transactions summarized for the oracle
pub const MAX_HISTORY: usize = 20;

/// Summary of one prior transaction of the same agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub amount: Amount,
    pub currency: Currency,
    pub to_address: String,
    pub status: TransactionStatus,
    pub risk_score: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Transaction> for HistoryItem {
    fn from(tx: &Transaction) -> Self {
        Self {
            amount: tx.amount,
            currency: tx.currency.clone(),
            to_address: tx.to_address.clone(),
            status: tx.status,
            risk_score: tx.risk_score,
            submitted_at: tx.submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub transaction_id: String,
    pub agent_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub from_address: String,
    pub to_address: String,
    pub timestamp: DateTime<Utc>,
    /// Most recent first, at most [`MAX_HISTORY`] items
    pub history: Vec<HistoryItem>,
}

impl TransactionContext {
    /// Build the context for `tx`, dropping the transaction itself from its history
    pub fn new(tx: &Transaction, history: &[Transaction]) -> Self {
        let history = history
            .iter()
            .filter(|h| h.id != tx.id)
            .take(MAX_HISTORY)
            .map(HistoryItem::from)
            .collect();

        Self {
            transaction_id: tx.id.clone(),
            agent_id: tx.agent_id.clone(),
            amount: tx.amount,
            currency: tx.currency.clone(),
            from_address: tx.from_address.clone(),
            to_address: tx.to_address.clone(),
            timestamp: tx.submitted_at,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use rust_decimal_macros::dec;

    #[test]
    fn test_history_bounded_and_excludes_self() {
        let agent = Agent::new("ORG-1", "bot", "0x1");
        let tx = Transaction::new(&agent, Amount::new(dec!(50)).unwrap(), Currency::Usdc, "0x1", "0x2");

        let mut history = vec![tx.clone()];
        for _ in 0..30 {
            history.push(Transaction::new(&agent, Amount::new(dec!(1)).unwrap(), Currency::Usdc, "0x1", "0x3"));
        }

        let ctx = TransactionContext::new(&tx, &history);
        assert_eq!(ctx.history.len(), MAX_HISTORY);
        assert!(ctx.history.iter().all(|h| h.to_address == "0x3"));
        assert_eq!(ctx.to_address, "0x2");
    }
}

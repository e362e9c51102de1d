//! Autonomous agents that submit transactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::id;

/// Trust score assigned to a newly registered agent
pub const DEFAULT_TRUST_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Active,
    Suspended,
    Quarantine,
    Archived,
    Paused,
}

impl AgentStatus {
    /// Only active agents may submit new transactions
    pub fn can_submit(&self) -> bool {
        matches!(self, AgentStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub wallet_address: String,
    /// Payment provider wallet id, used to route webhook transfers
    pub wallet_id: Option<String>,
    pub status: AgentStatus,
    /// 0.0 - 1.0, inverse to recent risk
    pub trust_score: f64,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        organization_id: impl Into<String>,
        name: impl Into<String>,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            id: id::generate(id::AGENT),
            organization_id: organization_id.into(),
            name: name.into(),
            wallet_address: wallet_address.into(),
            wallet_id: None,
            status: AgentStatus::Active,
            trust_score: DEFAULT_TRUST_SCORE,
            created_at: Utc::now(),
        }
    }

    pub fn with_wallet_id(mut self, wallet_id: impl Into<String>) -> Self {
        self.wallet_id = Some(wallet_id.into());
        self
    }
}

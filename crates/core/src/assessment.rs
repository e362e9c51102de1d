//! Risk verdicts and the assessment history kept per transaction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::id;

/// Flag set when the input contained a prompt-injection pattern
pub const FLAG_PROMPT_INJECTION: &str = "PROMPT_INJECTION_ATTEMPT";
/// Flag set when the oracle could not be reached or timed out
pub const FLAG_SERVICE_ERROR: &str = "SERVICE_ERROR";
/// Flag set when the oracle output contained no parseable JSON object
pub const FLAG_PARSE_ERROR: &str = "PARSE_ERROR";
/// Flag set when the oracle output lacked a usable score
pub const FLAG_VALIDATION_ERROR: &str = "VALIDATION_ERROR";

/// Recommendation returned by the oracle (advisory only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OracleDecision {
    Approve,
    Quarantine,
    Block,
}

impl OracleDecision {
    /// Recommendation implied by a score when the oracle's own is unusable
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            OracleDecision::Block
        } else if score > 0.4 {
            OracleDecision::Quarantine
        } else {
            OracleDecision::Approve
        }
    }
}

/// Where a verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictSource {
    /// Validated oracle output
    Oracle,
    /// Input rejected before reaching the oracle
    InjectionGuard,
    /// Safe default after an oracle or validation failure
    Fallback,
}

/// Output of a single scoring attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub score: f64,
    pub recommendation: OracleDecision,
    pub explanation: String,
    pub flags: Vec<String>,
    pub confidence: f64,
    pub requires_human_review: bool,
    pub source: VerdictSource,
}

impl RiskVerdict {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Attach the verdict to a transaction as an immutable assessment record
    pub fn into_assessment(self, transaction_id: impl Into<String>) -> RiskAssessment {
        RiskAssessment {
            id: id::generate(id::ASSESSMENT),
            transaction_id: transaction_id.into(),
            score: self.score,
            confidence: self.confidence,
            explanation: self.explanation,
            flags: self.flags,
            requires_human_review: self.requires_human_review,
            recommendation: self.recommendation,
            source: self.source,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: String,
    pub transaction_id: String,
    pub score: f64,
    pub confidence: f64,
    pub explanation: String,
    pub flags: Vec<String>,
    pub requires_human_review: bool,
    pub recommendation: OracleDecision,
    pub source: VerdictSource,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_from_score() {
        assert_eq!(OracleDecision::from_score(0.1), OracleDecision::Approve);
        assert_eq!(OracleDecision::from_score(0.4), OracleDecision::Approve);
        assert_eq!(OracleDecision::from_score(0.41), OracleDecision::Quarantine);
        assert_eq!(OracleDecision::from_score(0.7), OracleDecision::Quarantine);
        assert_eq!(OracleDecision::from_score(0.71), OracleDecision::Block);
    }

    #[test]
    fn test_into_assessment_keeps_verdict() {
        let verdict = RiskVerdict {
            score: 0.85,
            recommendation: OracleDecision::Quarantine,
            explanation: "Unusual destination".to_string(),
            flags: vec!["NEW_COUNTERPARTY".to_string()],
            confidence: 0.9,
            requires_human_review: true,
            source: VerdictSource::Oracle,
        };
        assert!(verdict.has_flag("NEW_COUNTERPARTY"));

        let assessment = verdict.into_assessment("TX-1");
        assert_eq!(assessment.transaction_id, "TX-1");
        assert_eq!(assessment.score, 0.85);
        assert!(assessment.id.starts_with("RA-"));
    }
}

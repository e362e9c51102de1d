//! Risk Scoring Client
//!
//! ```text
//! TransactionContext
//!        │ serialize
//!        ▼
//!   sanitize (decoded strings) ──match──► score 1.0 / BLOCK   (oracle never called)
//!        │ clean
//!        ▼
//!   prompt framing ──► oracle.generate (timeout, single attempt)
//!        │                    │ error / timeout
//!        ▼                    ▼
//!   validate_output      safe default (SERVICE_ERROR)
//!        │
//!        ▼
//!   RiskVerdict
//! ```
//!
//! `score` never returns an error.

use guardian_core::assessment::{FLAG_PROMPT_INJECTION, FLAG_SERVICE_ERROR};
use guardian_core::{OracleDecision, RiskVerdict, Transaction, TransactionContext, VerdictSource};
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::error::OracleError;
use crate::oracle::{Prompt, RiskOracle};
use crate::prompt;
use crate::sanitize;
use crate::validate::{self, safe_default};

/// Flag attached when an agent scan falls back
pub const FLAG_SCAN_FALLBACK: &str = "SCAN_FALLBACK";

const INJECTION_EXPLANATION: &str = "Manipulation attempt detected in input data";

pub struct RiskScoringClient {
    oracle: Arc<dyn RiskOracle>,
    config: ScoringConfig,
}

impl RiskScoringClient {
    pub fn new(oracle: Arc<dyn RiskOracle>, config: ScoringConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn oracle_id(&self) -> &str {
        self.oracle.id()
    }

    /// Score one transaction context
    pub async fn score(&self, ctx: &TransactionContext) -> RiskVerdict {
        let serialized = prompt::serialize_context(ctx);

        if let Some(found) = screen(ctx, &serialized) {
            tracing::warn!(
                transaction_id = %ctx.transaction_id,
                agent_id = %ctx.agent_id,
                pattern = found.pattern,
                "Prompt injection attempt detected in transaction context"
            );
            return injection_verdict();
        }

        let prompt = prompt::transaction_prompt(&serialized);
        match self.call_oracle(&prompt).await {
            Ok(raw) => {
                let verdict = validate::validate_output(&raw, &self.config.output_limits());
                tracing::debug!(
                    transaction_id = %ctx.transaction_id,
                    score = verdict.score,
                    source = %verdict.source,
                    "Risk verdict received"
                );
                verdict
            }
            Err(e) => {
                tracing::error!(
                    transaction_id = %ctx.transaction_id,
                    oracle = self.oracle.id(),
                    error = %e,
                    "Risk oracle unavailable, using safe default"
                );
                safe_default(FLAG_SERVICE_ERROR)
            }
        }
    }

    /// Behavioural scan over an agent's recent transactions.
    ///
    /// Falls back to `scan_fallback_score` instead of the transaction safe default.
    pub async fn scan_agent(&self, agent_id: &str, history: &[Transaction]) -> RiskVerdict {
        let items: Vec<_> = history
            .iter()
            .take(self.config.history_limit())
            .map(guardian_core::HistoryItem::from)
            .collect();
        let payload = serde_json::json!({ "agent_id": agent_id, "transactions": items });
        let serialized = payload.to_string();

        if let Some(found) = sanitize::inspect_value(&payload) {
            tracing::warn!(agent_id, pattern = found.pattern, "Prompt injection attempt detected in agent history");
            return injection_verdict();
        }

        let prompt = prompt::agent_scan_prompt(&serialized);
        let raw = match self.call_oracle(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(agent_id, error = %e, "Agent scan failed, using fallback score");
                return self.scan_fallback(FLAG_SERVICE_ERROR);
            }
        };

        match validate::parse_verdict(&raw, &self.config.output_limits()) {
            Ok(verdict) => verdict,
            Err(rejection) => {
                tracing::warn!(agent_id, reason = rejection.flag(), "Agent scan output rejected");
                self.scan_fallback(rejection.flag())
            }
        }
    }

    async fn call_oracle(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let timeout = self.config.oracle_timeout();
        match tokio::time::timeout(timeout, self.oracle.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::ConnectionFailed {
                source: format!("timed out after {}ms", timeout.as_millis()).into(),
            }),
        }
    }

    fn scan_fallback(&self, reason: &str) -> RiskVerdict {
        let score = self.config.scan_fallback_score;
        RiskVerdict {
            score,
            recommendation: OracleDecision::from_score(score),
            explanation: "Behavioural analysis unavailable. Manual review required.".to_string(),
            flags: vec![FLAG_SCAN_FALLBACK.to_string(), reason.to_string()],
            confidence: 0.0,
            requires_human_review: true,
            source: VerdictSource::Fallback,
        }
    }
}

/// Screen the decoded context strings, falling back to the serialized text
fn screen(ctx: &TransactionContext, serialized: &str) -> Option<sanitize::InjectionMatch> {
    match serde_json::to_value(ctx) {
        Ok(value) => sanitize::inspect_value(&value),
        Err(_) => sanitize::inspect(serialized),
    }
}

fn injection_verdict() -> RiskVerdict {
    RiskVerdict {
        score: 1.0,
        recommendation: OracleDecision::Block,
        explanation: INJECTION_EXPLANATION.to_string(),
        flags: vec![FLAG_PROMPT_INJECTION.to_string()],
        confidence: 1.0,
        requires_human_review: true,
        source: VerdictSource::InjectionGuard,
    }
}

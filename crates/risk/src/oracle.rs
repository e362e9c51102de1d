//! Oracle seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};

/// A framed request: immutable system preamble plus untrusted data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// External risk oracle (LLM or rules service).
///
/// Implementations return the raw text of the oracle's answer. Parsing and
/// validation happen in the scoring client, never in the adapter.
#[async_trait]
pub trait RiskOracle: Send + Sync {
    /// Oracle identifier for logging (model name, "mock", ...)
    fn id(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> OracleResult<String>;
}

/// Oracle used when none is configured; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableOracle;

#[async_trait]
impl RiskOracle for UnavailableOracle {
    fn id(&self) -> &str {
        "unavailable"
    }

    async fn generate(&self, _prompt: &Prompt) -> OracleResult<String> {
        Err(OracleError::NotConfigured)
    }
}

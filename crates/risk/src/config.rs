//! Scoring client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::validate::OutputLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Single-attempt budget for the oracle call
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,

    #[serde(default = "default_explanation_max_chars")]
    pub explanation_max_chars: usize,

    #[serde(default = "default_max_flags")]
    pub max_flags: usize,

    #[serde(default = "default_max_flag_chars")]
    pub max_flag_chars: usize,

    /// Prior transactions included in the oracle context
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Score used when an agent scan cannot be completed
    #[serde(default = "default_scan_fallback_score")]
    pub scan_fallback_score: f64,
}

fn default_oracle_timeout_ms() -> u64 {
    5_000
}

fn default_explanation_max_chars() -> usize {
    200
}

fn default_max_flags() -> usize {
    5
}

fn default_max_flag_chars() -> usize {
    64
}

fn default_history_window() -> usize {
    guardian_core::MAX_HISTORY
}

fn default_scan_fallback_score() -> f64 {
    0.5
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            oracle_timeout_ms: default_oracle_timeout_ms(),
            explanation_max_chars: default_explanation_max_chars(),
            max_flags: default_max_flags(),
            max_flag_chars: default_max_flag_chars(),
            history_window: default_history_window(),
            scan_fallback_score: default_scan_fallback_score(),
        }
    }
}

impl ScoringConfig {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn output_limits(&self) -> OutputLimits {
        OutputLimits {
            explanation_max_chars: self.explanation_max_chars,
            max_flags: self.max_flags,
            max_flag_chars: self.max_flag_chars,
        }
    }

    /// History window never exceeds what the context type carries
    pub fn history_limit(&self) -> usize {
        self.history_window.min(guardian_core::MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScoringConfig::default();
        assert_eq!(config.oracle_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.output_limits(), OutputLimits::default());
        assert_eq!(config.history_limit(), 20);
        assert_eq!(config.scan_fallback_score, 0.5);
    }

    #[test]
    fn test_partial_json() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{ "oracle_timeout_ms": 250, "history_window": 99 }"#).unwrap();
        assert_eq!(config.oracle_timeout_ms, 250);
        assert_eq!(config.history_limit(), 20);
        assert_eq!(config.max_flags, 5);
    }
}

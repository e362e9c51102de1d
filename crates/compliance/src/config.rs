//! Compliance configuration
//!
//! Decision thresholds and alert thresholds are separate objects: blocking
//! funds and drawing human attention are tuned independently.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::alert::{AlertPolicy, BUCKET_COUNT};
use crate::decision::DecisionPolicy;
use crate::error::{ComplianceError, ComplianceResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default)]
    pub decision: DecisionPolicy,

    #[serde(default)]
    pub alerts: AlertPolicy,
}

impl ComplianceConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> ComplianceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject threshold combinations that cannot describe a policy
    pub fn validate(&self) -> ComplianceResult<()> {
        let d = &self.decision;
        let a = &self.alerts;

        for (name, value) in [
            ("decision.auto_approve_threshold", d.auto_approve_threshold),
            ("decision.auto_block_threshold", d.auto_block_threshold),
            ("alerts.alert_threshold", a.alert_threshold),
            ("alerts.critical_threshold", a.critical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ComplianceError::ConfigError(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if d.auto_approve_threshold > d.auto_block_threshold {
            return Err(ComplianceError::ConfigError(format!(
                "auto_approve_threshold ({}) exceeds auto_block_threshold ({})",
                d.auto_approve_threshold, d.auto_block_threshold
            )));
        }
        if a.alert_threshold > a.critical_threshold {
            return Err(ComplianceError::ConfigError(format!(
                "alert_threshold ({}) exceeds critical_threshold ({})",
                a.alert_threshold, a.critical_threshold
            )));
        }
        if a.window_minutes == 0 || a.window_minutes as usize > BUCKET_COUNT {
            return Err(ComplianceError::ConfigError(format!(
                "window_minutes must be within 1..={}, got {}",
                BUCKET_COUNT, a.window_minutes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ComplianceConfig::default();
        assert_eq!(config.decision.auto_approve_threshold, 0.3);
        assert_eq!(config.decision.auto_block_threshold, 0.7);
        assert_eq!(config.alerts.alert_threshold, 0.5);
        assert_eq!(config.alerts.critical_threshold, 0.9);
        assert_eq!(config.alerts.window_minutes, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{ "decision": { "auto_block_threshold": 0.95 } }"#;
        let config: ComplianceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.decision.auto_block_threshold, 0.95);
        assert_eq!(config.decision.auto_approve_threshold, 0.3);
        assert_eq!(config.alerts, AlertPolicy::default());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = ComplianceConfig::default();
        config.decision.auto_approve_threshold = 0.8;
        assert!(matches!(config.validate(), Err(ComplianceError::ConfigError(_))));

        let mut config = ComplianceConfig::default();
        config.alerts.window_minutes = 120;
        assert!(config.validate().is_err());

        let mut config = ComplianceConfig::default();
        config.alerts.critical_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "alerts": {{ "high_alerts_to_quarantine": 5 }} }}"#).unwrap();

        let config = ComplianceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.alerts.high_alerts_to_quarantine, 5);
    }
}

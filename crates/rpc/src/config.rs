//! Guardian configuration
//!
//! A single JSON file; every section is optional. Oracle settings can be
//! overridden from the environment so keys stay out of the file.

use anyhow::Context;
use guardian_compliance::ComplianceConfig;
use guardian_risk::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_ORACLE_URL: &str = "GUARDIAN_ORACLE_URL";
pub const ENV_ORACLE_MODEL: &str = "GUARDIAN_ORACLE_MODEL";
pub const ENV_ORACLE_API_KEY: &str = "GUARDIAN_ORACLE_API_KEY";

const DEFAULT_DATABASE_FILE: &str = "guardian.db";
const DEFAULT_LEDGER_FILE: &str = "audit-ledger.jsonl";

/// OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// Relative paths resolve against the data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub ledger_path: Option<PathBuf>,

    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Without an oracle every evaluation takes the safe default
    #[serde(default)]
    pub oracle: Option<OracleConfig>,

    /// Only used when built with the `nats` feature
    #[serde(default)]
    pub nats_url: Option<String>,
}

fn default_bus_capacity() -> usize {
    guardian_bus::DEFAULT_CAPACITY
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            compliance: ComplianceConfig::default(),
            database_path: None,
            ledger_path: None,
            bus_capacity: default_bus_capacity(),
            oracle: None,
            nats_url: None,
        }
    }
}

impl GuardianConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// File config (or defaults) with environment overrides applied
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.compliance.validate()?;
        if self.bus_capacity == 0 {
            anyhow::bail!("bus_capacity must be positive");
        }
        Ok(())
    }

    /// Apply `GUARDIAN_ORACLE_*` values. A URL alone is enough to configure an oracle.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_ORACLE_URL) {
            match &mut self.oracle {
                Some(oracle) => oracle.base_url = url,
                None => {
                    self.oracle = Some(OracleConfig {
                        base_url: url,
                        model: default_model(),
                        api_key: None,
                    })
                }
            }
        }

        if let Some(oracle) = &mut self.oracle {
            if let Some(model) = lookup(ENV_ORACLE_MODEL) {
                oracle.model = model;
            }
            if let Some(key) = lookup(ENV_ORACLE_API_KEY) {
                oracle.api_key = Some(key);
            }
        }
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        resolve(data_dir, self.database_path.as_deref(), DEFAULT_DATABASE_FILE)
    }

    pub fn ledger_path(&self, data_dir: &Path) -> PathBuf {
        resolve(data_dir, self.ledger_path.as_deref(), DEFAULT_LEDGER_FILE)
    }
}

fn resolve(data_dir: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => data_dir.join(path),
        None => data_dir.join(default_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "compliance": {{ "decision": {{ "auto_block_threshold": 0.95 }} }} }}"#
        )
        .unwrap();

        let config = GuardianConfig::from_file(file.path()).unwrap();
        assert_eq!(config.compliance.decision.auto_block_threshold, 0.95);
        assert_eq!(config.compliance.decision.auto_approve_threshold, 0.3);
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.bus_capacity, guardian_bus::DEFAULT_CAPACITY);
        assert!(config.oracle.is_none());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "compliance": {{ "decision": {{ "auto_approve_threshold": 0.9, "auto_block_threshold": 0.5 }} }} }}"#
        )
        .unwrap();

        assert!(GuardianConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_ORACLE_URL, "http://localhost:11434/v1"),
            (ENV_ORACLE_API_KEY, "sk-test"),
        ]
        .into_iter()
        .collect();

        let mut config = GuardianConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        let oracle = config.oracle.unwrap();
        assert_eq!(oracle.base_url, "http://localhost:11434/v1");
        assert_eq!(oracle.model, "gpt-4o-mini");
        assert_eq!(oracle.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_model_override_needs_oracle() {
        let mut config = GuardianConfig::default();
        config.apply_overrides(|key| (key == ENV_ORACLE_MODEL).then(|| "llama3".to_string()));
        assert!(config.oracle.is_none());
    }

    #[test]
    fn test_paths_resolve_against_data_dir() {
        let data = Path::new("/var/guardian");
        let mut config = GuardianConfig::default();
        assert_eq!(config.database_path(data), data.join("guardian.db"));

        config.ledger_path = Some(PathBuf::from("ledger/audit.jsonl"));
        assert_eq!(config.ledger_path(data), data.join("ledger/audit.jsonl"));

        config.database_path = Some(PathBuf::from("/tmp/g.db"));
        assert_eq!(config.database_path(data), PathBuf::from("/tmp/g.db"));
    }
}

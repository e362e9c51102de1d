//! Application context - wires everything together

use anyhow::Context;
use guardian_bus::EventBus;
use guardian_ledger::{AuditLedgerWriter, JsonlLedger};
use guardian_pipeline::EvaluationOrchestrator;
use guardian_risk::{OpenAiOracle, RiskOracle, RiskScoringClient, UnavailableOracle};
use guardian_store::GuardianStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::GuardianConfig;

/// Application context - wires together all components
pub struct AppContext {
    pub config: GuardianConfig,
    pub store: Arc<GuardianStore>,
    pub ledger: Arc<JsonlLedger>,
    pub bus: Arc<EventBus>,
    pub pipeline: EvaluationOrchestrator,
    data_path: PathBuf,
}

impl AppContext {
    /// Create a context using the oracle named in the config
    pub async fn new(data_path: impl AsRef<Path>, config: GuardianConfig) -> anyhow::Result<Self> {
        let oracle: Arc<dyn RiskOracle> = match &config.oracle {
            Some(oracle) => {
                tracing::info!(base_url = %oracle.base_url, model = %oracle.model, "Using OpenAI-compatible risk oracle");
                Arc::new(OpenAiOracle::new(
                    oracle.base_url.clone(),
                    oracle.model.clone(),
                    oracle.api_key.clone(),
                )?)
            }
            None => {
                tracing::warn!("No risk oracle configured, evaluations will use the safe default");
                Arc::new(UnavailableOracle)
            }
        };

        let ctx = Self::with_oracle(data_path, config, oracle)?;

        #[cfg(feature = "nats")]
        if let Some(url) = &ctx.config.nats_url {
            let bridge = guardian_bus::NatsBridge::connect(url, guardian_bus::nats::DEFAULT_SUBJECT_PREFIX).await?;
            guardian_bus::spawn_subscriber(ctx.bus.subscribe(), Arc::new(bridge));
        }

        Ok(ctx)
    }

    /// Create a context around an explicit oracle
    pub fn with_oracle(
        data_path: impl AsRef<Path>,
        config: GuardianConfig,
        oracle: Arc<dyn RiskOracle>,
    ) -> anyhow::Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_path)
            .with_context(|| format!("creating data directory {}", data_path.display()))?;

        let database_path = config.database_path(&data_path);
        let store = Arc::new(
            GuardianStore::open(&database_path)
                .with_context(|| format!("opening database {}", database_path.display()))?,
        );

        let ledger_path = config.ledger_path(&data_path);
        let ledger = Arc::new(
            JsonlLedger::open(&ledger_path)
                .with_context(|| format!("opening audit ledger {}", ledger_path.display()))?,
        );

        let bus = Arc::new(EventBus::new(config.bus_capacity));
        let scoring = RiskScoringClient::new(oracle, config.scoring.clone());

        let pipeline = EvaluationOrchestrator::new(
            store.clone(),
            scoring,
            config.compliance.clone(),
            AuditLedgerWriter::new(ledger.clone()),
            bus.clone(),
        );

        // Circuit breaker state only lives in memory
        let replayed = pipeline.rebuild_alert_window()?;
        tracing::debug!(replayed, "Alert window rebuilt");

        Ok(Self {
            config,
            store,
            ledger,
            bus,
            pipeline,
            data_path,
        })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }
}

//! Wiring of forwarders from configuration.

use std::sync::Arc;

use super::{run_all, AuditLogForwarder, ConnectorError, RunReport};
use crate::auth::LoginTokenProvider;
use crate::config::ConnectorConfig;
use crate::http::client_from_tuning;
use crate::sink::{LogAnalyticsSink, LogSink, MemorySink};
use crate::source::{PrismaAuditSource, SystemClock, WindowPolicy};
use crate::watermark::{MemoryWatermarkStore, SqliteWatermarkStore, WatermarkStore};

/// Result of one triggered invocation across all categories.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reports: Vec<RunReport>,
    /// Cumulative records the sink delivered.
    pub sent_events: u64,
}

/// In-memory copy of the stored watermark. A missing database is treated
/// as an empty store and is not created.
async fn dry_run_store(config: &ConnectorConfig) -> Result<MemoryWatermarkStore, ConnectorError> {
    if !tokio::fs::try_exists(&config.watermark_db_path)
        .await
        .unwrap_or(false)
    {
        return Ok(MemoryWatermarkStore::new(None));
    }
    let durable =
        SqliteWatermarkStore::open(&config.watermark_db_path, config.tuning.store_key.clone())
            .await?;
    Ok(MemoryWatermarkStore::new(durable.get().await?.as_deref()))
}

/// All forwarders of one invocation sharing a sink.
pub struct Connector {
    forwarders: Vec<AuditLogForwarder>,
    sink: Arc<dyn LogSink>,
}

impl Connector {
    #[must_use]
    pub fn new(forwarders: Vec<AuditLogForwarder>, sink: Arc<dyn LogSink>) -> Self {
        Self { forwarders, sink }
    }

    /// Build the forwarders selected by `config`.
    ///
    /// With `dry_run`, records go to an in-memory sink and the watermark is
    /// only read, never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client, the sink, or the watermark store
    /// cannot be created.
    pub async fn from_config(config: &ConnectorConfig, dry_run: bool) -> Result<Self, ConnectorError> {
        let client = client_from_tuning(&config.tuning).map_err(ConnectorError::HttpClient)?;

        let sink: Arc<dyn LogSink> = if dry_run {
            Arc::new(MemorySink::new())
        } else {
            Arc::new(LogAnalyticsSink::new(
                client.clone(),
                &config.log_analytics_uri,
                &config.workspace_id,
                &config.shared_key,
                config.tuning.queue_size,
            )?)
        };

        tracing::info!(log_types = %config.log_types, "Selected log types");

        let mut forwarders = Vec::new();
        if config.audit_enabled() {
            let tokens = Arc::new(LoginTokenProvider::new(
                client.clone(),
                config.login_url.clone(),
                config.credentials.clone(),
            ));
            let source = Arc::new(PrismaAuditSource::new(
                client,
                config.api_url.clone(),
                tokens,
            ));

            let store: Arc<dyn WatermarkStore> = if dry_run {
                Arc::new(dry_run_store(config).await?)
            } else {
                Arc::new(
                    SqliteWatermarkStore::open(
                        &config.watermark_db_path,
                        config.tuning.store_key.clone(),
                    )
                    .await?,
                )
            };

            forwarders.push(
                AuditLogForwarder::new(
                    source,
                    sink.clone(),
                    store,
                    Arc::new(SystemClock),
                    config.tuning.category.clone(),
                )
                .with_policy(WindowPolicy::from(&config.tuning)),
            );
        }

        Ok(Self::new(forwarders, sink))
    }

    /// Number of enabled categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forwarders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forwarders.is_empty()
    }

    /// Run every enabled category once.
    ///
    /// # Errors
    ///
    /// Returns the first error from any category.
    pub async fn run(&mut self) -> Result<RunSummary, ConnectorError> {
        for forwarder in &self.forwarders {
            tracing::debug!(category = forwarder.category(), "Starting category");
        }
        let reports = run_all(&mut self.forwarders).await?;
        Ok(RunSummary {
            reports,
            sent_events: self.sink.successful_sent_events(),
        })
    }
}

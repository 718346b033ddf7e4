//! Pipeline orchestrator - builds the source, provider and sink from a
//! blueprint and drives the control loop until cancelled.

use std::sync::Arc;

use anyhow::{Context, Result};
use consumer::ControlLoop;
use contracts::{ConsumerBlueprint, RowSink, SinkKind};
use enrichment::{Enricher, MapsClient};
use gcp_auth::TokenProvider;
use ingestion::PubSubSource;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warehouse::{MeteredSink, WarehouseSink};

use super::RunStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated consumer configuration
    pub blueprint: ConsumerBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Queue calls go to an emulator without credentials
    pub queue_unauthenticated: bool,
}

impl PipelineConfig {
    fn needs_credentials(&self) -> bool {
        !self.queue_unauthenticated || self.blueprint.sink.kind == SinkKind::BigQuery
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `cancel` fires or a fatal error stops the loop
    ///
    /// Statistics are returned on success and printed before a fatal error
    /// is propagated.
    pub async fn run(self, cancel: CancellationToken) -> Result<RunStats> {
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let token_provider = if self.config.needs_credentials() {
            Some(resolve_credentials().await?)
        } else {
            None
        };
        let queue_token = if self.config.queue_unauthenticated {
            None
        } else {
            token_provider.clone()
        };

        let source = PubSubSource::new(&blueprint.queue, blueprint.retry, queue_token)
            .context("Failed to create Pub/Sub source")?;
        info!(
            subscription = %source.subscription(),
            endpoint = %blueprint.queue.endpoint,
            "Queue source ready"
        );

        if blueprint.geo.api_key.is_empty() {
            warn!("No Maps API key configured; every lookup will be rejected");
        }
        let maps = MapsClient::new(&blueprint.geo).context("Failed to create Maps client")?;

        let sink = WarehouseSink::from_config(
            &blueprint.sink,
            &blueprint.warehouse,
            blueprint.retry,
            token_provider,
        )
        .context("Failed to create sink")?;
        let sink = MeteredSink::new(sink);
        let sink_metrics = Arc::clone(sink.metrics());

        let mut control = ControlLoop::new(source, Enricher::new(maps), sink, &blueprint.consumer);

        info!("Starting consumer...");
        let result = control.run(cancel).await;

        let stats = RunStats {
            subscription: control.source().subscription().to_string(),
            sink: control.sink().inner().name().to_string(),
            loop_stats: control.stats().clone(),
            sink_metrics: sink_metrics.snapshot(),
        };

        match result {
            Ok(_) => Ok(stats),
            Err(e) => {
                stats.print_summary();
                Err(CliError::from(e).into())
            }
        }
    }
}

/// Application-default credentials
async fn resolve_credentials() -> Result<Arc<dyn TokenProvider>> {
    let provider = gcp_auth::provider()
        .await
        .map_err(|e| CliError::credentials(e.to_string()))?;
    info!("Google Cloud credentials resolved");
    Ok(provider)
}

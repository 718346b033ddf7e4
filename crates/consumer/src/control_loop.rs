//! ControlLoop - pull / enrich / write / acknowledge cycle
//!
//! States: `Running -> Stopping -> Stopped`.
//!
//! - Cancellation is observed at the top of each cycle and while waiting
//!   (pull, cooldown); a batch that was pulled is always finished and acked.
//! - One acknowledge call per non-empty cycle, after every message in the
//!   batch was written or skipped.
//! - A fatal write acknowledges the messages already written, then returns.

use std::time::Instant;

use contracts::{AckBatch, ConsumerSettings, GeoProvider, MessageSource, ReceivedMessage, RowSink};
use enrichment::{Enricher, QuotaGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ConsumerError;
use crate::row_builder::RowBuilder;
use crate::stats::LoopStats;

/// Loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopping,
    Stopped,
}

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Enriched,
    Skipped,
    Malformed,
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enriched => "enriched",
            Self::Skipped => "skipped",
            Self::Malformed => "malformed",
        }
    }
}

/// Single-worker consumer loop
pub struct ControlLoop<S, P, K> {
    source: S,
    enricher: Enricher<P>,
    sink: K,
    quota: QuotaGuard,
    batch_size: usize,
    ack_skipped: bool,
    state: LoopState,
    stats: LoopStats,
}

impl<S, P, K> ControlLoop<S, P, K>
where
    S: MessageSource,
    P: GeoProvider,
    K: RowSink,
{
    pub fn new(source: S, enricher: Enricher<P>, sink: K, settings: &ConsumerSettings) -> Self {
        Self {
            source,
            enricher,
            sink,
            quota: QuotaGuard::new(settings.quota_limit, settings.cooldown()),
            batch_size: settings.batch_size,
            ack_skipped: settings.ack_skipped,
            state: LoopState::Stopped,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn quota(&self) -> &QuotaGuard {
        &self.quota
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Run until `cancel` fires or a fatal error occurs
    ///
    /// The sink is flushed and closed on the way out in both cases.
    #[instrument(
        name = "control_loop",
        skip(self, cancel),
        fields(source = %self.source.name(), sink = %self.sink.name(), batch_size = self.batch_size)
    )]
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<LoopStats, ConsumerError> {
        let started = Instant::now();
        self.state = LoopState::Running;
        info!(
            quota_limit = self.quota.limit(),
            ack_skipped = self.ack_skipped,
            "Control loop started"
        );

        let result = self.cycle_until_cancelled(&cancel).await;

        self.state = LoopState::Stopping;
        if let Err(e) = &result {
            error!(error = %e, "Control loop terminating on fatal error");
        } else {
            info!("Cancellation requested, stopping");
        }
        if let Err(e) = self.sink.flush().await {
            warn!(error = %e, "Sink flush failed during shutdown");
        }
        if let Err(e) = self.sink.close().await {
            warn!(error = %e, "Sink close failed during shutdown");
        }

        self.stats.duration = started.elapsed();
        self.state = LoopState::Stopped;
        info!(
            batches = self.stats.batches,
            received = self.stats.received,
            acknowledged = self.stats.acknowledged,
            "Control loop stopped"
        );

        result.map(|()| self.stats.clone())
    }

    async fn cycle_until_cancelled(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), ConsumerError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let pulled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                pulled = self.source.pull(self.batch_size) => pulled,
            };
            let messages = pulled.map_err(ConsumerError::pull)?;
            if messages.is_empty() {
                debug!("No messages ready");
                continue;
            }

            self.process_batch(messages).await?;

            if self.quota.is_exhausted() {
                let reset = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    _ = self.quota.wait_for_reset() => true,
                };
                if !reset {
                    return Ok(());
                }
                self.stats.cooldowns += 1;
                observability::record_cooldown();
                observability::record_quota(self.quota.used(), self.quota.limit());
            }
        }
    }

    /// Process one pulled batch in order and acknowledge it
    #[instrument(name = "process_batch", skip(self, messages), fields(size = messages.len()))]
    async fn process_batch(&mut self, messages: Vec<ReceivedMessage>) -> Result<(), ConsumerError> {
        self.stats.batches += 1;
        self.stats.received += messages.len() as u64;
        self.stats.metrics.observe_pull(messages.len());
        observability::record_batch_pulled(messages.len());

        let mut acks = AckBatch::with_capacity(messages.len());
        let mut exhaustion_noted = false;

        for message in messages {
            if !exhaustion_noted && self.quota.is_exhausted() {
                info!(
                    used = self.quota.used(),
                    limit = self.quota.limit(),
                    "Quota exhausted, rest of batch skips enrichment"
                );
                exhaustion_noted = true;
            }

            match self.process_message(&message).await {
                Ok(ack) => {
                    if ack {
                        acks.push(message.ack_id);
                    }
                }
                Err(e) => {
                    if let Err(ack_err) = self.acknowledge(&mut acks).await {
                        error!(error = %ack_err, "Could not acknowledge written messages");
                    }
                    return Err(e);
                }
            }
        }

        self.acknowledge(&mut acks).await
    }

    /// Handle one message; `Ok(true)` when its handle belongs in the ack batch
    async fn process_message(&mut self, message: &ReceivedMessage) -> Result<bool, ConsumerError> {
        let telemetry = match ingestion::decode(message) {
            Ok(telemetry) => telemetry,
            Err(e) => {
                warn!(error = %e, "Malformed message, acknowledging without a row");
                self.count(MessageOutcome::Malformed);
                return Ok(true);
            }
        };

        if !self.quota.try_consume() {
            self.count(MessageOutcome::Skipped);
            if !self.ack_skipped {
                self.stats.left_unacked += 1;
                info!(vehicle_id = %telemetry.vehicle_id, "skipped, left for redelivery");
                return Ok(false);
            }
            let row = RowBuilder::build_skipped(&telemetry);
            self.write(&row).await?;
            info!(vehicle_id = %telemetry.vehicle_id, "skipped");
            return Ok(true);
        }
        observability::record_quota(self.quota.used(), self.quota.limit());

        let outcome = self
            .enricher
            .enrich(telemetry.latitude, telemetry.longitude, telemetry.observed_at)
            .await;
        let failed: Vec<&str> = outcome.failed.iter().map(|f| f.as_str()).collect();
        self.stats.metrics.observe_enrichment(outcome.elapsed_ms, &failed);
        observability::record_enrichment_latency_ms(outcome.elapsed_ms);
        if outcome.is_partial() {
            self.stats.partially_enriched += 1;
        }

        let row = RowBuilder::build(&telemetry, &outcome.enrichment);
        self.write(&row).await?;

        let enrichment = &outcome.enrichment;
        info!(
            vehicle_id = %telemetry.vehicle_id,
            address = %enrichment.address,
            elevation = ?enrichment.elevation,
            timezone = enrichment.timezone_id.as_deref().unwrap_or(""),
            "Appended one row"
        );
        self.count(MessageOutcome::Enriched);
        Ok(true)
    }

    async fn write(&mut self, row: &contracts::EnrichedRow) -> Result<(), ConsumerError> {
        self.sink
            .write(row)
            .await
            .map_err(|e| ConsumerError::write(&row.vehicle_id, e))?;
        self.stats.rows_written += 1;
        Ok(())
    }

    async fn acknowledge(&mut self, acks: &mut AckBatch) -> Result<(), ConsumerError> {
        if acks.is_empty() {
            return Ok(());
        }
        let count = acks.len();
        self.source
            .acknowledge(acks.handles())
            .await
            .map_err(|e| ConsumerError::acknowledge(count, e))?;

        self.stats.acknowledged += count as u64;
        self.stats.ack_calls += 1;
        self.stats.metrics.observe_ack(count);
        observability::record_ack(count);
        debug!(count, "Batch acknowledged");
        acks.clear();
        Ok(())
    }

    fn count(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Enriched => self.stats.enriched += 1,
            MessageOutcome::Skipped => self.stats.skipped += 1,
            MessageOutcome::Malformed => self.stats.malformed += 1,
        }
        observability::record_message_outcome(outcome.as_str());
    }
}

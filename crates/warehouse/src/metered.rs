//! MeteredSink - wraps a sink with write counters

use std::sync::Arc;
use std::time::Instant;

use contracts::{ContractError, EnrichedRow, RowSink};
use tracing::error;

use crate::metrics::SinkMetrics;

/// Sink decorator that records every write outcome
///
/// Counters go to the shared `SinkMetrics` and to the
/// `geo_enricher_rows_written_total{sink,status}` Prometheus counter.
pub struct MeteredSink<S> {
    inner: S,
    metrics: Arc<SinkMetrics>,
}

impl<S: RowSink> MeteredSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RowSink + Send> RowSink for MeteredSink<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn write(&mut self, row: &EnrichedRow) -> Result<(), ContractError> {
        let started = Instant::now();
        let result = self.inner.write(row).await;
        let elapsed = started.elapsed();
        self.metrics.add_write_micros(elapsed.as_micros() as u64);

        let status = match &result {
            Ok(()) => {
                self.metrics.inc_write_count();
                "success"
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(sink = %self.inner.name(), vehicle_id = %row.vehicle_id, error = %e, "Write failed");
                "failure"
            }
        };
        metrics::counter!(
            "geo_enricher_rows_written_total",
            "sink" => self.inner.name().to_string(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!("geo_enricher_write_latency_ms", "sink" => self.inner.name().to_string())
            .record(elapsed.as_secs_f64() * 1000.0);

        result
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.inner.flush().await
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.inner.close().await
    }
}

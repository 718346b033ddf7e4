//! Consumer metrics
//!
//! Prometheus recording helpers (`geo_enricher_*`) plus an in-memory
//! aggregator for the end-of-run summary.

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// Record a pulled batch
///
/// # Example
///
/// ```ignore
/// let messages = source.pull(batch_size).await?;
/// observability::record_batch_pulled(messages.len());
/// ```
pub fn record_batch_pulled(size: usize) {
    counter!("geo_enricher_batches_total").increment(1);
    histogram!("geo_enricher_batch_size").record(size as f64);
}

/// Record how one message was handled (`enriched`, `skipped`, `malformed`)
pub fn record_message_outcome(outcome: &'static str) {
    counter!("geo_enricher_messages_total", "outcome" => outcome).increment(1);
}

/// Wall time of the three lookups for one message
pub fn record_enrichment_latency_ms(latency_ms: f64) {
    histogram!("geo_enricher_enrichment_latency_ms").record(latency_ms);
}

/// Record an acknowledge call
pub fn record_ack(batch_size: usize) {
    counter!("geo_enricher_acks_total").increment(1);
    histogram!("geo_enricher_ack_batch_size").record(batch_size as f64);
}

/// Current quota usage
pub fn record_quota(used: u32, limit: u32) {
    gauge!("geo_enricher_quota_used").set(used as f64);
    gauge!("geo_enricher_quota_limit").set(limit as f64);
}

pub fn record_cooldown() {
    counter!("geo_enricher_cooldowns_total").increment(1);
}

/// In-memory aggregation for the summary printed on exit
#[derive(Debug, Clone, Default)]
pub struct ConsumerMetricsAggregator {
    /// Enrichment wall time per message (ms)
    pub enrichment_latency: RunningStats,

    /// Handles per acknowledge call
    pub ack_batch_sizes: RunningStats,

    /// Messages per pull
    pub pull_sizes: RunningStats,

    /// Failed lookups by field
    pub field_failures: HashMap<String, u64>,
}

impl ConsumerMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_pull(&mut self, size: usize) {
        self.pull_sizes.push(size as f64);
    }

    pub fn observe_enrichment(&mut self, latency_ms: f64, failed_fields: &[&str]) {
        self.enrichment_latency.push(latency_ms);
        for field in failed_fields {
            *self.field_failures.entry((*field).to_string()).or_insert(0) += 1;
        }
    }

    pub fn observe_ack(&mut self, size: usize) {
        self.ack_batch_sizes.push(size as f64);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            enrichment_latency_ms: StatsSummary::from(&self.enrichment_latency),
            ack_batch_size: StatsSummary::from(&self.ack_batch_sizes),
            pull_size: StatsSummary::from(&self.pull_sizes),
            field_failures: self.field_failures.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub enrichment_latency_ms: StatsSummary,
    pub ack_batch_size: StatsSummary,
    pub pull_size: StatsSummary,
    pub field_failures: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Enrichment latency (ms): {}", self.enrichment_latency_ms)?;
        writeln!(f, "Pull size: {}", self.pull_size)?;
        writeln!(f, "Ack batch size: {}", self.ack_batch_size)?;

        if !self.field_failures.is_empty() {
            let mut fields: Vec<_> = self.field_failures.iter().collect();
            fields.sort();
            writeln!(f, "Lookup failures:")?;
            for (field, count) in fields {
                writeln!(f, "  {field}: {count}")?;
            }
        }
        Ok(())
    }
}

/// Summary of a RunningStats
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [2.0, 4.0, 6.0, 8.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 4);
        assert!((stats.mean() - 5.0).abs() < 1e-10);
        assert_eq!(stats.min(), 2.0);
        assert_eq!(stats.max(), 8.0);
        assert!((stats.variance() - 20.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_summary() {
        let mut aggregator = ConsumerMetricsAggregator::new();
        aggregator.observe_pull(3);
        aggregator.observe_enrichment(12.0, &[]);
        aggregator.observe_enrichment(18.0, &["elevation"]);
        aggregator.observe_enrichment(30.0, &["elevation", "timezone"]);
        aggregator.observe_ack(3);

        let summary = aggregator.summary();
        assert_eq!(summary.enrichment_latency_ms.count, 3);
        assert!((summary.enrichment_latency_ms.mean - 20.0).abs() < 1e-10);
        assert_eq!(summary.field_failures.get("elevation"), Some(&2));
        assert_eq!(summary.field_failures.get("timezone"), Some(&1));
        assert_eq!(summary.ack_batch_size.count, 1);

        let text = summary.to_string();
        assert!(text.contains("elevation: 2"));

        aggregator.reset();
        assert_eq!(aggregator.summary().pull_size.count, 0);
    }

    #[test]
    fn test_empty_summary_displays_na() {
        let summary = ConsumerMetricsAggregator::new().summary();
        assert!(summary.to_string().contains("Enrichment latency (ms): N/A"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_batch_pulled(10);
        record_message_outcome("enriched");
        record_enrichment_latency_ms(1.0);
        record_ack(10);
        record_quota(3, 10);
        record_cooldown();
    }
}

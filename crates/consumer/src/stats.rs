//! Run counters

use std::time::Duration;

use observability::ConsumerMetricsAggregator;

/// Counters accumulated by a control loop run
#[derive(Debug, Clone, Default)]
pub struct LoopStats {
    /// Non-empty pulls
    pub batches: u64,

    /// Messages received across all batches
    pub received: u64,

    /// Messages that went through enrichment
    pub enriched: u64,

    /// Enriched messages with at least one failed lookup
    pub partially_enriched: u64,

    /// Messages the quota turned away
    pub skipped: u64,

    /// Messages that could not be decoded
    pub malformed: u64,

    /// Rows accepted by the sink
    pub rows_written: u64,

    /// Handles acknowledged
    pub acknowledged: u64,

    /// Acknowledge calls
    pub ack_calls: u64,

    /// Skipped messages left for redelivery (`ack_skipped = false`)
    pub left_unacked: u64,

    /// Completed quota cooldowns
    pub cooldowns: u64,

    /// Wall time of the run
    pub duration: Duration,

    /// Latency and batch-size distributions
    pub metrics: ConsumerMetricsAggregator,
}

impl LoopStats {
    /// Messages received per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.received as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of handled messages that were enriched, in percent
    pub fn enrichment_rate(&self) -> f64 {
        let handled = self.enriched + self.skipped;
        if handled > 0 {
            self.enriched as f64 / handled as f64 * 100.0
        } else {
            0.0
        }
    }
}

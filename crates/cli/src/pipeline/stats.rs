//! Run statistics printed on exit.

use consumer::LoopStats;
use warehouse::MetricsSnapshot;

/// Statistics from one consumer run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Full subscription path consumed
    pub subscription: String,

    /// Sink the rows went to
    pub sink: String,

    /// Control loop counters
    pub loop_stats: LoopStats,

    /// Sink write counters
    pub sink_metrics: MetricsSnapshot,
}

impl RunStats {
    pub fn print_summary(&self) {
        let stats = &self.loop_stats;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Consumer Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Subscription: {}", self.subscription);
        println!("   ├─ Duration: {:.2}s", stats.duration.as_secs_f64());
        println!("   ├─ Batches: {}", stats.batches);
        println!("   ├─ Messages received: {}", stats.received);
        println!("   └─ Throughput: {:.2} msg/s", stats.throughput());

        println!("\n🌍 Enrichment");
        println!(
            "   ├─ Enriched: {} ({:.1}%)",
            stats.enriched,
            stats.enrichment_rate()
        );
        println!("   ├─ Partially enriched: {}", stats.partially_enriched);
        println!("   ├─ Skipped (quota): {}", stats.skipped);
        println!("   ├─ Malformed: {}", stats.malformed);
        println!("   └─ Cooldowns: {}", stats.cooldowns);

        println!("\n📦 Delivery ({})", self.sink);
        println!("   ├─ Rows written: {}", stats.rows_written);
        println!("   ├─ Write failures: {}", self.sink_metrics.failure_count);
        println!("   ├─ Mean write latency: {:.2}ms", self.sink_metrics.mean_write_ms);
        println!("   ├─ Acknowledged: {} in {} calls", stats.acknowledged, stats.ack_calls);
        println!("   └─ Left for redelivery: {}", stats.left_unacked);

        println!("\n📈 Distributions");
        for line in stats.metrics.summary().to_string().lines() {
            println!("   {}", line);
        }

        println!();
    }
}

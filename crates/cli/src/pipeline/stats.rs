//! Relay statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::TickMetricsAggregator;
use pose_engine::EngineStats;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Poses handed to the sink
    pub poses_applied: u64,

    /// Receiver-side counters
    pub ingestion: MetricsSnapshot,

    /// Engine-side counters
    pub engine: EngineStats,

    /// Per-tick metrics aggregator
    pub tick_metrics: TickMetricsAggregator,
}

impl RelayStats {
    /// Ticks per second
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.tick_metrics.total_ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received datagrams that never reached history, in percent
    pub fn loss_rate(&self) -> f64 {
        let received = self.ingestion.datagrams_received;
        if received == 0 {
            return 0.0;
        }
        let lost = received.saturating_sub(self.engine.accepted);
        lost as f64 / received as f64 * 100.0
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {} ({:.1}/s)", self.tick_metrics.total_ticks, self.tick_rate());
        println!("   ├─ Poses applied: {}", self.poses_applied);
        println!("   └─ Loss: {:.2}%", self.loss_rate());

        let ingest = &self.ingestion;
        println!("\n📡 Ingestion");
        println!("   ├─ Datagrams received: {}", ingest.datagrams_received);
        println!("   ├─ Decode errors: {}", ingest.decode_errors);
        println!("   ├─ Transport errors: {}", ingest.transport_errors);
        println!("   └─ Queue overflows: {}", ingest.queue_overflows);

        let engine = &self.engine;
        println!("\n🧭 Engine");
        println!("   ├─ Accepted: {}", engine.accepted);
        println!("   ├─ Stale: {}", engine.stale);
        println!("   ├─ Duplicate: {}", engine.duplicate);
        println!("   ├─ Hard outliers: {}", engine.hard_outlier);
        println!("   └─ Out of order: {}", engine.out_of_order);

        println!("\n{}", self.tick_metrics.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut stats = RelayStats {
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        stats.tick_metrics.total_ticks = 180;
        stats.ingestion.datagrams_received = 100;
        stats.engine.accepted = 90;

        assert!((stats.tick_rate() - 90.0).abs() < 1e-9);
        assert!((stats.loss_rate() - 10.0).abs() < 1e-9);
        assert_eq!(RelayStats::default().loss_rate(), 0.0);
    }
}

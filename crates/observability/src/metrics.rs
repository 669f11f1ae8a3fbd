//! Pose relay metrics
//!
//! Records per-tick diagnostics (`TickMeta`) to the `metrics` facade and keeps
//! an in-memory aggregate for end-of-run summaries.

use contracts::{FilterAction, TickMeta, TickOutcome};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Register descriptions for the relay's metrics with the installed recorder
pub fn describe_relay_metrics() {
    describe_counter!("pose_relay_ticks_total", "Consumer ticks by outcome");
    describe_counter!(
        "pose_relay_samples_received_total",
        "Samples accepted into history"
    );
    describe_counter!(
        "pose_relay_samples_dropped_total",
        "Samples dropped, labelled by reason"
    );
    describe_counter!(
        "pose_relay_queue_overflow_total",
        "Samples evicted from a full queue"
    );
    describe_counter!("pose_relay_calibrations_total", "Installed alignment offsets");
    describe_gauge!("pose_relay_history_len", "Samples held in history");
    describe_gauge!(
        "pose_relay_window_ms",
        Unit::Milliseconds,
        "Current render delay"
    );
    describe_gauge!(
        "pose_relay_delay_ema_ms",
        Unit::Milliseconds,
        "Smoothed transport delay"
    );
    describe_gauge!(
        "pose_relay_jitter_ema_ms",
        Unit::Milliseconds,
        "Smoothed delay jitter"
    );
    describe_gauge!(
        "pose_relay_clock_offset_s",
        Unit::Seconds,
        "Sender to local clock offset"
    );
    describe_histogram!(
        "pose_relay_applied_step_m",
        "Distance moved by the applied pose per tick"
    );
    describe_histogram!("pose_relay_blend_factor", "Smoothing blend factor per tick");
}

/// Record metrics for one consumer tick
///
/// # Example
///
/// ```ignore
/// let output = engine.tick(now, &head, rx.dequeue_all());
/// observability::metrics::record_tick_metrics(&output.meta);
/// ```
pub fn record_tick_metrics(meta: &TickMeta) {
    counter!("pose_relay_ticks_total", "outcome" => meta.outcome.as_str()).increment(1);

    gauge!("pose_relay_history_len").set(meta.history_len as f64);
    gauge!("pose_relay_window_ms").set(meta.render_delay_ms);
    histogram!("pose_relay_window_ms_hist").record(meta.render_delay_ms);

    if let Some(delay) = meta.delay_ema_ms {
        gauge!("pose_relay_delay_ema_ms").set(delay);
    }
    if let Some(jitter) = meta.jitter_ema_ms {
        gauge!("pose_relay_jitter_ema_ms").set(jitter);
    }
    if let Some(offset) = meta.clock_offset_s {
        gauge!("pose_relay_clock_offset_s").set(offset);
    }

    if let Some(factor) = meta.blend_factor {
        histogram!("pose_relay_blend_factor").record(factor);
    }
    if let Some(step) = meta.applied_step_m {
        histogram!("pose_relay_applied_step_m").record(step);
    }

    match meta.filter_action {
        FilterAction::Passed => {}
        FilterAction::Deadzoned => counter!("pose_relay_deadzone_total").increment(1),
        FilterAction::SpikeSoftened => counter!("pose_relay_spike_softened_total").increment(1),
    }
}

/// Record a sample accepted into history
pub fn record_sample_received() {
    counter!("pose_relay_samples_received_total").increment(1);
}

/// Record a sample dropped by the engine
pub fn record_sample_dropped(reason: &'static str) {
    counter!("pose_relay_samples_dropped_total", "reason" => reason).increment(1);
}

/// Record a calibration step
pub fn record_calibration(offset_distance_m: f64, offset_angle_deg: f64) {
    counter!("pose_relay_calibrations_total").increment(1);
    gauge!("pose_relay_alignment_offset_m").set(offset_distance_m);
    gauge!("pose_relay_alignment_offset_deg").set(offset_angle_deg);
}

/// Tick metrics aggregator
///
/// Aggregates in memory for the summary printed at shutdown.
#[derive(Debug, Clone, Default)]
pub struct TickMetricsAggregator {
    pub total_ticks: u64,
    pub inert_ticks: u64,
    pub samples_accepted: u64,
    pub samples_rejected: u64,
    pub deadzoned: u64,
    pub spikes_softened: u64,
    pub window_stats: RunningStats,
    pub delay_stats: RunningStats,
    pub jitter_stats: RunningStats,
    pub step_stats: RunningStats,
}

impl TickMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, meta: &TickMeta) {
        self.total_ticks += 1;
        if meta.outcome == TickOutcome::Inert {
            self.inert_ticks += 1;
        }
        self.samples_accepted += u64::from(meta.accepted);
        self.samples_rejected += u64::from(meta.rejected);

        match meta.filter_action {
            FilterAction::Passed => {}
            FilterAction::Deadzoned => self.deadzoned += 1,
            FilterAction::SpikeSoftened => self.spikes_softened += 1,
        }

        self.window_stats.push(meta.render_delay_ms);
        if let Some(delay) = meta.delay_ema_ms {
            self.delay_stats.push(delay);
        }
        if let Some(jitter) = meta.jitter_ema_ms {
            self.jitter_stats.push(jitter);
        }
        if let Some(step) = meta.applied_step_m {
            self.step_stats.push(step * 1000.0);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let offered = self.samples_accepted + self.samples_rejected;
        MetricsSummary {
            total_ticks: self.total_ticks,
            inert_ticks: self.inert_ticks,
            samples_accepted: self.samples_accepted,
            samples_rejected: self.samples_rejected,
            reject_rate: if offered > 0 {
                self.samples_rejected as f64 / offered as f64 * 100.0
            } else {
                0.0
            },
            deadzoned: self.deadzoned,
            spikes_softened: self.spikes_softened,
            window_ms: StatsSummary::from(&self.window_stats),
            delay_ema_ms: StatsSummary::from(&self.delay_stats),
            jitter_ema_ms: StatsSummary::from(&self.jitter_stats),
            applied_step_mm: StatsSummary::from(&self.step_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_ticks: u64,
    pub inert_ticks: u64,
    pub samples_accepted: u64,
    pub samples_rejected: u64,
    pub reject_rate: f64,
    pub deadzoned: u64,
    pub spikes_softened: u64,
    pub window_ms: StatsSummary,
    pub delay_ema_ms: StatsSummary,
    pub jitter_ema_ms: StatsSummary,
    pub applied_step_mm: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pose Relay Summary ===")?;
        writeln!(
            f,
            "Ticks: {} ({} inert)",
            self.total_ticks, self.inert_ticks
        )?;
        writeln!(
            f,
            "Samples accepted: {}, rejected: {} ({:.2}%)",
            self.samples_accepted, self.samples_rejected, self.reject_rate
        )?;
        writeln!(
            f,
            "Deadzoned ticks: {}, spikes softened: {}",
            self.deadzoned, self.spikes_softened
        )?;
        writeln!(f, "Render window (ms): {}", self.window_ms)?;
        writeln!(f, "Delay EMA (ms): {}", self.delay_ema_ms)?;
        writeln!(f, "Jitter EMA (ms): {}", self.jitter_ema_ms)?;
        writeln!(f, "Applied step (mm): {}", self.applied_step_mm)?;
        Ok(())
    }
}

/// Summary of a `RunningStats`
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
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
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
    use contracts::{ResampleKind, ResamplingMode};

    fn meta(outcome: TickOutcome, action: FilterAction) -> TickMeta {
        TickMeta {
            now: 1.0,
            mode: ResamplingMode::Hybrid,
            outcome,
            resample: Some(ResampleKind::Interpolated),
            filter_action: action,
            accepted: 2,
            rejected: 1,
            history_len: 10,
            render_delay_ms: 30.0,
            delay_ema_ms: Some(12.0),
            jitter_ema_ms: Some(3.0),
            clock_offset_s: Some(0.5),
            blend_factor: Some(0.4),
            applied_step_m: Some(0.002),
            calibrating: false,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = TickMetricsAggregator::new();
        aggregator.update(&meta(TickOutcome::Applied, FilterAction::SpikeSoftened));
        aggregator.update(&meta(TickOutcome::Inert, FilterAction::Passed));

        assert_eq!(aggregator.total_ticks, 2);
        assert_eq!(aggregator.inert_ticks, 1);
        assert_eq!(aggregator.samples_accepted, 4);
        assert_eq!(aggregator.samples_rejected, 2);
        assert_eq!(aggregator.spikes_softened, 1);

        let summary = aggregator.summary();
        assert!((summary.reject_rate - 100.0 / 3.0).abs() < 1e-9);
        assert!((summary.applied_step_mm.mean - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = TickMetricsAggregator::new();
        aggregator.update(&meta(TickOutcome::Applied, FilterAction::Passed));
        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Ticks: 1 (0 inert)"));
        assert!(output.contains("33.33%"));
    }
}

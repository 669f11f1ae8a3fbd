//! Consumer tick.
//!
//! One `PoseEngine` owns every piece of per-session state (history, clock,
//! filters, smoother, calibration) and is driven once per render tick.

use std::fmt;

use contracts::{
    AlignmentOffset, ContractError, FilterAction, HeadPoseSource, Pose, PoseSample, PoseSink,
    RelayConfig, ResamplingMode, TickMeta, TickOutcome,
};
use ingestion::SampleReceiver;
use metrics::counter;
use tracing::{debug, instrument, trace, warn};

use crate::calibrate::AlignmentCalibrator;
use crate::clock::ClockSynchronizer;
use crate::error::SampleRejection;
use crate::filter::OutlierFilter;
use crate::history::{SampleEntry, SampleHistory};
use crate::reconstruct::PoseReconstructor;
use crate::resample::{strategy_for, ResampleContext, ResamplingStrategy};
use crate::smoother::AdaptiveSmoother;

const MIN_RETENTION_S: f64 = 0.05;

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    /// Final pose to apply; `None` while inert
    pub pose: Option<Pose>,
    /// Resampled raw pose before alignment, filtering and smoothing
    pub raw: Option<Pose>,
    pub meta: TickMeta,
}

/// Running totals since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub accepted: u64,
    pub stale: u64,
    pub duplicate: u64,
    pub hard_outlier: u64,
    pub malformed: u64,
    pub out_of_order: u64,
}

impl EngineStats {
    pub fn rejected(&self) -> u64 {
        self.stale + self.duplicate + self.hard_outlier + self.malformed
    }

    fn count_rejection(&mut self, rejection: &SampleRejection) {
        match rejection {
            SampleRejection::Stale { .. } => self.stale += 1,
            SampleRejection::Duplicate { .. } => self.duplicate += 1,
            SampleRejection::HardOutlier { .. } => self.hard_outlier += 1,
            SampleRejection::Malformed => self.malformed += 1,
        }
    }
}

pub struct PoseEngine {
    config: RelayConfig,
    history: SampleHistory,
    clock: ClockSynchronizer,
    reconstructor: PoseReconstructor,
    strategy: Box<dyn ResamplingStrategy>,
    filter: OutlierFilter,
    smoother: AdaptiveSmoother,
    calibrator: AlignmentCalibrator,
    newest_source_time: Option<f64>,
    last_raw: Option<Pose>,
    stats: EngineStats,
}

impl fmt::Debug for PoseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseEngine")
            .field("mode", &self.strategy.mode())
            .field("history", &self.history)
            .field("clock", &self.clock)
            .field("offset", self.calibrator.offset())
            .field("stats", &self.stats)
            .finish()
    }
}

impl PoseEngine {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            config: config.clone(),
            history: SampleHistory::new(config.history.linear_scan_threshold),
            clock: ClockSynchronizer::new(&config.clock),
            reconstructor: PoseReconstructor::new(&config.reconstruction),
            strategy: strategy_for(config.resampling.mode),
            filter: OutlierFilter::new(&config.filter),
            smoother: AdaptiveSmoother::new(&config.smoothing),
            calibrator: AlignmentCalibrator::new(),
            newest_source_time: None,
            last_raw: None,
            stats: EngineStats::default(),
        }
    }

    /// Run one tick at local render time `now` (seconds)
    ///
    /// `incoming` is everything dequeued since the previous tick, in arrival order.
    #[instrument(
        level = "trace",
        name = "pose_engine_tick",
        skip(self, head, incoming),
        fields(mode = %self.strategy.mode())
    )]
    pub fn tick<I>(&mut self, now: f64, head: &Pose, incoming: I) -> TickOutput
    where
        I: IntoIterator<Item = PoseSample>,
    {
        self.stats.ticks += 1;
        self.reconstructor.record_head(now, *head);

        let mut accepted = 0u32;
        let mut rejected = 0u32;
        for sample in incoming {
            match self.ingest(now, head, &sample) {
                Ok(()) => {
                    accepted += 1;
                    observability::record_sample_received();
                }
                Err(rejection) => {
                    rejected += 1;
                    self.stats.count_rejection(&rejection);
                    observability::record_sample_dropped(rejection.reason());
                    warn!(
                        sequence_id = sample.sequence_id,
                        source_time = sample.source_time,
                        reason = rejection.reason(),
                        "sample rejected: {rejection}"
                    );
                }
            }
        }
        self.prune();

        let render_delay_ms = self
            .clock
            .render_delay_ms(self.config.resampling.render_delay_ms, &self.config.window);
        let render_delay_s = render_delay_ms / 1000.0;
        let ctx = ResampleContext {
            now,
            sender_query: self.clock.to_sender(now - render_delay_s),
            render_delay_s,
            lead_s: self.config.resampling.lead_ms / 1000.0,
            min_delta_s: self.config.resampling.min_delta_s,
        };
        let resampled = self.strategy.resample(&self.history, &ctx);

        if let Some(r) = &resampled {
            self.last_raw = Some(r.pose);
        }
        if let Some(Err(e)) = self
            .calibrator
            .poll(now, self.last_raw.as_ref(), self.smoother.last())
        {
            debug!(error = %e, "scheduled calibration step failed");
        }

        let mut meta = TickMeta {
            now,
            mode: self.strategy.mode(),
            outcome: TickOutcome::Inert,
            resample: None,
            filter_action: FilterAction::Passed,
            accepted,
            rejected,
            history_len: self.history.len(),
            render_delay_ms,
            delay_ema_ms: self.clock.delay_ema_ms(),
            jitter_ema_ms: self.clock.jitter_ema_ms(),
            clock_offset_s: self.clock.offset(),
            blend_factor: None,
            applied_step_m: None,
            calibrating: self.calibrator.is_calibrating(now),
        };

        let Some(resampled) = resampled else {
            trace!("no samples yet, tick inert");
            observability::record_tick_metrics(&meta);
            return TickOutput {
                pose: None,
                raw: None,
                meta,
            };
        };

        let aligned = self.calibrator.offset().apply(&resampled.pose);
        let (candidate, action) = self.filter.guard(&aligned, self.smoother.last());
        self.smoother.set_boost(self.calibrator.boost(now));
        let step = self.smoother.smooth(now, &candidate, resampled.confidence);

        meta.outcome = TickOutcome::Applied;
        meta.resample = Some(resampled.kind);
        meta.filter_action = action;
        meta.blend_factor = step.factor;
        meta.applied_step_m = Some(step.step_m);
        observability::record_tick_metrics(&meta);

        TickOutput {
            pose: Some(step.pose),
            raw: Some(resampled.pose),
            meta,
        }
    }

    /// Drain the queue and tick
    pub fn tick_from_queue(&mut self, now: f64, head: &Pose, queue: &SampleReceiver) -> TickOutput {
        self.tick(now, head, queue.dequeue_all())
    }

    /// Read the head pose once, tick, and hand the result to `sink`
    pub fn drive<H, S>(
        &mut self,
        now: f64,
        head_source: &mut H,
        queue: &SampleReceiver,
        sink: &mut S,
    ) -> TickOutput
    where
        H: HeadPoseSource + ?Sized,
        S: PoseSink + ?Sized,
    {
        let head = head_source.current_head_pose();
        let output = self.tick_from_queue(now, &head, queue);
        if let Some(pose) = &output.pose {
            sink.apply_pose(pose);
        }
        output
    }

    fn ingest(&mut self, now: f64, head: &Pose, sample: &PoseSample) -> Result<(), SampleRejection> {
        let t = sample.source_time;
        if let Some(newest) = self.newest_source_time {
            if t < newest - self.config.history.max_sample_age_s {
                return Err(SampleRejection::Stale {
                    source_time: t,
                    newest,
                });
            }
        }
        if self
            .history
            .iter()
            .any(|e| e.sequence_id == sample.sequence_id && e.time == t)
        {
            return Err(SampleRejection::Duplicate {
                sequence_id: sample.sequence_id,
                source_time: t,
            });
        }

        self.clock.note_arrival(now, t);
        let raw = self
            .reconstructor
            .reconstruct(sample, head, self.clock.capture_local_time(t));
        if !raw.is_finite() {
            return Err(SampleRejection::Malformed);
        }
        self.filter.check_hard_reject(&raw)?;

        let index = self.history.insert(SampleEntry {
            time: t,
            sequence_id: sample.sequence_id,
            pose: raw,
            confidence: sample.confidence,
        });
        if index + 1 < self.history.len() {
            self.stats.out_of_order += 1;
            counter!("pose_relay_samples_out_of_order_total").increment(1);
            trace!(sequence_id = sample.sequence_id, index, "late sample sorted into history");
        }
        self.newest_source_time = Some(self.newest_source_time.map_or(t, |n| n.max(t)));

        if let Some(oldest) = self.history.oldest() {
            self.clock.try_initialize(now, oldest.time, self.history.len());
        }
        self.clock.observe(now, t);
        self.stats.accepted += 1;
        Ok(())
    }

    fn prune(&mut self) {
        let Some(newest) = self.newest_source_time else {
            return;
        };
        let retention = self.config.history.retention_s.max(MIN_RETENTION_S);
        self.history.prune_older_than(newest - retention);
        self.history.prune_to_max_count(self.config.history.max_count.max(2));
    }

    /// Align the latest raw pose onto `target`
    pub fn calibrate_to(&mut self, target: &Pose) -> Result<AlignmentOffset, ContractError> {
        self.calibrator
            .calibrate_to(target, self.last_raw.as_ref(), self.smoother.last())
    }

    /// Schedule `steps` calibrations `interval_s` apart, starting at `now`
    pub fn calibrate_multi_step(
        &mut self,
        now: f64,
        target: Pose,
        interval_s: f64,
        steps: u32,
    ) -> Result<(), ContractError> {
        self.calibrator
            .schedule_multi_step(now, target, interval_s, steps)
    }

    /// Multi-step calibration with the configured interval and step count
    pub fn calibrate_multi_step_default(&mut self, now: f64, target: Pose) -> Result<(), ContractError> {
        let interval_s = self.config.calibration.default_interval_s;
        let steps = self.config.calibration.default_steps;
        self.calibrate_multi_step(now, target, interval_s, steps)
    }

    pub fn cancel_calibration(&mut self) {
        self.calibrator.cancel();
    }

    pub fn clear_alignment(&mut self) {
        self.calibrator.clear_offset();
    }

    pub fn alignment(&self) -> &AlignmentOffset {
        self.calibrator.offset()
    }

    pub fn mode(&self) -> ResamplingMode {
        self.strategy.mode()
    }

    pub fn set_mode(&mut self, mode: ResamplingMode) {
        self.set_strategy(strategy_for(mode));
    }

    /// Install any strategy, including ones outside the built-in modes
    pub fn set_strategy(&mut self, strategy: Box<dyn ResamplingStrategy>) {
        debug!(from = %self.strategy.mode(), to = %strategy.mode(), "resampling strategy changed");
        self.strategy = strategy;
    }

    /// Switch to the next mode in `None → TimestampCompare → BufferInterpolation → Hybrid`
    pub fn cycle_mode(&mut self) -> ResamplingMode {
        let next = self.strategy.mode().next();
        self.set_mode(next);
        next
    }

    /// Step the smoothing base factor by ±0.05 per notch; returns the new value
    pub fn step_base_factor(&mut self, notches: i32) -> f64 {
        self.smoother.adjust_base_factor(notches)
    }

    pub fn set_base_factor(&mut self, factor: f64) {
        self.smoother.set_base_factor(factor);
    }

    pub fn base_factor(&self) -> f64 {
        self.smoother.base_factor()
    }

    pub fn last_raw(&self) -> Option<&Pose> {
        self.last_raw.as_ref()
    }

    pub fn last_applied(&self) -> Option<&Pose> {
        self.smoother.last()
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn clock(&self) -> &ClockSynchronizer {
        &self.clock
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ResampleKind, UnitQuaternion, Vector3};

    fn sample(t: f64, seq: u64, z: f64) -> PoseSample {
        PoseSample::from_components(t, seq, [0.0, 0.0, z], [0.0, 0.0, 0.0, 1.0], None).unwrap()
    }

    /// Filters wide open, smoothing off
    fn passthrough_config(mode: ResamplingMode) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.resampling.mode = mode;
        config.window.adaptive = false;
        config.filter.deadzone_m = 0.0;
        config.filter.deadzone_deg = 0.0;
        config.filter.spike_m = 100.0;
        config.filter.spike_deg = 180.0;
        config.filter.hard_reject_m = 100.0;
        config.filter.hard_reject_deg = 180.0;
        config.smoothing.mode = contracts::SmoothingMode::Linear;
        config.smoothing.base_factor = 1.0;
        config
    }

    #[test]
    fn test_inert_without_samples() {
        for mode in ResamplingMode::ALL {
            let mut engine = PoseEngine::new(&RelayConfig {
                resampling: contracts::ResamplingConfig {
                    mode,
                    ..Default::default()
                },
                ..Default::default()
            });
            let out = engine.tick(0.0, &Pose::identity(), Vec::new());
            assert!(out.pose.is_none());
            assert_eq!(out.meta.outcome, TickOutcome::Inert);
        }
    }

    #[test]
    fn test_first_sample_applies_latest() {
        let mut engine = PoseEngine::new(&RelayConfig::default());
        let out = engine.tick(5.0, &Pose::identity(), vec![sample(0.0, 0, 0.25)]);
        assert_eq!(out.meta.resample, Some(ResampleKind::Latest));
        assert_eq!(out.pose.unwrap().position.z, 0.25);
        assert!(engine.clock().offset().is_none());
    }

    #[test]
    fn test_end_to_end_interpolation() {
        let mut engine = PoseEngine::new(&passthrough_config(ResamplingMode::BufferInterpolation));
        // z(t) = 20 * (t - 0.05); the clock seeds offset = 100.0 - 0.0
        let samples = vec![sample(0.0, 0, -1.0), sample(0.05, 1, 0.0), sample(0.1, 2, 1.0)];
        engine.tick(100.0, &Pose::identity(), samples);
        assert_eq!(engine.clock().offset(), Some(100.0));

        // render time 100.095 - 30 ms maps to sender time 0.065
        let out = engine.tick(100.095, &Pose::identity(), Vec::new());
        assert_eq!(out.meta.resample, Some(ResampleKind::Interpolated));
        let raw = out.raw.unwrap();
        assert!((raw.position.z - 0.3).abs() < 1e-9, "got {}", raw.position.z);
    }

    #[test]
    fn test_literal_linear_scenario() {
        let mut engine = PoseEngine::new(&passthrough_config(ResamplingMode::BufferInterpolation));
        // 0 → 1 over 0.00..0.10 s
        let samples = vec![sample(0.0, 0, 0.0), sample(0.05, 1, 0.5), sample(0.1, 2, 1.0)];
        engine.tick(100.0, &Pose::identity(), samples);

        let out = engine.tick(100.095, &Pose::identity(), Vec::new());
        let query = out.meta.now - out.meta.render_delay_ms / 1000.0 - engine.clock().offset().unwrap();
        let (a, b) = engine.history().bracket(query).unwrap();
        assert_eq!((a.time, b.time), (0.05, 0.1));

        let t = crate::resample::interpolation_parameter(a.time, b.time, query);
        assert!((t - 0.3).abs() < 1e-9, "t = {t}");
        assert!((out.raw.unwrap().position.z - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_head_compensation_uses_capture_time() {
        // sender clock = local - 1000, 40 ms transit, 20 ms spacing, 10 ms ticks
        let mut config = RelayConfig::default();
        config.clock.transit_estimate_ms = 40.0;
        config.resampling.mode = ResamplingMode::None;
        let mut engine = PoseEngine::new(&config);

        for k in 0..60u64 {
            let now = 1000.0 + k as f64 * 0.01;
            let head = Pose::from_position(Vector3::new(now, 0.0, 0.0));
            // sample i is captured at tick 2i and arrives at tick 2i + 4
            let incoming: Vec<_> = (k >= 4 && k % 2 == 0)
                .then(|| (k - 4) / 2)
                .map(|i| sample(i as f64 * 0.02, i, 0.0))
                .into_iter()
                .collect();
            engine.tick(now, &head, incoming);
        }

        assert!(engine.history().len() > 10);
        for entry in engine.history().iter() {
            let captured_at = 1000.0 + entry.time;
            assert!(
                (entry.pose.position.x - captured_at).abs() < 1e-6,
                "sample {} used head {} instead of {}",
                entry.sequence_id,
                entry.pose.position.x,
                captured_at
            );
        }

        let delay = engine.clock().delay_ema_ms().unwrap();
        assert!((delay - 40.0).abs() < 1e-6, "delay {delay}");
        let out = engine.tick(1000.6, &Pose::from_position(Vector3::new(1000.6, 0.0, 0.0)), Vec::new());
        assert!((out.meta.render_delay_ms - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_stale_and_duplicate_rejected() {
        let mut engine = PoseEngine::new(&RelayConfig::default());
        engine.tick(0.0, &Pose::identity(), vec![sample(5.0, 1, 0.0), sample(5.01, 2, 0.0)]);

        let out = engine.tick(
            0.1,
            &Pose::identity(),
            vec![sample(3.0, 3, 0.0), sample(5.01, 2, 0.0), sample(5.005, 4, 0.0)],
        );
        assert_eq!(out.meta.accepted, 1);
        assert_eq!(out.meta.rejected, 2);

        let stats = engine.stats();
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.duplicate, 1);
        assert_eq!(stats.out_of_order, 1);
        let times: Vec<f64> = engine.history().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![5.0, 5.005, 5.01]);
    }

    #[test]
    fn test_hard_outlier_keeps_previous_state() {
        let mut config = RelayConfig::default();
        config.resampling.mode = ResamplingMode::None;
        let mut engine = PoseEngine::new(&config);

        engine.tick(0.0, &Pose::identity(), vec![sample(0.0, 0, 0.1)]);
        let out = engine.tick(0.016, &Pose::identity(), vec![sample(0.016, 1, 0.9)]);

        assert_eq!(out.meta.rejected, 1);
        assert_eq!(engine.stats().hard_outlier, 1);
        assert_eq!(out.raw.unwrap().position.z, 0.1);
    }

    #[test]
    fn test_calibration_idempotent_and_exact() {
        let mut engine = PoseEngine::new(&passthrough_config(ResamplingMode::None));
        let head = Pose::new(
            Vector3::new(0.0, 1.6, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3),
        );
        engine.tick(0.0, &head, vec![sample(0.0, 0, 0.4)]);
        engine.tick(0.016, &head, Vec::new());

        let target = Pose::new(
            Vector3::new(1.0, 1.0, 1.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2),
        );
        let first = engine.calibrate_to(&target).unwrap();
        engine.tick(0.032, &head, Vec::new());
        let second = engine.calibrate_to(&target).unwrap();
        assert_eq!(first, second);

        let aligned = engine.alignment().apply(engine.last_raw().unwrap());
        assert!(aligned.distance_to(&target) < 1e-9);
        assert!(aligned.angle_to_deg(&target) < 1e-4);

        let out = engine.tick(0.048, &head, Vec::new());
        assert!(out.pose.unwrap().distance_to(&target) < 1e-9);
    }

    #[test]
    fn test_calibration_without_basis() {
        let mut engine = PoseEngine::new(&RelayConfig::default());
        let err = engine.calibrate_to(&Pose::identity()).unwrap_err();
        assert!(matches!(err, ContractError::CalibrationWithoutBasis));
    }

    #[test]
    fn test_multi_step_calibration_boosts() {
        let mut engine = PoseEngine::new(&RelayConfig::default());
        engine.tick(0.0, &Pose::identity(), vec![sample(0.0, 0, 0.0)]);

        let target = Pose::from_position(Vector3::new(0.0, 0.0, 0.01));
        engine.calibrate_multi_step(0.016, target, 0.1, 3).unwrap();

        let out = engine.tick(0.016, &Pose::identity(), Vec::new());
        assert!(out.meta.calibrating);
        // boost 1 → factor 1, lands on target
        assert!((out.pose.unwrap().position.z - 0.01).abs() < 1e-9);

        engine.cancel_calibration();
        let out = engine.tick(0.032, &Pose::identity(), Vec::new());
        assert!(!out.meta.calibrating);
    }

    #[test]
    fn test_deadzone_holds_applied_pose() {
        let mut config = RelayConfig::default();
        config.resampling.mode = ResamplingMode::None;
        let mut engine = PoseEngine::new(&config);

        let first = engine
            .tick(0.0, &Pose::identity(), vec![sample(0.0, 0, 0.2)])
            .pose
            .unwrap();
        let out = engine.tick(0.016, &Pose::identity(), vec![sample(0.016, 1, 0.2001)]);
        assert_eq!(out.meta.filter_action, FilterAction::Deadzoned);
        assert_eq!(out.pose.unwrap(), first);
    }

    #[test]
    fn test_cycle_mode() {
        let mut engine = PoseEngine::new(&RelayConfig::default());
        assert_eq!(engine.mode(), ResamplingMode::Hybrid);
        assert_eq!(engine.cycle_mode(), ResamplingMode::None);
        assert_eq!(engine.cycle_mode(), ResamplingMode::TimestampCompare);

        let out = engine.tick(0.0, &Pose::identity(), Vec::new());
        assert_eq!(out.meta.mode, ResamplingMode::TimestampCompare);
    }

    #[test]
    fn test_step_base_factor() {
        let mut engine = PoseEngine::new(&RelayConfig::default());
        assert!((engine.step_base_factor(2) - 0.6).abs() < 1e-12);
        engine.set_base_factor(3.0);
        assert_eq!(engine.base_factor(), 1.0);
    }

    #[test]
    fn test_history_pruned_by_age_and_count() {
        let mut config = RelayConfig::default();
        config.history.max_count = 10;
        config.filter.hard_reject_m = 100.0;
        let mut engine = PoseEngine::new(&config);

        let samples: Vec<_> = (0..100).map(|i| sample(i as f64 * 0.01, i, 0.0)).collect();
        engine.tick(0.0, &Pose::identity(), samples);
        assert_eq!(engine.history().len(), 10);

        config.history.max_count = 256;
        let mut engine = PoseEngine::new(&config);
        let samples: Vec<_> = (0..100).map(|i| sample(i as f64 * 0.01, i, 0.0)).collect();
        engine.tick(0.0, &Pose::identity(), samples);
        // 0.5 s retention at 10 ms spacing
        assert!(engine.history().len() <= 51);
        assert!(engine.history().oldest().unwrap().time >= 0.49 - 1e-9);
    }
}

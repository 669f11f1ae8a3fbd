//! Alignment calibration.
//!
//! A calibration computes the offset that moves the latest *raw* reconstructed
//! pose onto a target, so repeating it without new samples yields the same
//! offset. The multi-step variant is a queue of `(due_time, step)` entries
//! driven by the tick clock; cancelling clears the queue.

use std::collections::VecDeque;

use contracts::{slerp, AlignmentOffset, ContractError, Pose};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledStep {
    due: f64,
    index: u32,
}

#[derive(Debug, Clone, Copy)]
struct MultiStepRun {
    target: Pose,
    steps: u32,
    completed: u32,
    offset_sum: contracts::Vector3<f64>,
    rotation_mean: contracts::UnitQuaternion<f64>,
}

/// Full responsiveness for `hold_s`, then a linear decay over `decay_s`
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoostWindow {
    start: f64,
    hold_s: f64,
    decay_s: f64,
}

impl BoostWindow {
    fn level(&self, now: f64) -> f64 {
        let elapsed = now - self.start;
        if elapsed < 0.0 {
            0.0
        } else if elapsed <= self.hold_s {
            1.0
        } else if self.decay_s > 0.0 {
            (1.0 - (elapsed - self.hold_s) / self.decay_s).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn is_over(&self, now: f64) -> bool {
        now - self.start > self.hold_s + self.decay_s
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlignmentCalibrator {
    offset: AlignmentOffset,
    schedule: VecDeque<ScheduledStep>,
    run: Option<MultiStepRun>,
    boost: Option<BoostWindow>,
}

impl AlignmentCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> &AlignmentOffset {
        &self.offset
    }

    pub fn set_offset(&mut self, offset: AlignmentOffset) {
        self.offset = offset;
    }

    pub fn clear_offset(&mut self) {
        self.offset = AlignmentOffset::identity();
    }

    /// One-shot calibration
    ///
    /// Uses the latest raw pose as basis; with none yet, falls back to the
    /// displayed pose (degraded: the displayed pose already carries smoothing).
    pub fn calibrate_to(
        &mut self,
        target: &Pose,
        raw_basis: Option<&Pose>,
        displayed: Option<&Pose>,
    ) -> Result<AlignmentOffset, ContractError> {
        let offset = offset_for(target, raw_basis, displayed)?;
        self.install(offset);
        Ok(offset)
    }

    /// Schedule `steps` calibrations `interval_s` apart, the first one now.
    ///
    /// Replaces any pending schedule.
    pub fn schedule_multi_step(
        &mut self,
        now: f64,
        target: Pose,
        interval_s: f64,
        steps: u32,
    ) -> Result<(), ContractError> {
        if steps == 0 {
            return Err(ContractError::calibration_schedule("steps must be at least 1"));
        }
        if !interval_s.is_finite() || interval_s <= 0.0 {
            return Err(ContractError::calibration_schedule(format!(
                "interval must be positive, got {interval_s}"
            )));
        }

        self.cancel();
        self.schedule = (0..steps)
            .map(|index| ScheduledStep {
                due: now + f64::from(index) * interval_s,
                index,
            })
            .collect();
        self.run = Some(MultiStepRun {
            target,
            steps,
            completed: 0,
            offset_sum: contracts::Vector3::zeros(),
            rotation_mean: contracts::UnitQuaternion::identity(),
        });

        let window = (f64::from(steps - 1) * interval_s).max(interval_s);
        self.boost = Some(BoostWindow {
            start: now,
            hold_s: window,
            decay_s: window,
        });

        info!(steps, interval_s, "multi-step calibration scheduled");
        Ok(())
    }

    /// Run every step that is due at `now`
    ///
    /// Returns the running offset after the last executed step, if any ran.
    pub fn poll(
        &mut self,
        now: f64,
        raw_basis: Option<&Pose>,
        displayed: Option<&Pose>,
    ) -> Option<Result<AlignmentOffset, ContractError>> {
        let mut last = None;
        while self.schedule.front().is_some_and(|step| step.due <= now) {
            let Some(step) = self.schedule.pop_front() else {
                break;
            };
            last = Some(self.run_step(step, raw_basis, displayed));
        }

        if self.schedule.is_empty() && self.run.is_some() {
            if let Some(run) = self.run.take() {
                debug!(completed = run.completed, steps = run.steps, "multi-step calibration finished");
            }
        }
        if self.boost.is_some_and(|b| b.is_over(now)) {
            self.boost = None;
        }
        last
    }

    fn run_step(
        &mut self,
        step: ScheduledStep,
        raw_basis: Option<&Pose>,
        displayed: Option<&Pose>,
    ) -> Result<AlignmentOffset, ContractError> {
        let Some(run) = self.run.as_mut() else {
            return Err(ContractError::calibration_schedule("step without an active run"));
        };

        let sample = match offset_for(&run.target, raw_basis, displayed) {
            Ok(offset) => offset,
            Err(e) => {
                warn!(step = step.index, error = %e, "calibration step skipped");
                return Err(e);
            }
        };

        run.completed += 1;
        let n = f64::from(run.completed);
        run.offset_sum += sample.position_offset;
        run.rotation_mean = if run.completed == 1 {
            sample.rotation_offset
        } else {
            slerp(&run.rotation_mean, &sample.rotation_offset, 1.0 / n)
        };

        let mut rotation_offset = run.rotation_mean;
        rotation_offset.renormalize();
        let averaged = AlignmentOffset {
            position_offset: run.offset_sum / n,
            rotation_offset,
        };
        debug!(step = step.index, completed = run.completed, "calibration step applied");
        self.install(averaged);
        Ok(averaged)
    }

    fn install(&mut self, offset: AlignmentOffset) {
        self.offset = offset;
        observability::record_calibration(
            offset.position_offset.norm(),
            offset.rotation_offset.angle().to_degrees(),
        );
    }

    /// Drop pending steps and end the responsiveness boost; the offset stays
    pub fn cancel(&mut self) {
        if !self.schedule.is_empty() {
            debug!(pending = self.schedule.len(), "calibration schedule cancelled");
        }
        self.schedule.clear();
        self.run = None;
        self.boost = None;
    }

    /// Smoother responsiveness boost in [0, 1]
    pub fn boost(&self, now: f64) -> f64 {
        self.boost.map_or(0.0, |b| b.level(now))
    }

    pub fn pending_steps(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_calibrating(&self, now: f64) -> bool {
        !self.schedule.is_empty() || self.boost(now) > 0.0
    }
}

fn offset_for(
    target: &Pose,
    raw_basis: Option<&Pose>,
    displayed: Option<&Pose>,
) -> Result<AlignmentOffset, ContractError> {
    match (raw_basis, displayed) {
        (Some(basis), _) => Ok(AlignmentOffset::between(basis, target)),
        (None, Some(shown)) => {
            warn!("no raw pose yet, calibrating against the displayed pose");
            Ok(AlignmentOffset::between(shown, target))
        }
        (None, None) => Err(ContractError::CalibrationWithoutBasis),
    }
}

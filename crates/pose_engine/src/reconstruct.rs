//! Pose reconstruction: sample delta + reference (head) pose → raw world pose.

use contracts::{Pose, PoseSample, ReconstructionConfig, ReconstructionMode};

use crate::head::HeadHistory;

/// Reconstruct a world pose from a sample and the reference frame's pose
///
/// `InverseDelta` treats the sample as the inverted transform from the
/// reference frame to the object: with `d' = -d` and `q' = q⁻¹`,
/// `rotation = ref.rotation * q'⁻¹` and `position = ref.position - rotation * d'`.
/// The inverted delta is rotated by the resulting world rotation, not the
/// reference rotation.
pub fn reconstruct(mode: ReconstructionMode, sample: &PoseSample, reference: &Pose) -> Pose {
    match mode {
        ReconstructionMode::InverseDelta => {
            let inverted_position = -sample.position;
            let inverted_rotation = sample.orientation.conjugate();
            let rotation = reference.orientation * inverted_rotation.inverse();
            Pose::new(reference.position - rotation * inverted_position, rotation).renormalized()
        }
        ReconstructionMode::ForwardDelta => Pose::new(
            reference.position + reference.orientation * sample.position,
            reference.orientation * sample.orientation,
        )
        .renormalized(),
        ReconstructionMode::Absolute => sample.pose(),
    }
}

/// Reconstructor with head-motion compensation
#[derive(Debug)]
pub struct PoseReconstructor {
    mode: ReconstructionMode,
    head_compensation: bool,
    heads: HeadHistory,
}

impl PoseReconstructor {
    pub fn new(config: &ReconstructionConfig) -> Self {
        Self {
            mode: config.mode,
            head_compensation: config.head_compensation,
            heads: HeadHistory::new(config.head_history_s, config.head_history_max),
        }
    }

    /// Record this tick's head pose
    pub fn record_head(&mut self, now: f64, head: Pose) {
        self.heads.record(now, head);
    }

    /// Reconstruct one sample
    ///
    /// With compensation on and `capture_local_time` known, the sample is
    /// resolved against the head pose at capture time; otherwise against `current_head`.
    pub fn reconstruct(
        &self,
        sample: &PoseSample,
        current_head: &Pose,
        capture_local_time: Option<f64>,
    ) -> Pose {
        let reference = match capture_local_time {
            Some(t) if self.head_compensation => self.heads.pose_at(t).unwrap_or(*current_head),
            _ => *current_head,
        };
        reconstruct(self.mode, sample, &reference)
    }

    pub fn mode(&self) -> ReconstructionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ReconstructionMode) {
        self.mode = mode;
    }

    pub fn head_history_len(&self) -> usize {
        self.heads.len()
    }
}

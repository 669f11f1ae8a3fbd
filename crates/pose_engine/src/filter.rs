//! Outlier & jitter filter.
//!
//! Two stages:
//! - `check_hard_reject` runs per reconstructed sample, before it enters history
//! - `guard` runs per tick on the aligned candidate: deadzone first, then the spike guard

use contracts::{FilterAction, FilterConfig, Pose};
use tracing::debug;

use crate::error::SampleRejection;

#[derive(Debug, Clone)]
pub struct OutlierFilter {
    config: FilterConfig,
    last_accepted_raw: Option<Pose>,
    consecutive_rejects: u32,
}

impl OutlierFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            config: config.clone(),
            last_accepted_raw: None,
            consecutive_rejects: 0,
        }
    }

    /// Reject a raw reconstructed pose that jumps past the hard limit
    /// relative to the last accepted one.
    ///
    /// After `hard_reject_recovery` consecutive rejections the filter
    /// re-anchors on the next pose, so a genuine relocation is eventually followed.
    pub fn check_hard_reject(&mut self, raw: &Pose) -> Result<(), SampleRejection> {
        let Some(last) = self.last_accepted_raw else {
            self.accept(raw);
            return Ok(());
        };

        let distance_m = last.distance_to(raw);
        let angle_deg = last.angle_to_deg(raw);
        let exceeds = distance_m > self.config.hard_reject_m || angle_deg > self.config.hard_reject_deg;

        if !exceeds {
            self.accept(raw);
            return Ok(());
        }

        let recovery = self.config.hard_reject_recovery;
        if recovery > 0 && self.consecutive_rejects >= recovery {
            debug!(
                distance_m,
                angle_deg,
                rejected = self.consecutive_rejects,
                "re-anchoring after repeated hard rejects"
            );
            self.accept(raw);
            return Ok(());
        }

        self.consecutive_rejects += 1;
        Err(SampleRejection::HardOutlier {
            distance_m,
            angle_deg,
        })
    }

    fn accept(&mut self, raw: &Pose) {
        self.last_accepted_raw = Some(*raw);
        self.consecutive_rejects = 0;
    }

    /// Deadzone then spike guard, against the last smoothed pose.
    ///
    /// Inert until a smoothed pose exists.
    pub fn guard(&self, candidate: &Pose, last_smoothed: Option<&Pose>) -> (Pose, FilterAction) {
        let Some(last) = last_smoothed else {
            return (*candidate, FilterAction::Passed);
        };

        let distance_m = last.distance_to(candidate);
        let angle_deg = last.angle_to_deg(candidate);

        if distance_m < self.config.deadzone_m && angle_deg < self.config.deadzone_deg {
            return (*last, FilterAction::Deadzoned);
        }

        if distance_m > self.config.spike_m || angle_deg > self.config.spike_deg {
            let softened = last.interpolate(candidate, self.config.spike_blend).renormalized();
            return (softened, FilterAction::SpikeSoftened);
        }

        (*candidate, FilterAction::Passed)
    }

    pub fn last_accepted_raw(&self) -> Option<&Pose> {
        self.last_accepted_raw.as_ref()
    }

    pub fn consecutive_rejects(&self) -> u32 {
        self.consecutive_rejects
    }

    pub fn reset(&mut self) {
        self.last_accepted_raw = None;
        self.consecutive_rejects = 0;
    }
}

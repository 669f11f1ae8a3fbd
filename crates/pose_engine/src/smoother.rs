//! Adaptive smoother.
//!
//! Blends each filtered target into the previously applied pose. The first
//! pose snaps; after that the blend factor comes from the configured mode.

use contracts::{Pose, SmoothingConfig, SmoothingMode};

const FACTOR_STEP: f64 = 0.05;
const LINEAR_FAST_FLOOR: f64 = 0.85;
const MIN_DT: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SmootherState {
    Uninitialized,
    Initialized { pose: Pose, last_time: f64 },
}

/// Result of one smoothing step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothStep {
    pub pose: Pose,
    /// Blend factor used; `None` when the pose snapped
    pub factor: Option<f64>,
    /// Distance moved from the previous applied pose
    pub step_m: f64,
}

#[derive(Debug, Clone)]
pub struct AdaptiveSmoother {
    config: SmoothingConfig,
    state: SmootherState,
    boost: f64,
}

impl AdaptiveSmoother {
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            config: config.clone(),
            state: SmootherState::Uninitialized,
            boost: 0.0,
        }
    }

    /// Blend `target` into the applied pose at local time `now`
    pub fn smooth(&mut self, now: f64, target: &Pose, confidence: Option<f64>) -> SmoothStep {
        let SmootherState::Initialized { pose: last, last_time } = self.state else {
            self.state = SmootherState::Initialized {
                pose: *target,
                last_time: now,
            };
            return SmoothStep {
                pose: *target,
                factor: None,
                step_m: 0.0,
            };
        };

        if *target == last {
            self.state = SmootherState::Initialized {
                pose: last,
                last_time: now,
            };
            return SmoothStep {
                pose: last,
                factor: Some(0.0),
                step_m: 0.0,
            };
        }

        let dt = (now - last_time).max(MIN_DT);
        let factor = self.boosted(self.base_blend(&last, target, dt, confidence));
        let pose = last.interpolate(target, factor).renormalized();

        self.state = SmootherState::Initialized {
            pose,
            last_time: now,
        };
        SmoothStep {
            pose,
            factor: Some(factor),
            step_m: last.distance_to(&pose),
        }
    }

    fn base_blend(&self, last: &Pose, target: &Pose, dt: f64, confidence: Option<f64>) -> f64 {
        let c = &self.config;
        let distance = last.distance_to(target);
        let angle = last.angle_to_deg(target);

        match c.mode {
            SmoothingMode::Adaptive => {
                let pos_band = band(distance / dt, c.speed_pos_low, c.speed_pos_high);
                let rot_band = band(angle / dt, c.speed_rot_low, c.speed_rot_high);
                let motion = pos_band.max(rot_band);

                let adaptive = lerp(c.max_smoothing, c.min_smoothing, motion);
                let mut factor = lerp(adaptive, c.base_factor, c.base_weight);
                if let Some(conf) = confidence {
                    factor *= lerp(c.min_confidence_scale, 1.0, conf.clamp(0.0, 1.0));
                }
                factor.clamp(0.0, 1.0)
            }
            SmoothingMode::Exponential => {
                let sharpness = if self.far(distance, angle) {
                    c.fast_sharpness
                } else {
                    c.normal_sharpness
                };
                1.0 - (-sharpness.max(0.0) * dt).exp()
            }
            SmoothingMode::Linear => {
                let f = c.base_factor;
                if self.far(distance, angle) {
                    f.max(LINEAR_FAST_FLOOR).clamp(0.0, 1.0)
                } else {
                    f.clamp(0.0, 1.0)
                }
            }
        }
    }

    fn far(&self, distance: f64, angle: f64) -> bool {
        distance > self.config.snap_distance_m || angle > self.config.snap_angle_deg
    }

    fn boosted(&self, factor: f64) -> f64 {
        lerp(factor, 1.0, self.boost)
    }

    /// Extra responsiveness in [0, 1] pulling the factor toward 1
    pub fn set_boost(&mut self, boost: f64) {
        self.boost = boost.clamp(0.0, 1.0);
    }

    pub fn boost(&self) -> f64 {
        self.boost
    }

    pub fn set_base_factor(&mut self, factor: f64) {
        self.config.base_factor = factor.clamp(0.0, 1.0);
    }

    /// Step the base factor by ±0.05 per notch
    pub fn adjust_base_factor(&mut self, notches: i32) -> f64 {
        self.set_base_factor(self.config.base_factor + f64::from(notches) * FACTOR_STEP);
        self.config.base_factor
    }

    pub fn base_factor(&self) -> f64 {
        self.config.base_factor
    }

    pub fn mode(&self) -> SmoothingMode {
        self.config.mode
    }

    pub fn last(&self) -> Option<&Pose> {
        match &self.state {
            SmootherState::Initialized { pose, .. } => Some(pose),
            SmootherState::Uninitialized => None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SmootherState::Initialized { .. })
    }

    pub fn reset(&mut self) {
        self.state = SmootherState::Uninitialized;
        self.boost = 0.0;
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Map `value` from `[low, high]` to `[0, 1]`
#[inline]
fn band(value: f64, low: f64, high: f64) -> f64 {
    if high <= low {
        return if value >= high { 1.0 } else { 0.0 };
    }
    ((value - low) / (high - low)).clamp(0.0, 1.0)
}

//! Pose - position + orientation in world space

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid pose: position (meters) and unit orientation.
///
/// Used for reconstructed object poses as well as the head pose read from the
/// rendering frame once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position (meters)
    pub position: Vector3<f64>,

    /// World orientation
    pub orientation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create a pose from its parts
    #[inline]
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Origin with no rotation
    #[inline]
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    /// Pose at `position` with no rotation
    #[inline]
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// Lerp position, slerp orientation.
    ///
    /// `t` is not clamped; callers clamp when they need to stay inside the pair.
    pub fn interpolate(&self, other: &Pose, t: f64) -> Pose {
        Pose {
            position: self.position.lerp(&other.position, t),
            orientation: slerp(&self.orientation, &other.orientation, t),
        }
    }

    /// Euclidean distance between positions (meters)
    #[inline]
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.position - self.position).norm()
    }

    /// Angle between orientations (degrees, 0..=180)
    #[inline]
    pub fn angle_to_deg(&self, other: &Pose) -> f64 {
        self.orientation.angle_to(&other.orientation).to_degrees()
    }

    /// Every component finite
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
    }

    /// Re-normalize the orientation after composition
    #[inline]
    pub fn renormalized(mut self) -> Self {
        self.orientation.renormalize();
        self
    }
}

/// Shortest-path slerp that never panics on degenerate pairs.
pub fn slerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    a.try_slerp(b, t, 1.0e-9).unwrap_or_else(|| a.nlerp(b, t))
}

/// A pose stamped with the time it was observed.
///
/// The time domain depends on the owner: sender seconds for sample history,
/// render seconds for head-pose history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPose {
    /// Observation time (seconds)
    pub time: f64,

    /// Observed pose
    pub pose: Pose,
}

impl TimedPose {
    #[inline]
    pub fn new(time: f64, pose: Pose) -> Self {
        Self { time, pose }
    }
}

//! AlignmentOffset - correction layered on top of raw reconstruction

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::Pose;

/// Offset composed onto reconstructed poses.
///
/// `final.position = raw.position + position_offset`
/// `final.orientation = rotation_offset * raw.orientation`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOffset {
    pub position_offset: Vector3<f64>,
    pub rotation_offset: UnitQuaternion<f64>,
}

impl Default for AlignmentOffset {
    fn default() -> Self {
        Self::identity()
    }
}

impl AlignmentOffset {
    pub fn identity() -> Self {
        Self {
            position_offset: Vector3::zeros(),
            rotation_offset: UnitQuaternion::identity(),
        }
    }

    /// Offset that maps `basis` exactly onto `target`
    pub fn between(basis: &Pose, target: &Pose) -> Self {
        let mut rotation_offset = target.orientation * basis.orientation.inverse();
        rotation_offset.renormalize();
        Self {
            position_offset: target.position - basis.position,
            rotation_offset,
        }
    }

    /// Apply to a raw reconstructed pose
    #[inline]
    pub fn apply(&self, raw: &Pose) -> Pose {
        Pose::new(
            raw.position + self.position_offset,
            self.rotation_offset * raw.orientation,
        )
        .renormalized()
    }

    pub fn is_identity(&self) -> bool {
        self.position_offset == Vector3::zeros() && self.rotation_offset.angle() == 0.0
    }
}

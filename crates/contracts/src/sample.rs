//! PoseSample - Ingestion output
//!
//! One tracking observation after decoding and validation.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Pose;

/// Timestamps above this value are treated as milliseconds
pub const MILLISECOND_EPOCH_THRESHOLD: f64 = 1e12;

/// Smallest quaternion norm accepted before normalization
const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Normalize a sender timestamp to seconds.
///
/// Applied uniformly at ingestion: epoch milliseconds become seconds, anything
/// else is already seconds.
#[inline]
pub fn normalize_source_time(value: f64) -> f64 {
    if value > MILLISECOND_EPOCH_THRESHOLD {
        value / 1000.0
    } else {
        value
    }
}

/// Why a decoded record cannot become a `PoseSample`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SampleDefect {
    #[error("source time is not finite")]
    NonFiniteTime,
    #[error("position has a non-finite component")]
    NonFinitePosition,
    #[error("orientation has a non-finite component")]
    NonFiniteOrientation,
    #[error("orientation has zero norm")]
    ZeroNormOrientation,
}

/// Tracking observation
///
/// `position`/`orientation` are a delta or an absolute pose depending on the
/// active reconstruction mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    /// Sender-domain timestamp (seconds)
    pub source_time: f64,

    /// Sender-assigned sequence number (not guaranteed gapless)
    pub sequence_id: u64,

    /// Position component (meters)
    pub position: Vector3<f64>,

    /// Orientation component (always unit length)
    pub orientation: UnitQuaternion<f64>,

    /// Tracker confidence in [0, 1], `None` when unknown
    pub confidence: Option<f64>,
}

impl PoseSample {
    /// Build a validated sample from raw wire components.
    ///
    /// `orientation_xyzw` uses the common `[x, y, z, w]` wire order. The
    /// timestamp is normalized to seconds; negative or non-finite confidence
    /// means "unknown".
    pub fn from_components(
        source_time: f64,
        sequence_id: u64,
        position: [f64; 3],
        orientation_xyzw: [f64; 4],
        confidence: Option<f64>,
    ) -> Result<Self, SampleDefect> {
        if !source_time.is_finite() {
            return Err(SampleDefect::NonFiniteTime);
        }
        if position.iter().any(|v| !v.is_finite()) {
            return Err(SampleDefect::NonFinitePosition);
        }
        if orientation_xyzw.iter().any(|v| !v.is_finite()) {
            return Err(SampleDefect::NonFiniteOrientation);
        }

        let [x, y, z, w] = orientation_xyzw;
        let raw = Quaternion::new(w, x, y, z);
        if raw.norm() < MIN_QUATERNION_NORM {
            return Err(SampleDefect::ZeroNormOrientation);
        }

        Ok(Self {
            source_time: normalize_source_time(source_time),
            sequence_id,
            position: Vector3::new(position[0], position[1], position[2]),
            orientation: UnitQuaternion::from_quaternion(raw),
            confidence: confidence
                .filter(|c| c.is_finite() && *c >= 0.0)
                .map(|c| c.min(1.0)),
        })
    }

    /// Position/orientation as a pose
    #[inline]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_millis() {
        assert_eq!(normalize_source_time(1_700_000_000_123.0), 1_700_000_000.123);
        assert_eq!(normalize_source_time(12.5), 12.5);
    }

    #[test]
    fn test_zero_norm_rejected() {
        let result = PoseSample::from_components(1.0, 1, [0.0; 3], [0.0; 4], None);
        assert_eq!(result.unwrap_err(), SampleDefect::ZeroNormOrientation);
    }

    #[test]
    fn test_non_finite_rejected() {
        let result =
            PoseSample::from_components(1.0, 1, [f64::NAN, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0], None);
        assert_eq!(result.unwrap_err(), SampleDefect::NonFinitePosition);

        let result =
            PoseSample::from_components(f64::INFINITY, 1, [0.0; 3], [0.0, 0.0, 0.0, 1.0], None);
        assert_eq!(result.unwrap_err(), SampleDefect::NonFiniteTime);
    }

    #[test]
    fn test_orientation_is_normalized() {
        let sample =
            PoseSample::from_components(1.0, 7, [0.0; 3], [0.0, 0.0, 0.0, 2.0], Some(-1.0))
                .unwrap();
        assert!((sample.orientation.norm() - 1.0).abs() < 1e-12);
        assert_eq!(sample.confidence, None);
    }

    #[test]
    fn test_confidence_clamped() {
        let sample =
            PoseSample::from_components(1.0, 7, [0.0; 3], [0.0, 0.0, 0.0, 1.0], Some(1.4))
                .unwrap();
        assert_eq!(sample.confidence, Some(1.0));
    }
}

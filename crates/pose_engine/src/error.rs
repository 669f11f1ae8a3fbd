//! Per-sample rejection reasons.
//!
//! Rejections are values: the tick logs and counts them and moves on.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleRejection {
    #[error("sample at {source_time:.6}s is older than the acceptance window (newest {newest:.6}s)")]
    Stale { source_time: f64, newest: f64 },

    #[error("duplicate sample {sequence_id} at {source_time:.6}s")]
    Duplicate { sequence_id: u64, source_time: f64 },

    #[error("pose jumped {distance_m:.3} m / {angle_deg:.1}° past the hard limit")]
    HardOutlier { distance_m: f64, angle_deg: f64 },

    #[error("reconstructed pose is not finite")]
    Malformed,
}

impl SampleRejection {
    /// Metric label
    pub fn reason(&self) -> &'static str {
        match self {
            SampleRejection::Stale { .. } => "stale",
            SampleRejection::Duplicate { .. } => "duplicate",
            SampleRejection::HardOutlier { .. } => "hard_outlier",
            SampleRejection::Malformed => "malformed",
        }
    }
}

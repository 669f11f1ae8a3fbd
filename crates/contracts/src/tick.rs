//! TickMeta - per-tick diagnostics produced by the pose engine

use serde::{Deserialize, Serialize};

use crate::ResamplingMode;

/// Whether a tick applied a pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// A pose was produced for the sink
    Applied,
    /// Nothing has been received yet; nothing applied
    Inert,
}

impl TickOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TickOutcome::Applied => "applied",
            TickOutcome::Inert => "inert",
        }
    }
}

/// What the resampler did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleKind {
    /// Most recent sample used directly
    Latest,
    /// Interpolated inside a bracket
    Interpolated,
    /// Interpolated, then extrapolated by the lead time
    Predicted,
}

/// What the outlier & jitter filter did to the candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    /// Candidate passed unchanged
    #[default]
    Passed,
    /// Snapped to the last smoothed pose
    Deadzoned,
    /// Jump softened to a fraction
    SpikeSoftened,
}

/// Tick diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMeta {
    /// Render-clock time of the tick (seconds)
    pub now: f64,

    /// Active resampling strategy
    pub mode: ResamplingMode,

    pub outcome: TickOutcome,

    /// Resampler result, `None` when inert
    pub resample: Option<ResampleKind>,

    pub filter_action: FilterAction,

    /// Samples accepted into history this tick
    pub accepted: u32,

    /// Samples rejected this tick (stale, duplicate, outlier)
    pub rejected: u32,

    pub history_len: usize,

    /// Render delay used for the query (ms)
    pub render_delay_ms: f64,

    pub delay_ema_ms: Option<f64>,
    pub jitter_ema_ms: Option<f64>,

    /// `local = sender + offset`
    pub clock_offset_s: Option<f64>,

    /// Final blend factor applied by the smoother
    pub blend_factor: Option<f64>,

    /// Distance moved by the applied pose since the last tick (meters)
    pub applied_step_m: Option<f64>,

    /// A multi-step calibration is in progress
    pub calibrating: bool,
}

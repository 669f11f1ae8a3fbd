//! Relay configuration contracts shared across crates.
//!
//! Every section falls back to its defaults, so a config file only needs the
//! keys it wants to change.

use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Transport settings
    pub network: NetworkConfig,

    /// Receiver → consumer queue
    pub queue: QueueConfig,

    /// Sample history retention
    pub history: HistoryConfig,

    /// Clock synchronizer
    pub clock: ClockConfig,

    /// Adaptive render-delay window
    pub window: WindowConfig,

    /// Temporal resampling
    pub resampling: ResamplingConfig,

    /// Delta → world reconstruction
    pub reconstruction: ReconstructionConfig,

    /// Deadzone / spike guard / hard reject
    pub filter: FilterConfig,

    /// Smoothing of the applied pose
    pub smoothing: SmoothingConfig,

    /// Alignment calibration defaults
    pub calibration: CalibrationConfig,
}

/// Wire encoding of incoming datagrams
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Self-describing JSON record
    #[default]
    Json,
    /// Fixed-layout bincode record
    Bincode,
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local bind address
    pub bind_addr: String,
    /// Datagram encoding
    pub format: WireFormat,
    /// Receive buffer size (UDP typically 65507 for IPv4)
    pub max_datagram_bytes: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:12345".to_string(),
            format: WireFormat::Json,
            max_datagram_bytes: 65507,
        }
    }
}

/// Sample queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Capacity; the oldest entry is dropped when full
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 40 }
    }
}

/// Sample history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Keep samples this far behind the newest one (seconds, floor 0.05)
    pub retention_s: f64,
    /// Hard cap on entries
    pub max_count: usize,
    /// Below this size `find_closest` scans linearly
    pub linear_scan_threshold: usize,
    /// Samples older than `newest - max_sample_age_s` are stale
    pub max_sample_age_s: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_s: 0.5,
            max_count: 256,
            linear_scan_threshold: 64,
            max_sample_age_s: 1.0,
        }
    }
}

/// How the sender→render offset evolves after the first estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetRefinement {
    /// Hold the first estimate for the session
    #[default]
    Fixed,
    /// Track slow drift with a 2-state Kalman filter
    Kalman,
}

/// Clock synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// EMA factor for one-way delay
    pub delay_alpha: f64,
    /// EMA factor for delay jitter
    pub jitter_alpha: f64,
    /// Offset refinement strategy
    pub refinement: OffsetRefinement,
    /// Kalman process noise (Q)
    pub process_noise: f64,
    /// Kalman measurement noise (R)
    pub measurement_noise: f64,
    /// Residual window for adaptive R
    pub residual_window: usize,
    /// Nominal one-way transit (ms) assumed for the fastest delivery
    pub transit_estimate_ms: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            delay_alpha: 0.15,
            jitter_alpha: 0.15,
            refinement: OffsetRefinement::Fixed,
            process_noise: 1e-6,
            measurement_noise: 1e-4,
            residual_window: 20,
            transit_estimate_ms: 20.0,
        }
    }
}

/// Adaptive render-delay window
///
/// `window_ms = clamp(scale * (delay_ema + jitter_ema) + safety_ms, min_ms, max_ms)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Use the adaptive window instead of the fixed render delay
    pub adaptive: bool,
    pub scale: f64,
    pub safety_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            scale: 1.0,
            safety_ms: 10.0,
            min_ms: 20.0,
            max_ms: 150.0,
        }
    }
}

/// Resampling strategy selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingMode {
    /// Latest sample as-is
    None,
    /// Interpolate between the two newest samples
    TimestampCompare,
    /// Interpolate inside the history at the synchronized query time
    BufferInterpolation,
    /// Buffer interpolation plus short-horizon prediction
    #[default]
    Hybrid,
}

impl ResamplingMode {
    pub const ALL: [ResamplingMode; 4] = [
        ResamplingMode::None,
        ResamplingMode::TimestampCompare,
        ResamplingMode::BufferInterpolation,
        ResamplingMode::Hybrid,
    ];

    /// Next mode in cycling order (wraps)
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Mode by index, clamped to the valid range
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResamplingMode::None => "none",
            ResamplingMode::TimestampCompare => "timestamp_compare",
            ResamplingMode::BufferInterpolation => "buffer_interpolation",
            ResamplingMode::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for ResamplingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporal resampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplingConfig {
    /// Initial strategy
    pub mode: ResamplingMode,
    /// Fixed render-delay budget (used when the adaptive window is off)
    pub render_delay_ms: f64,
    /// Prediction lead for hybrid mode
    pub lead_ms: f64,
    /// Floor for the velocity time base
    pub min_delta_s: f64,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            mode: ResamplingMode::Hybrid,
            render_delay_ms: 30.0,
            lead_ms: 18.0,
            min_delta_s: 0.005,
        }
    }
}

/// What a sample's position/orientation mean
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionMode {
    /// Inverted object-from-reference transform
    #[default]
    InverseDelta,
    /// Object expressed in the reference frame
    ForwardDelta,
    /// Already a world pose
    Absolute,
}

/// Pose reconstructor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub mode: ReconstructionMode,
    /// Reconstruct against the head pose at the sample's time
    pub head_compensation: bool,
    /// Head history retention (seconds, floor 0.2)
    pub head_history_s: f64,
    /// Head history cap
    pub head_history_max: usize,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            mode: ReconstructionMode::InverseDelta,
            head_compensation: true,
            head_history_s: 0.6,
            head_history_max: 300,
        }
    }
}

/// Outlier & jitter filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub deadzone_m: f64,
    pub deadzone_deg: f64,
    pub spike_m: f64,
    pub spike_deg: f64,
    /// Fraction of a spike applied per tick
    pub spike_blend: f64,
    pub hard_reject_m: f64,
    pub hard_reject_deg: f64,
    /// Consecutive hard rejects after which the next sample re-anchors
    pub hard_reject_recovery: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            deadzone_m: 0.0005,
            deadzone_deg: 0.05,
            spike_m: 0.08,
            spike_deg: 30.0,
            spike_blend: 0.15,
            hard_reject_m: 0.12,
            hard_reject_deg: 60.0,
            hard_reject_recovery: 5,
        }
    }
}

/// Smoother variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Speed/confidence adaptive blend factor
    #[default]
    Adaptive,
    /// Frame-rate independent `1 - exp(-sharpness * dt)`
    Exponential,
    /// Fixed per-tick factor
    Linear,
}

/// Adaptive smoother configuration
///
/// Factors are blend amounts toward the target per tick: 0 freezes, 1 snaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub mode: SmoothingMode,
    /// User-tunable factor
    pub base_factor: f64,
    /// Weight of `base_factor` against the adaptive factor
    pub base_weight: f64,
    /// Blend factor used for slow motion (most smoothing)
    pub max_smoothing: f64,
    /// Blend factor used for fast motion (most responsive)
    pub min_smoothing: f64,
    pub speed_pos_low: f64,
    pub speed_pos_high: f64,
    pub speed_rot_low: f64,
    pub speed_rot_high: f64,
    /// Multiplier applied at zero confidence
    pub min_confidence_scale: f64,
    pub normal_sharpness: f64,
    pub fast_sharpness: f64,
    pub snap_distance_m: f64,
    pub snap_angle_deg: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            mode: SmoothingMode::Adaptive,
            base_factor: 0.5,
            base_weight: 0.5,
            max_smoothing: 0.15,
            min_smoothing: 0.85,
            speed_pos_low: 0.02,
            speed_pos_high: 0.5,
            speed_rot_low: 5.0,
            speed_rot_high: 90.0,
            min_confidence_scale: 0.3,
            normal_sharpness: 10.0,
            fast_sharpness: 25.0,
            snap_distance_m: 0.02,
            snap_angle_deg: 1.5,
        }
    }
}

/// Calibration defaults for the multi-step variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub default_interval_s: f64,
    pub default_steps: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_interval_s: 0.2,
            default_steps: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_cycle_wraps() {
        assert_eq!(ResamplingMode::None.next(), ResamplingMode::TimestampCompare);
        assert_eq!(ResamplingMode::Hybrid.next(), ResamplingMode::None);
        assert_eq!(ResamplingMode::from_index(99), ResamplingMode::Hybrid);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RelayConfig =
            serde_json::from_str(r#"{ "queue": { "capacity": 8 } }"#).unwrap();
        assert_eq!(config.queue.capacity, 8);
        assert_eq!(config.history.max_count, 256);
        assert_eq!(config.resampling.mode, ResamplingMode::Hybrid);
    }

    #[test]
    fn test_enum_snake_case() {
        let mode: ResamplingMode = serde_json::from_str(r#""buffer_interpolation""#).unwrap();
        assert_eq!(mode, ResamplingMode::BufferInterpolation);
    }
}

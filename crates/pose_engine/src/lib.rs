//! # Pose Engine
//!
//! Consumer side of the relay: turns queued pose samples into one applied
//! pose per render tick.
//!
//! Per tick:
//! - record the head pose
//! - reconstruct, screen and buffer each incoming sample
//! - resample the history at the render-delayed query time
//! - apply the alignment offset, filter, smooth
//!
//! ## Example
//!
//! ```ignore
//! use pose_engine::PoseEngine;
//!
//! let mut engine = PoseEngine::new(&config);
//! let output = engine.tick_from_queue(now, &head_pose, &receiver);
//! if let Some(pose) = output.pose {
//!     sink.apply_pose(&pose);
//! }
//! ```

mod adakf;
mod calibrate;
mod clock;
mod engine;
mod error;
mod filter;
mod head;
mod history;
mod reconstruct;
mod resample;
mod smoother;
mod window;

pub use calibrate::AlignmentCalibrator;
pub use clock::ClockSynchronizer;
pub use engine::{EngineStats, PoseEngine, TickOutput};
pub use error::SampleRejection;
pub use filter::OutlierFilter;
pub use head::HeadHistory;
pub use history::{SampleEntry, SampleHistory, TimedHistory, Timestamped};
pub use reconstruct::{reconstruct, PoseReconstructor};
pub use resample::{
    interpolation_parameter, predict, strategy_for, BufferInterpolation, Hybrid, LatestSample,
    ResampleContext, Resampled, ResamplingStrategy, TimestampCompare,
};
pub use smoother::{AdaptiveSmoother, SmoothStep};
pub use window::compute_window_ms;

pub use contracts::{RelayConfig, ResamplingMode};

//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the pose relay.
//! Business crates depend on this crate only, never on each other in reverse.
//!
//! ## Time Model
//! - Sender clock: `PoseSample::source_time`, seconds (normalized at ingestion)
//! - Render clock: monotonic seconds supplied by the consumer on every tick
//! - The two domains are reconciled by the clock synchronizer in `pose_engine`

mod alignment;
mod error;
mod pose;
mod relay_config;
mod sample;
mod seams;
mod tick;

pub use alignment::AlignmentOffset;
pub use error::*;
pub use pose::{slerp, Pose, TimedPose};
pub use relay_config::*;
pub use sample::{normalize_source_time, PoseSample, SampleDefect, MILLISECOND_EPOCH_THRESHOLD};
pub use seams::{DatagramSource, HeadPoseSource, LocalDatagramSource, PoseSink};
pub use tick::{FilterAction, ResampleKind, TickMeta, TickOutcome};

pub use nalgebra::{UnitQuaternion, Vector3};

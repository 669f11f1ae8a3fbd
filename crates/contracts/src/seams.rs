//! External collaborator seams
//!
//! - `DatagramSource`: where raw wire records come from (UDP in production)
//! - `HeadPoseSource`: the rendering frame's current head/marker transform
//! - `PoseSink`: where the final smoothed pose is applied

use crate::Pose;

/// Datagram input trait
///
/// Implementations block (asynchronously) until one datagram arrives.
/// Cancellation is cooperative: the receive loop races this future against a
/// shutdown signal and drops it, which releases the socket cleanly.
#[trait_variant::make(DatagramSource: Send)]
pub trait LocalDatagramSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Receive one datagram into `buf`, returning its length
    ///
    /// # Errors
    /// Transport errors; the caller logs them and keeps receiving.
    async fn recv_datagram(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Head pose oracle, read once per consumer tick
pub trait HeadPoseSource {
    fn current_head_pose(&mut self) -> Pose;
}

/// Apply-to-object output
///
/// Called once per tick with the filtered, smoothed pose.
pub trait PoseSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    fn apply_pose(&mut self, pose: &Pose);
}

//! Synthetic pose emitter
//!
//! Plays the sender role for demos, benches and end-to-end tests: generates a
//! scripted trajectory, adds optional noise, and sends wire records over UDP.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{PoseSample, UnitQuaternion, Vector3, WireFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use crate::wire::encode_sample;

/// Scripted motion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trajectory {
    /// Fixed pose
    Static,
    /// Constant velocity from the origin (m/s)
    Linear { velocity: [f64; 3] },
    /// Circle in the XZ plane, facing the direction of travel
    Circle { radius: f64, period_s: f64 },
}

impl Trajectory {
    /// Noise-free pose at `t` seconds after start
    pub fn pose_at(&self, t: f64) -> (Vector3<f64>, UnitQuaternion<f64>) {
        match *self {
            Trajectory::Static => (Vector3::zeros(), UnitQuaternion::identity()),
            Trajectory::Linear { velocity } => (
                Vector3::new(velocity[0], velocity[1], velocity[2]) * t,
                UnitQuaternion::identity(),
            ),
            Trajectory::Circle { radius, period_s } => {
                let phase = std::f64::consts::TAU * t / period_s.max(1e-3);
                (
                    Vector3::new(radius * phase.cos(), 0.0, radius * phase.sin()),
                    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -phase),
                )
            }
        }
    }
}

/// Emitter configuration
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    pub target: SocketAddr,
    pub rate_hz: f64,
    pub format: WireFormat,
    pub trajectory: Trajectory,
    /// Uniform position noise amplitude (meters)
    pub position_noise_m: f64,
    /// Uniform rotation noise amplitude (degrees)
    pub rotation_noise_deg: f64,
    /// Send epoch milliseconds instead of seconds since start
    pub epoch_millis: bool,
    /// Stop after this many samples
    pub max_samples: Option<u64>,
    pub confidence: Option<f64>,
    pub seed: u64,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            target: SocketAddr::from(([127, 0, 0, 1], 12345)),
            rate_hz: 60.0,
            format: WireFormat::Json,
            trajectory: Trajectory::Circle {
                radius: 0.3,
                period_s: 4.0,
            },
            position_noise_m: 0.0,
            rotation_noise_deg: 0.0,
            epoch_millis: false,
            max_samples: None,
            confidence: None,
            seed: 7,
        }
    }
}

/// Running emitter
pub struct PoseEmitter {
    running: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl PoseEmitter {
    /// Start sending in a background task
    #[instrument(name = "pose_emitter_start", skip(config), fields(target = %config.target))]
    pub async fn start(config: EmitterConfig) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(config.target).await?;

        let running = Arc::new(AtomicBool::new(true));
        let sent = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(emit_loop(socket, config, running.clone(), sent.clone()));

        Ok(Self {
            running,
            sent,
            task,
        })
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && !self.task.is_finished()
    }

    /// Wait for a bounded run (`max_samples`) to finish
    pub async fn join(self) -> u64 {
        if let Err(e) = self.task.await {
            error!(error = ?e, "emitter task panicked");
        }
        self.sent.load(Ordering::Relaxed)
    }

    pub async fn stop(self) -> u64 {
        self.running.store(false, Ordering::SeqCst);
        self.join().await
    }
}

async fn emit_loop(
    socket: UdpSocket,
    config: EmitterConfig,
    running: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
) {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / config.rate_hz.max(1e-3)));
    let start = Instant::now();
    let epoch_start = chrono::Utc::now().timestamp_millis() as f64;
    let mut sequence_id: u64 = 0;

    debug!(rate_hz = config.rate_hz, trajectory = ?config.trajectory, "emitter started");

    while running.load(Ordering::Relaxed) {
        if config.max_samples.is_some_and(|max| sequence_id >= max) {
            break;
        }
        ticker.tick().await;

        let t = start.elapsed().as_secs_f64();
        let (position, orientation) = config.trajectory.pose_at(t);
        let (position, orientation) = add_noise(&mut rng, &config, position, orientation);
        let q = orientation.into_inner().coords;
        let source_time = if config.epoch_millis {
            epoch_start + t * 1000.0
        } else {
            t
        };

        let sample = match PoseSample::from_components(
            source_time,
            sequence_id,
            [position.x, position.y, position.z],
            [q[0], q[1], q[2], q[3]],
            config.confidence,
        ) {
            Ok(sample) => sample,
            Err(e) => {
                error!(error = %e, "generated an invalid sample");
                break;
            }
        };

        match encode_sample(&sample, config.format) {
            Ok(bytes) => match socket.send(&bytes).await {
                Ok(len) => {
                    sent.fetch_add(1, Ordering::Relaxed);
                    trace!(sequence_id, bytes = len, "sample sent");
                }
                Err(e) => error!(error = %e, "UDP send failed"),
            },
            Err(e) => error!(error = %e, "encode failed"),
        }
        sequence_id += 1;
    }

    running.store(false, Ordering::SeqCst);
    debug!(sent = sent.load(Ordering::Relaxed), "emitter stopped");
}

fn add_noise(
    rng: &mut StdRng,
    config: &EmitterConfig,
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
) -> (Vector3<f64>, UnitQuaternion<f64>) {
    let mut position = position;
    if config.position_noise_m > 0.0 {
        let a = config.position_noise_m;
        position += Vector3::new(
            rng.random_range(-a..a),
            rng.random_range(-a..a),
            rng.random_range(-a..a),
        );
    }

    let mut orientation = orientation;
    if config.rotation_noise_deg > 0.0 {
        let a = config.rotation_noise_deg.to_radians();
        let jitter = UnitQuaternion::from_euler_angles(
            rng.random_range(-a..a),
            rng.random_range(-a..a),
            rng.random_range(-a..a),
        );
        orientation = jitter * orientation;
    }
    (position, orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::decode_datagram;

    #[test]
    fn test_linear_trajectory() {
        let traj = Trajectory::Linear {
            velocity: [0.0, 0.0, 2.0],
        };
        let (p, q) = traj.pose_at(0.25);
        assert!((p.z - 0.5).abs() < 1e-12);
        assert_eq!(q.angle(), 0.0);
    }

    #[test]
    fn test_circle_stays_on_radius() {
        let traj = Trajectory::Circle {
            radius: 0.3,
            period_s: 2.0,
        };
        for i in 0..10 {
            let (p, _) = traj.pose_at(i as f64 * 0.17);
            assert!((p.norm() - 0.3).abs() < 1e-12);
        }
    }

    #[tokio::test]
    async fn test_emitter_sends_bounded_run() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let emitter = PoseEmitter::start(EmitterConfig {
            target: listener.local_addr().unwrap(),
            rate_hz: 200.0,
            max_samples: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();

        let mut buf = vec![0u8; 2048];
        let mut seqs = Vec::new();
        for _ in 0..3 {
            let len = tokio::time::timeout(Duration::from_secs(2), listener.recv(&mut buf))
                .await
                .unwrap()
                .unwrap();
            let sample = decode_datagram(&buf[..len], WireFormat::Json).unwrap();
            seqs.push(sample.sequence_id);
        }

        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(emitter.join().await, 3);
    }
}

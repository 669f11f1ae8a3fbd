//! Relay orchestrator - wires receiver, queue, engine and sink together.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{HeadPoseSource, Pose, PoseSink, RelayConfig, UnitQuaternion, Vector3};
use ingestion::{sample_queue, IngestionMetrics, PoseReceiver, ReceiverConfig, UdpDatagramSource};
use pose_engine::PoseEngine;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use super::controls::{spawn_stdin_controls, Control};
use super::RelayStats;
use crate::cli::HeadArg;

const EYE_HEIGHT_M: f64 = 1.6;
const SWAY_AMPLITUDE_RAD: f64 = 0.2;
const SWAY_HZ: f64 = 0.25;
const CALIBRATION_DISTANCE_M: f64 = 0.5;
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayPipelineConfig {
    pub relay: RelayConfig,

    /// Consumer tick rate (Hz)
    pub tick_hz: f64,

    /// Stop after this long (None = until shutdown)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    pub head: HeadArg,

    /// Read operator controls from stdin
    pub interactive: bool,
}

/// Reference frame for reconstruction
pub struct SimulatedHead {
    motion: HeadArg,
    start: Instant,
}

impl SimulatedHead {
    pub fn new(motion: HeadArg) -> Self {
        Self {
            motion,
            start: Instant::now(),
        }
    }

    fn pose_at(&self, t: f64) -> Pose {
        let position = Vector3::new(0.0, EYE_HEIGHT_M, 0.0);
        match self.motion {
            HeadArg::Static => Pose::from_position(position),
            HeadArg::Sway => {
                let yaw = SWAY_AMPLITUDE_RAD * (std::f64::consts::TAU * SWAY_HZ * t).sin();
                Pose::new(position, UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw))
            }
        }
    }
}

impl HeadPoseSource for SimulatedHead {
    fn current_head_pose(&mut self) -> Pose {
        self.pose_at(self.start.elapsed().as_secs_f64())
    }
}

/// Sink that logs every applied pose
#[derive(Debug, Default)]
pub struct LogSink {
    applied: u64,
}

impl PoseSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn apply_pose(&mut self, pose: &Pose) {
        self.applied += 1;
        let (roll, pitch, yaw) = pose.orientation.euler_angles();
        trace!(
            x = pose.position.x,
            y = pose.position.y,
            z = pose.position.z,
            roll_deg = roll.to_degrees(),
            pitch_deg = pitch.to_degrees(),
            yaw_deg = yaw.to_degrees(),
            "pose applied"
        );
    }
}

/// Main relay orchestrator
pub struct RelayPipeline {
    config: RelayPipelineConfig,
}

impl RelayPipeline {
    pub fn new(config: RelayPipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves or the configured duration elapses
    pub async fn run<F>(self, shutdown: F) -> Result<RelayStats>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let relay = &self.config.relay;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Ingestion
        let metrics = Arc::new(IngestionMetrics::new());
        let (sender, queue) = sample_queue(relay.queue.capacity, metrics.clone());
        let source = UdpDatagramSource::bind(&relay.network.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", relay.network.bind_addr))?;
        let local_addr = source.local_addr().context("Failed to read bound address")?;
        let receiver = PoseReceiver::spawn(
            source,
            ReceiverConfig::from(&relay.network),
            sender,
            metrics.clone(),
        );
        info!(addr = %local_addr, format = ?relay.network.format, "Receiver started");

        // Consumer
        let mut engine = PoseEngine::new(relay);
        let mut head = SimulatedHead::new(self.config.head);
        let mut sink = LogSink::default();
        let mut controls = self.config.interactive.then(spawn_stdin_controls);
        if controls.is_some() {
            info!("Controls: c calibrate, C multi-step, x cancel, m cycle mode, +/- smoothing");
        }

        let tick_period = Duration::from_secs_f64(1.0 / self.config.tick_hz.max(1.0));
        let mut ticker = tokio::time::interval(tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let deadline = self.config.duration;
        let timeout = async move {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(timeout);
        tokio::pin!(shutdown);

        info!(
            tick_hz = self.config.tick_hz,
            mode = %engine.mode(),
            duration = ?deadline,
            "Relay running"
        );

        let mut stats = RelayStats::default();
        let mut last_summary = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping relay...");
                    break;
                }
                _ = &mut timeout => {
                    info!("Run duration reached");
                    break;
                }
                Some(control) = next_control(&mut controls) => {
                    let now = start.elapsed().as_secs_f64();
                    apply_control(&mut engine, &mut head, control, now);
                }
                _ = ticker.tick() => {
                    let now = start.elapsed().as_secs_f64();
                    let output = engine.drive(now, &mut head, &queue, &mut sink);
                    stats.tick_metrics.update(&output.meta);

                    if last_summary.elapsed() >= SUMMARY_INTERVAL {
                        last_summary = Instant::now();
                        debug!(
                            history = output.meta.history_len,
                            window_ms = format!("{:.1}", output.meta.render_delay_ms),
                            delay_ema_ms = ?output.meta.delay_ema_ms,
                            jitter_ema_ms = ?output.meta.jitter_ema_ms,
                            applied = sink.applied,
                            "Relay status"
                        );
                    }
                }
            }
        }

        info!("Shutting down relay...");
        receiver
            .shutdown()
            .await
            .context("Receiver did not shut down cleanly")?;

        stats.duration = start.elapsed();
        stats.poses_applied = sink.applied;
        stats.ingestion = metrics.snapshot();
        stats.engine = engine.stats();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            ticks = stats.tick_metrics.total_ticks,
            applied = stats.poses_applied,
            "Relay shutdown complete"
        );
        Ok(stats)
    }
}

async fn next_control(controls: &mut Option<mpsc::Receiver<Control>>) -> Option<Control> {
    match controls.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn apply_control(engine: &mut PoseEngine, head: &mut SimulatedHead, control: Control, now: f64) {
    match control {
        Control::Calibrate => match engine.calibrate_to(&calibration_target(head)) {
            Ok(offset) => info!(
                offset_m = offset.position_offset.norm(),
                offset_deg = offset.rotation_offset.angle().to_degrees(),
                "Calibrated"
            ),
            Err(e) => warn!(error = %e, "Calibration failed"),
        },
        Control::CalibrateMultiStep => {
            let target = calibration_target(head);
            if let Err(e) = engine.calibrate_multi_step_default(now, target) {
                warn!(error = %e, "Multi-step calibration rejected");
            }
        }
        Control::CancelCalibration => engine.cancel_calibration(),
        Control::CycleMode => {
            let mode = engine.cycle_mode();
            info!(mode = %mode, "Resampling mode changed");
        }
        Control::FactorUp => {
            let factor = engine.step_base_factor(1);
            info!(factor, "Smoothing base factor");
        }
        Control::FactorDown => {
            let factor = engine.step_base_factor(-1);
            info!(factor, "Smoothing base factor");
        }
    }
}

/// A pose half a meter in front of the head, facing the same way
fn calibration_target(head: &mut SimulatedHead) -> Pose {
    let pose = head.current_head_pose();
    let forward = pose.orientation * Vector3::new(0.0, 0.0, CALIBRATION_DISTANCE_M);
    Pose::new(pose.position + forward, pose.orientation)
}

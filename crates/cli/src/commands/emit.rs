//! `emit` command implementation.

use anyhow::{Context, Result};
use ingestion::{EmitterConfig, PoseEmitter, Trajectory};
use tracing::{info, warn};

use super::run::shutdown_signal;
use crate::cli::{EmitArgs, TrajectoryArg};
use crate::error::CliError;

/// Execute the `emit` command
pub async fn run_emit(args: &EmitArgs) -> Result<()> {
    let config = emitter_config(args)?;
    info!(
        target = %config.target,
        rate_hz = config.rate_hz,
        trajectory = ?config.trajectory,
        "Starting synthetic sender"
    );

    let emitter = PoseEmitter::start(config)
        .await
        .context("Failed to start emitter")?;

    let sent = if args.count > 0 {
        emitter.join().await
    } else {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping emitter...");
        emitter.stop().await
    };

    info!(sent, "Emitter finished");
    Ok(())
}

fn emitter_config(args: &EmitArgs) -> Result<EmitterConfig> {
    if !(args.rate_hz.is_finite() && args.rate_hz > 0.0) {
        return Err(CliError::invalid_override("rate-hz", "must be positive").into());
    }
    let trajectory = match args.trajectory {
        TrajectoryArg::Static => Trajectory::Static,
        TrajectoryArg::Linear => Trajectory::Linear {
            velocity: [0.0, 0.0, args.magnitude],
        },
        TrajectoryArg::Circle => Trajectory::Circle {
            radius: args.magnitude,
            period_s: args.period_s,
        },
    };

    Ok(EmitterConfig {
        target: args.target,
        rate_hz: args.rate_hz,
        format: args.format.into(),
        trajectory,
        position_noise_m: args.noise_m.max(0.0),
        rotation_noise_deg: args.noise_deg.max(0.0),
        epoch_millis: args.epoch_millis,
        max_samples: (args.count > 0).then_some(args.count),
        confidence: args.confidence,
        seed: args.seed,
    })
}

//! `run` command implementation.

use anyhow::Result;
use contracts::{RelayConfig, ResamplingMode};
use std::time::Duration;
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{RelayPipeline, RelayPipelineConfig};

use super::load_config;

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    let mut relay = load_config(args.config.as_deref())?;
    apply_overrides(&mut relay, args)?;

    info!(
        bind = %relay.network.bind_addr,
        format = ?relay.network.format,
        mode = %relay.resampling.mode,
        adaptive_window = relay.window.adaptive,
        queue_capacity = relay.queue.capacity,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&relay);
        return Ok(());
    }

    if !(args.tick_hz.is_finite() && args.tick_hz > 0.0) {
        return Err(CliError::invalid_override("tick-hz", "must be a positive number").into());
    }

    let pipeline = RelayPipeline::new(RelayPipelineConfig {
        relay,
        tick_hz: args.tick_hz,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        head: args.head,
        interactive: args.interactive,
    });

    info!("Starting relay...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .map_err(|e| CliError::relay_execution(format!("{e:#}")))?;

    info!(
        ticks = stats.tick_metrics.total_ticks,
        applied = stats.poses_applied,
        duration_secs = stats.duration.as_secs_f64(),
        tick_rate = format!("{:.2}", stats.tick_rate()),
        "Relay completed"
    );
    stats.print_summary();

    info!("Pose relay finished");
    Ok(())
}

/// Apply command-line overrides and re-validate
fn apply_overrides(relay: &mut RelayConfig, args: &RunArgs) -> Result<(), CliError> {
    if let Some(ref bind) = args.bind {
        info!(bind = %bind, "Overriding bind address from CLI");
        relay.network.bind_addr = bind.clone();
    }
    if let Some(mode) = args.mode {
        let mode = ResamplingMode::from(mode);
        info!(mode = %mode, "Overriding resampling mode from CLI");
        relay.resampling.mode = mode;
    }
    if let Some(delay) = args.render_delay_ms {
        info!(render_delay_ms = delay, "Overriding render delay from CLI");
        relay.resampling.render_delay_ms = delay;
    }

    config_loader::validate(relay).map_err(|e| {
        // Only the overridden fields can fail here; the file was validated on load
        let flag = if e.to_string().contains("bind_addr") {
            "bind"
        } else {
            "render-delay-ms"
        };
        CliError::invalid_override(flag, e.to_string())
    })
}

/// Resolve on Ctrl+C or SIGTERM
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(relay: &RelayConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Network:");
    println!("  Bind: {}", relay.network.bind_addr);
    println!("  Format: {:?}", relay.network.format);
    println!("\nQueue capacity: {}", relay.queue.capacity);
    println!(
        "History: {}s retention, {} samples max",
        relay.history.retention_s, relay.history.max_count
    );
    println!("\nResampling:");
    println!("  Mode: {}", relay.resampling.mode);
    println!("  Render delay: {} ms", relay.resampling.render_delay_ms);
    println!("  Lead: {} ms", relay.resampling.lead_ms);
    println!(
        "  Adaptive window: {} ({}-{} ms)",
        relay.window.adaptive, relay.window.min_ms, relay.window.max_ms
    );
    println!("\nSmoothing: {:?}", relay.smoothing.mode);
    println!(
        "Deadzone: {} m / {} deg",
        relay.filter.deadzone_m, relay.filter.deadzone_deg
    );
    println!();
}

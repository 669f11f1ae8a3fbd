//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RelayConfig;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    match &args.config {
        Some(path) => info!(config = %path.display(), "Loading configuration info"),
        None => info!("No configuration file given, showing defaults"),
    }

    let config = load_config(args.config.as_deref())?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&config)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn print_config_info(config: &RelayConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Pose Relay Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let net = &config.network;
    println!("📡 Network");
    println!("   ├─ Bind: {}", net.bind_addr);
    println!("   ├─ Format: {:?}", net.format);
    println!("   └─ Queue capacity: {}", config.queue.capacity);

    let history = &config.history;
    println!("\n🗂  History");
    println!("   ├─ Retention: {} s / {} samples", history.retention_s, history.max_count);
    println!("   ├─ Linear scan up to: {} entries", history.linear_scan_threshold);
    println!("   └─ Max sample age: {} s", history.max_sample_age_s);

    let clock = &config.clock;
    let window = &config.window;
    println!("\n⏱  Clock & Window");
    println!(
        "   ├─ EMA alphas: delay {} / jitter {}",
        clock.delay_alpha, clock.jitter_alpha
    );
    println!("   ├─ Offset refinement: {:?}", clock.refinement);
    if window.adaptive {
        println!(
            "   └─ Adaptive window: {}×(delay+jitter) + {} ms, clamped to [{}, {}] ms",
            window.scale, window.safety_ms, window.min_ms, window.max_ms
        );
    } else {
        println!("   └─ Fixed render delay");
    }

    let resampling = &config.resampling;
    println!("\n🎯 Resampling");
    println!("   ├─ Mode: {}", resampling.mode);
    println!("   ├─ Render delay: {} ms", resampling.render_delay_ms);
    println!("   └─ Prediction lead: {} ms", resampling.lead_ms);

    let reconstruction = &config.reconstruction;
    println!("\n🧭 Reconstruction");
    println!("   ├─ Convention: {:?}", reconstruction.mode);
    println!("   └─ Head compensation: {}", reconstruction.head_compensation);

    let filter = &config.filter;
    println!("\n🧹 Filter");
    println!(
        "   ├─ Deadzone: {} m / {}°",
        filter.deadzone_m, filter.deadzone_deg
    );
    println!(
        "   ├─ Spike: {} m / {}° (blend {})",
        filter.spike_m, filter.spike_deg, filter.spike_blend
    );
    println!(
        "   └─ Hard reject: {} m / {}°",
        filter.hard_reject_m, filter.hard_reject_deg
    );

    let smoothing = &config.smoothing;
    println!("\n🌊 Smoothing");
    println!("   ├─ Mode: {:?}", smoothing.mode);
    println!(
        "   ├─ Base factor: {} (weight {})",
        smoothing.base_factor, smoothing.base_weight
    );
    println!(
        "   └─ Factor range: {} .. {}",
        smoothing.max_smoothing, smoothing.min_smoothing
    );

    println!();
}

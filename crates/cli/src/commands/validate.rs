//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    bind_addr: String,
    mode: String,
    render_delay_ms: f64,
    queue_capacity: usize,
    adaptive_window: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Loading runs the validator
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    bind_addr: config.network.bind_addr.clone(),
                    mode: config.resampling.mode.to_string(),
                    render_delay_ms: config.resampling.render_delay_ms,
                    queue_capacity: config.queue.capacity,
                    adaptive_window: config.window.adaptive,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.filter.deadzone_m == 0.0 && config.filter.deadzone_deg == 0.0 {
        warnings.push("filter deadzone is disabled - micro-jitter will reach the output".to_string());
    }
    if config.history.retention_s * 1000.0 < config.window.max_ms {
        warnings.push(format!(
            "history.retention_s ({}s) is shorter than window.max_ms ({}ms) - wide windows will fall back to the latest sample",
            config.history.retention_s, config.window.max_ms
        ));
    }
    if config.resampling.lead_ms > config.resampling.render_delay_ms {
        warnings.push("resampling.lead_ms exceeds render_delay_ms - hybrid mode will extrapolate past the newest sample".to_string());
    }
    if config.queue.capacity < 4 {
        warnings.push("queue.capacity below 4 drops samples whenever a tick is late".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Bind: {}", summary.bind_addr);
            println!("  Mode: {}", summary.mode);
            println!("  Render delay: {} ms", summary.render_delay_ms);
            println!("  Adaptive window: {}", summary.adaptive_window);
            println!("  Queue capacity: {}", summary.queue_capacity);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

//! # Observability
//!
//! Tracing subscriber setup and Prometheus metrics for the pose relay.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact)
//! - Prometheus exporter
//! - Per-tick metric recording and in-memory aggregation
//!
//! ## Usage
//!
//! ```ignore
//! observability::init()?;
//!
//! let output = engine.tick(now, &head, rx.dequeue_all());
//! observability::record_tick_metrics(&output.meta);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    describe_relay_metrics, record_calibration, record_sample_dropped, record_sample_received,
    record_tick_metrics, MetricsSummary, RunningStats, StatsSummary, TickMetricsAggregator,
};

/// Initialize tracing and the Prometheus exporter with defaults
///
/// - Tracing: JSON, honours RUST_LOG
/// - Prometheus: 0.0.0.0:9000
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Level used when RUST_LOG is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// Structured JSON
    #[default]
    Json,
    /// Human readable, multi-line
    Pretty,
    /// Single line
    Compact,
}

/// Initialize with an explicit configuration
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Install only the Prometheus exporter
///
/// For callers that set up their own tracing subscriber.
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_exporter(port)
}

/// Render-window histogram buckets (ms)
const WINDOW_BUCKETS_MS: &[f64] = &[10.0, 20.0, 30.0, 45.0, 60.0, 90.0, 120.0, 150.0, 200.0];

/// Per-tick applied step buckets (m)
const STEP_BUCKETS_M: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1];

fn install_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full("pose_relay_window_ms_hist".to_string()),
            WINDOW_BUCKETS_MS,
        )
        .context("Invalid render-window buckets")?
        .set_buckets_for_metric(
            Matcher::Full("pose_relay_applied_step_m".to_string()),
            STEP_BUCKETS_M,
        )
        .context("Invalid applied-step buckets")?
        .install()
        .context("Failed to install Prometheus recorder")?;

    crate::metrics::describe_relay_metrics();
    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

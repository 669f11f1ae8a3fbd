//! CLI argument definitions using clap.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use contracts::{ResamplingMode, WireFormat};

/// Pose Relay - receive tracked poses over UDP and reconstruct a smooth world pose
#[derive(Parser, Debug)]
#[command(
    name = "pose-relay",
    author,
    version,
    about = "Pose ingestion and reconstruction relay",
    long_about = "Receives relative pose samples over UDP, reconstructs them against a \n\
                  reference (head) pose, resamples them on the render clock, and applies \n\
                  filtered, smoothed poses at a fixed tick rate."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "POSE_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "POSE_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Receive samples and run the render-rate tick loop
    Run(RunArgs),

    /// Send a synthetic pose stream (demo / bench sender)
    Emit(EmitArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "POSE_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the UDP bind address
    #[arg(long, env = "POSE_RELAY_BIND")]
    pub bind: Option<String>,

    /// Override the resampling mode
    #[arg(long, value_enum, env = "POSE_RELAY_MODE")]
    pub mode: Option<ModeArg>,

    /// Override the render-delay budget (milliseconds)
    #[arg(long, env = "POSE_RELAY_RENDER_DELAY_MS")]
    pub render_delay_ms: Option<f64>,

    /// Consumer tick rate (Hz)
    #[arg(long, default_value = "90", env = "POSE_RELAY_TICK_HZ")]
    pub tick_hz: f64,

    /// Simulated head motion used as the reference frame
    #[arg(long, value_enum, default_value = "static")]
    pub head: HeadArg,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "POSE_RELAY_DURATION")]
    pub duration: u64,

    /// Read control commands from stdin (c: calibrate, C: multi-step, x: cancel,
    /// m: cycle mode, +/-: smoothing factor)
    #[arg(long)]
    pub interactive: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "POSE_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `emit` command
#[derive(Parser, Debug, Clone)]
pub struct EmitArgs {
    /// Destination address
    #[arg(short, long, default_value = "127.0.0.1:12345", env = "POSE_RELAY_EMIT_TARGET")]
    pub target: SocketAddr,

    /// Send rate (Hz)
    #[arg(long, default_value = "60")]
    pub rate_hz: f64,

    /// Wire encoding
    #[arg(long, value_enum, default_value = "json")]
    pub format: FormatArg,

    /// Scripted motion
    #[arg(long, value_enum, default_value = "circle")]
    pub trajectory: TrajectoryArg,

    /// Circle radius (m) or linear speed along z (m/s)
    #[arg(long, default_value = "0.3")]
    pub magnitude: f64,

    /// Circle period (s)
    #[arg(long, default_value = "4.0")]
    pub period_s: f64,

    /// Uniform position noise (m)
    #[arg(long, default_value = "0")]
    pub noise_m: f64,

    /// Uniform rotation noise (degrees)
    #[arg(long, default_value = "0")]
    pub noise_deg: f64,

    /// Send epoch milliseconds instead of seconds since start
    #[arg(long)]
    pub epoch_millis: bool,

    /// Number of samples to send (0 = until interrupted)
    #[arg(long, default_value = "0")]
    pub count: u64,

    /// Attach this confidence to every sample
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Noise seed
    #[arg(long, default_value = "7")]
    pub seed: u64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pose-relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults are shown when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    None,
    TimestampCompare,
    BufferInterpolation,
    Hybrid,
}

impl From<ModeArg> for ResamplingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::None => ResamplingMode::None,
            ModeArg::TimestampCompare => ResamplingMode::TimestampCompare,
            ModeArg::BufferInterpolation => ResamplingMode::BufferInterpolation,
            ModeArg::Hybrid => ResamplingMode::Hybrid,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Json,
    Bincode,
}

impl From<FormatArg> for WireFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => WireFormat::Json,
            FormatArg::Bincode => WireFormat::Bincode,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrajectoryArg {
    Static,
    Linear,
    Circle,
}

/// Reference-frame motion for `run`
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeadArg {
    /// Head fixed at standing eye height
    #[default]
    Static,
    /// Slow yaw sway
    Sway,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::parse_from([
            "pose-relay",
            "run",
            "--bind",
            "127.0.0.1:0",
            "--mode",
            "buffer-interpolation",
            "--render-delay-ms",
            "45",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.bind.as_deref(), Some("127.0.0.1:0"));
        assert_eq!(args.mode.map(ResamplingMode::from), Some(ResamplingMode::BufferInterpolation));
        assert_eq!(args.render_delay_ms, Some(45.0));
    }

    #[test]
    fn test_emit_defaults() {
        let cli = Cli::parse_from(["pose-relay", "emit", "--count", "10"]);
        let Commands::Emit(args) = cli.command else {
            panic!("expected emit");
        };
        assert_eq!(args.count, 10);
        assert_eq!(WireFormat::from(args.format), WireFormat::Json);
        assert_eq!(args.trajectory, TrajectoryArg::Circle);
    }
}

//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tcal - ultrasound video / tracker temporal calibration
#[derive(Parser, Debug)]
#[command(
    name = "tcal",
    author,
    version,
    about = "Ultrasound video to position tracker temporal calibration",
    long_about = "Estimates the time lag between an ultrasound video stream and a pose tracker \n\
                  stream recorded while the probe moves periodically over a planar target.\n\n\
                  The video position is the depth of the bright line in each frame, the tracker \n\
                  position is the probe pose projected on its principal motion axis."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TCAL_VERBOSE")]
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
        env = "TCAL_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate a recorded session
    Run(RunArgs),

    /// Calibrate synthetic recordings with a known lag
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "calibration.toml",
        env = "TCAL_CONFIG"
    )]
    pub config: PathBuf,

    /// Recording to calibrate (.bin or .json)
    #[arg(short, long, env = "TCAL_RECORDING")]
    pub recording: PathBuf,

    /// Additional report directory (report.json + signal CSVs)
    #[arg(short, long, env = "TCAL_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TCAL_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "calibration.toml",
        env = "TCAL_CONFIG"
    )]
    pub config: PathBuf,

    /// Tracker lag injected into the synthetic recording (seconds)
    #[arg(long, default_value = "0.1", allow_hyphen_values = true)]
    pub lag: f64,

    /// Number of independent trials
    #[arg(long, default_value = "1")]
    pub trials: u32,

    /// Seed of the first trial; trial `i` uses `seed + i`
    #[arg(long, default_value = "42", env = "TCAL_SEED")]
    pub seed: u64,

    /// Recording duration (seconds)
    #[arg(long, default_value = "10.0")]
    pub duration: f64,

    /// Uniform pixel noise amplitude (grey levels)
    #[arg(long, default_value = "0.0")]
    pub pixel_noise: f64,

    /// Uniform tracker position noise amplitude (mm)
    #[arg(long, default_value = "0.0")]
    pub position_noise: f64,

    /// Save the first trial's recording (.bin or .json)
    #[arg(long)]
    pub save_recording: Option<PathBuf>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "calibration.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "calibration.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

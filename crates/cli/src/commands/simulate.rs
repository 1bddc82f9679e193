//! `simulate` command implementation.
//!
//! Generates synthetic recordings with a known tracker lag and reports how
//! well the calibration recovers it.

use anyhow::{Context, Result};
use observability::CalibrationStatsAggregator;
use recording::{generate, RecordingStore, SyntheticRecordingConfig};
use tracing::{info, warn};

use crate::cli::SimulateArgs;
use crate::error::CliError;
use crate::session::calibrate;

/// Execute the `simulate` command
pub fn run_simulation(args: &SimulateArgs) -> Result<()> {
    if !args.config.exists() {
        return Err(CliError::file_not_found("Configuration", &args.config).into());
    }
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.lag.abs() > blueprint.calibration.max_tracker_lag_sec {
        warn!(
            lag_sec = args.lag,
            max_lag_sec = blueprint.calibration.max_tracker_lag_sec,
            "Injected lag is outside the searched range"
        );
    }

    let mut aggregator = CalibrationStatsAggregator::new();
    for trial in 0..args.trials {
        let synthetic = SyntheticRecordingConfig {
            duration_sec: args.duration,
            tracker_lag_sec: args.lag,
            pixel_noise: args.pixel_noise,
            position_noise_mm: args.position_noise,
            seed: args.seed.wrapping_add(u64::from(trial)),
            ..Default::default()
        };
        let recording = generate(&synthetic).context("Failed to generate synthetic recording")?;

        if trial == 0 {
            if let Some(path) = &args.save_recording {
                RecordingStore::save(path, &recording)
                    .with_context(|| format!("Failed to save recording {}", path.display()))?;
                info!(path = %path.display(), "Synthetic recording saved");
            }
        }

        match calibrate(&blueprint.calibration, recording) {
            Ok(result) => {
                info!(
                    trial,
                    expected_lag_ms = args.lag * 1000.0,
                    estimated_lag_ms = result.tracker_lag_sec * 1000.0,
                    "Trial finished"
                );
                observability::record_simulation_trial(args.lag, result.tracker_lag_sec);
                aggregator.record_success(&result, Some(args.lag));
            }
            Err(e) => {
                warn!(trial, error = %e, "Trial failed");
                aggregator.record_failure(&e);
            }
        }
    }

    println!("\n{}", aggregator.summary());

    if aggregator.total_runs > 0 && aggregator.failed_runs == aggregator.total_runs {
        anyhow::bail!("All {} trials failed", aggregator.total_runs);
    }
    Ok(())
}

//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{CalibrationResult, ContractError, SinkConfig};
use recording::RecordingStore;
use report::{create_sinks, publish, CalibrationReport, ReportStatus};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::calibrate;

/// Name of the sink added by `--output`
const OUTPUT_SINK_NAME: &str = "cli_output";

/// Execute the `run` command
pub fn run_calibration(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::file_not_found("Configuration", &args.config).into());
    }
    if !args.recording.exists() {
        return Err(CliError::file_not_found("Recording", &args.recording).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let recording = RecordingStore::load(&args.recording)
        .with_context(|| format!("Failed to load recording {}", args.recording.display()))?;

    info!(
        video_frames = recording.video.len(),
        tracker_frames = recording.tracker.len(),
        resolution_sec = blueprint.calibration.sampling_resolution_sec,
        max_lag_sec = blueprint.calibration.max_tracker_lag_sec,
        "Starting temporal calibration"
    );

    let result = calibrate(&blueprint.calibration, recording).map_err(CliError::from)?;
    print_result(&result);

    let mut sink_configs = blueprint.sinks.clone();
    if let Some(output) = &args.output {
        sink_configs.push(SinkConfig::file(
            OUTPUT_SINK_NAME,
            output.to_string_lossy(),
        ));
    }
    if sink_configs.is_empty() {
        warn!("No sinks configured, logging the report only");
        sink_configs.push(SinkConfig::log("console"));
    }

    let mut sinks = create_sinks(&sink_configs).context("Failed to create report sinks")?;
    let report = CalibrationReport::new(
        args.recording.display().to_string(),
        result,
        blueprint.calibration,
    );
    let failures = publish(&mut sinks, &report);
    for sink in &sinks {
        let failed = failures.iter().any(|e| {
            matches!(e, ContractError::SinkWrite { sink_name, .. } if sink_name == sink.name())
        });
        observability::record_report_published(sink.name(), !failed);
    }
    if !failures.is_empty() {
        return Err(CliError::Publish {
            failed: failures.len(),
            total: sinks.len(),
        }
        .into());
    }

    if report.status == ReportStatus::Suspect {
        warn!("Calibration finished, but the result failed the score threshold");
    } else {
        info!("Calibration finished");
    }
    Ok(())
}

fn print_result(result: &CalibrationResult) {
    println!("\n=== Temporal Calibration ===\n");
    println!("  Tracker lag: {:.1} ms", result.tracker_lag_sec * 1000.0);
    println!(
        "  Calibration error: {:.4} (max {:.4})",
        result.calibration_error, result.max_calibration_error
    );
    println!(
        "  Best {} score: {:.4} ({:?} sign)",
        result.metric.as_str(),
        result.best_score,
        result.selected_sign
    );
    for candidate in &result.candidates {
        println!(
            "    {:?}: {:.1} ms, score {:.4}",
            candidate.sign,
            candidate.lag_sec * 1000.0,
            candidate.score
        );
    }
    if let Some(stats) = &result.video_stats {
        println!(
            "  Video frames: {} accepted of {} ({} unusable)",
            stats.accepted_frames,
            stats.total_frames,
            stats.unusable_frames()
        );
    }
    if result.above_threshold {
        println!("  WARNING: best score failed the configured threshold");
    }
    println!();
}

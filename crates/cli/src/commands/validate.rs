//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CalibrationBlueprint, SinkType};
use serde::Serialize;
use temporal_calibration::lag_steps;
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
    version: String,
    sampling_resolution_sec: f64,
    max_tracker_lag_sec: f64,
    transform_name: String,
    metric: String,
    sink_count: usize,
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
    match load_summary(args) {
        Ok((summary, warnings)) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: (!warnings.is_empty()).then_some(warnings),
            summary: Some(summary),
        },
        Err(error) => ValidationResult {
            valid: false,
            config_path,
            error: Some(error),
            warnings: None,
            summary: None,
        },
    }
}

fn load_summary(args: &ValidateArgs) -> Result<(ConfigSummary, Vec<String>), String> {
    if !args.config.exists() {
        return Err(format!("File not found: {}", args.config.display()));
    }
    let blueprint =
        config_loader::ConfigLoader::load_from_path(&args.config).map_err(|e| e.to_string())?;
    let calibration = &blueprint.calibration;
    let summary = ConfigSummary {
        version: format!("{:?}", blueprint.version),
        sampling_resolution_sec: calibration.sampling_resolution_sec,
        max_tracker_lag_sec: calibration.max_tracker_lag_sec,
        transform_name: calibration.probe_to_reference_transform_name.clone(),
        metric: calibration.alignment.metric.as_str().to_string(),
        sink_count: blueprint.sinks.len(),
    };
    Ok((summary, collect_warnings(&blueprint)))
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &CalibrationBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let calibration = &blueprint.calibration;

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - reports are only logged".to_string());
    } else if !blueprint.sinks.iter().any(|s| s.sink_type == SinkType::File) {
        warnings.push("No file sink configured - diagnostic signals are not saved".to_string());
    }

    if calibration.max_tracker_lag_sec == 0.0 {
        warnings.push("max_tracker_lag_sec is 0 - only a zero lag can be found".to_string());
    }

    let steps = lag_steps(
        calibration.max_tracker_lag_sec,
        calibration.sampling_resolution_sec,
    );
    if steps > 100_000 {
        warnings.push(format!(
            "Lag sweep evaluates {} offsets per sign - consider a coarser resolution",
            steps.saturating_mul(2).saturating_add(1)
        ));
    }

    if calibration.alignment.thresholds.for_metric(calibration.alignment.metric).is_none() {
        warnings.push(format!(
            "No threshold for metric '{}' - suspect results are not flagged",
            calibration.alignment.metric.as_str()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if !result.valid {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(error) = &result.error {
            println!("\n  Error: {}", error);
        }
        return;
    }

    println!("✓ Configuration is valid: {}", result.config_path);
    if let Some(summary) = &result.summary {
        println!(
            "\n  {} | resolution {} s | max lag ±{} s | {} | {} | {} sink(s)",
            summary.version,
            summary.sampling_resolution_sec,
            summary.max_tracker_lag_sec,
            summary.transform_name,
            summary.metric,
            summary.sink_count
        );
    }
    for warning in result.warnings.iter().flatten() {
        println!("  ⚠ {}", warning);
    }
}

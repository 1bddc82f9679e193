//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::CalibrationBlueprint;
use serde::Serialize;
use temporal_calibration::lag_steps;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sampling_resolution_sec: f64,
    max_tracker_lag_sec: f64,
    lag_offsets_per_sign: u64,
    probe_to_reference_transform_name: String,
    video: VideoInfo,
    alignment: AlignmentInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct VideoInfo {
    number_of_scanlines: u32,
    minimum_valid_scanlines: u32,
    peak_position_metric: String,
    max_inlier_distance_px: f64,
    save_intermediate_images: bool,
}

#[derive(Serialize)]
struct AlignmentInfo {
    metric: String,
    normalization: String,
    interpolation: String,
    minimum_peak_to_peak: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<f64>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_path: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&blueprint);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &CalibrationBlueprint) -> ConfigInfo {
    let calibration = &blueprint.calibration;
    let alignment = &calibration.alignment;

    let sinks = blueprint
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            base_path: s.params.get("base_path").cloned(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sampling_resolution_sec: calibration.sampling_resolution_sec,
        max_tracker_lag_sec: calibration.max_tracker_lag_sec,
        lag_offsets_per_sign: lag_steps(
            calibration.max_tracker_lag_sec,
            calibration.sampling_resolution_sec,
        )
        .max(0) as u64
            * 2
            + 1,
        probe_to_reference_transform_name: calibration.probe_to_reference_transform_name.clone(),
        video: VideoInfo {
            number_of_scanlines: calibration.video.number_of_scanlines,
            minimum_valid_scanlines: calibration.video.minimum_valid_scanlines,
            peak_position_metric: format!("{:?}", calibration.video.peak_position_metric),
            max_inlier_distance_px: calibration.video.line_fit.max_inlier_distance_px,
            save_intermediate_images: calibration.diagnostics.save_intermediate_images,
        },
        alignment: AlignmentInfo {
            metric: alignment.metric.as_str().to_string(),
            normalization: format!("{:?}", alignment.normalization),
            interpolation: format!("{:?}", alignment.interpolation),
            minimum_peak_to_peak: alignment.minimum_peak_to_peak,
            threshold: alignment.thresholds.for_metric(alignment.metric),
        },
        sinks,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Temporal Calibration Configuration ===\n");

    println!("Sweep");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Sampling resolution: {} s", info.sampling_resolution_sec);
    println!("   ├─ Max tracker lag: ±{} s", info.max_tracker_lag_sec);
    println!("   ├─ Offsets per sign: {}", info.lag_offsets_per_sign);
    println!("   └─ Transform: {}", info.probe_to_reference_transform_name);

    let video = &info.video;
    println!("\nVideo");
    println!(
        "   ├─ Scanlines: {} (min valid {})",
        video.number_of_scanlines, video.minimum_valid_scanlines
    );
    println!("   ├─ Peak position: {}", video.peak_position_metric);
    println!("   ├─ RANSAC inlier distance: {} px", video.max_inlier_distance_px);
    println!("   └─ Intermediate images: {}", video.save_intermediate_images);

    let alignment = &info.alignment;
    println!("\nAlignment");
    println!("   ├─ Metric: {}", alignment.metric);
    println!("   ├─ Normalization: {}", alignment.normalization);
    println!("   ├─ Interpolation: {}", alignment.interpolation);
    println!("   ├─ Minimum peak-to-peak: {}", alignment.minimum_peak_to_peak);
    match alignment.threshold {
        Some(threshold) => println!("   └─ Threshold: {}", threshold),
        None => println!("   └─ Threshold: (none)"),
    }

    if !info.sinks.is_empty() {
        println!("\nSinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i == info.sinks.len() - 1 { "└─" } else { "├─" };
            match &sink.base_path {
                Some(path) => println!("   {} {} ({}, {})", prefix, sink.name, sink.sink_type, path),
                None => println!("   {} {} ({})", prefix, sink.name, sink.sink_type),
            }
        }
    }

    println!();
}

//! Temporal calibration configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Smallest sampling resolution accepted by the aligner (seconds)
pub const MINIMUM_SAMPLING_RESOLUTION_SEC: f64 = 1e-5;

/// Two timestamps closer than this are treated as the same instant (seconds)
pub const TIMESTAMP_EPSILON_SEC: f64 = 1e-4;

/// Default name of the probe pose transform
pub const DEFAULT_PROBE_TO_REFERENCE_TRANSFORM_NAME: &str = "ProbeToReference";

/// Temporal calibration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TemporalCalibrationConfig {
    /// Resampling step and lag quantum (seconds)
    #[validate(range(exclusive_min = 0.0))]
    pub sampling_resolution_sec: f64,

    /// Half-width of the symmetric lag sweep (seconds)
    #[validate(range(min = 0.0))]
    pub max_tracker_lag_sec: f64,

    /// Transform holding the probe pose in the tracker stream
    #[validate(length(min = 1))]
    pub probe_to_reference_transform_name: String,

    /// Video position metric extraction
    #[validate(nested)]
    pub video: VideoMetricConfig,

    /// Signal alignment
    #[validate(nested)]
    pub alignment: AlignmentConfig,

    /// Intermediate image dump
    pub diagnostics: DiagnosticsConfig,
}

impl Default for TemporalCalibrationConfig {
    fn default() -> Self {
        Self {
            sampling_resolution_sec: 0.001,
            max_tracker_lag_sec: 2.0,
            probe_to_reference_transform_name: DEFAULT_PROBE_TO_REFERENCE_TRANSFORM_NAME
                .to_string(),
            video: VideoMetricConfig::default(),
            alignment: AlignmentConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

/// Video position metric configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VideoMetricConfig {
    /// Number of vertical scanlines sampled per frame
    #[validate(range(min = 2))]
    pub number_of_scanlines: u32,

    /// Frames with fewer valid scanlines are skipped
    #[validate(range(min = 2))]
    pub minimum_valid_scanlines: u32,

    /// Fraction of the profile maximum a sample must exceed to belong to a peak
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub intensity_threshold_fraction: f64,

    /// How a peak is reduced to a row position
    pub peak_position_metric: PeakPositionMetric,

    /// Lines whose direction has a smaller x component are treated as vertical
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_x_slope_component: f64,

    /// Robust line fit
    #[validate(nested)]
    pub line_fit: LineFitConfig,

    /// Warn when more than this fraction of frames is unusable
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_invalid_frame_fraction: f64,

    /// Warn when more than this many unusable frames follow each other
    pub max_consecutive_invalid_frames: usize,
}

impl Default for VideoMetricConfig {
    fn default() -> Self {
        Self {
            number_of_scanlines: 40,
            minimum_valid_scanlines: 5,
            intensity_threshold_fraction: 0.5,
            peak_position_metric: PeakPositionMetric::default(),
            min_x_slope_component: 0.01,
            line_fit: LineFitConfig::default(),
            max_invalid_frame_fraction: 0.1,
            max_consecutive_invalid_frames: 10,
        }
    }
}

/// RANSAC line fit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LineFitConfig {
    /// Maximal point-to-line distance of an inlier (pixels)
    #[validate(range(exclusive_min = 0.0))]
    pub max_inlier_distance_px: f64,

    /// Desired probability of drawing at least one outlier-free sample
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub desired_probability: f64,

    /// Hard cap on RANSAC iterations
    #[validate(range(min = 1))]
    pub max_iterations: usize,

    /// RNG seed; a fixed seed keeps repeated runs identical
    pub seed: u64,
}

impl Default for LineFitConfig {
    fn default() -> Self {
        Self {
            max_inlier_distance_px: 0.5,
            desired_probability: 0.999,
            max_iterations: 1000,
            seed: 0,
        }
    }
}

/// Peak position metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakPositionMetric {
    /// Intensity-weighted mean row of the peak run
    #[default]
    CenterOfGravity,
    /// First row of the run above half the peak value
    PeakStart,
}

/// Alignment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Score used to rank candidate lags
    pub metric: AlignmentMetric,

    /// Signal normalization before scoring
    pub normalization: NormalizationMethod,

    /// Tracker resampling interpolant
    pub interpolation: Interpolation,

    /// Signals with a smaller peak-to-peak amplitude are rejected
    #[validate(range(min = 0.0))]
    pub minimum_peak_to_peak: f64,

    /// Per-metric acceptance thresholds
    pub thresholds: AlignmentThresholds,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            metric: AlignmentMetric::default(),
            normalization: NormalizationMethod::default(),
            interpolation: Interpolation::default(),
            minimum_peak_to_peak: 0.01,
            thresholds: AlignmentThresholds::default(),
        }
    }
}

/// Alignment metric. Every score is "higher is better".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMetric {
    /// Negative sum of squared differences
    #[default]
    Ssd,
    /// Cross-correlation sum
    Correlation,
    /// Negative sum of absolute differences
    Sad,
}

impl AlignmentMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssd => "ssd",
            Self::Correlation => "correlation",
            Self::Sad => "sad",
        }
    }
}

/// Normalization applied after removing the mean
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMethod {
    /// Divide by peak-to-peak amplitude
    #[default]
    Amplitude,
    /// Divide by sample standard deviation
    StandardDeviation,
}

/// Interpolant used to resample the tracker signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Piecewise linear
    #[default]
    Linear,
    /// Piecewise cubic Hermite with Fritsch-Carlson slopes
    MonotoneCubic,
}

/// Minimum acceptable best score per metric. `None` disables the check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentThresholds {
    pub ssd: Option<f64>,
    pub correlation: Option<f64>,
    pub sad: Option<f64>,
}

impl AlignmentThresholds {
    pub fn for_metric(&self, metric: AlignmentMetric) -> Option<f64> {
        match metric {
            AlignmentMetric::Ssd => self.ssd,
            AlignmentMetric::Correlation => self.correlation,
            AlignmentMetric::Sad => self.sad,
        }
    }
}

/// Intermediate image dump configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Write per-frame scanline and peak images
    pub save_intermediate_images: bool,

    /// Target directory of the images
    pub output_directory: Option<PathBuf>,
}

//! Layered error definitions
//!
//! Two families:
//! - `ContractError`: configuration / recording / sink / io plumbing
//! - `CalibrationError`: the closed result-code taxonomy of a calibration run

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified plumbing error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Recording Errors =====
    /// Recording file could not be decoded or encoded
    #[error("recording error for '{path}': {message}")]
    Recording { path: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create recording error
    pub fn recording(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Recording {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Failure of a calibration `update()` or of a result accessor.
///
/// Per-frame and per-scanline problems never surface here; they are skipped
/// and counted by the extractors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// No video input assigned
    #[error("no video data assigned")]
    NoVideoData,

    /// No tracker input assigned
    #[error("no tracker data assigned")]
    NoTrackerData,

    /// Video frames are not in the canonical orientation / image type
    #[error("video frames are not usable: {reason}")]
    WrongOrientation { reason: String },

    /// Video input holds zero frames or samples
    #[error("video data is empty")]
    EmptyVideoData,

    /// Tracker input holds zero frames or samples
    #[error("tracker data is empty")]
    EmptyTrackerData,

    /// Sampling resolution below the numerical floor
    #[error("sampling resolution {requested} s is below the minimum of {minimum} s")]
    ResolutionTooSmall { requested: f64, minimum: f64 },

    /// Transform name is malformed or cannot be resolved from the tracker frames
    #[error("transform name '{name}' is invalid: {reason}")]
    InvalidTransformName { name: String, reason: String },

    /// Time ranges do not overlap once the lag margin is removed
    #[error(
        "insufficient overlap between video and tracker data: common range [{common_min}, {common_max}] s, max lag {max_lag} s"
    )]
    InsufficientOverlap {
        common_min: f64,
        common_max: f64,
        max_lag: f64,
    },

    /// Signal too flat for lag estimation
    #[error("{signal} signal peak-to-peak {peak_to_peak} is below the minimum of {minimum}")]
    InsufficientSignalVariation {
        signal: String,
        peak_to_peak: f64,
        minimum: f64,
    },

    /// Not enough points for PCA, line fitting or alignment
    #[error("{stage}: {found} samples available, at least {required} required")]
    TooFewSamples {
        stage: String,
        found: usize,
        required: usize,
    },

    /// Lag sweep produced no scored offset
    #[error("lag sweep produced no candidate scores")]
    CorrelationResultEmpty,

    /// Best score did not clear the configured threshold; result published as suspect
    #[error("best alignment score {score} does not exceed the threshold {threshold} (lag {lag_sec} s)")]
    ResultAboveThreshold {
        score: f64,
        threshold: f64,
        lag_sec: f64,
    },

    /// Accessor invoked before a result was published
    #[error("calibration result is not computed yet")]
    NotYetComputed,
}

impl CalibrationError {
    pub fn wrong_orientation(reason: impl Into<String>) -> Self {
        Self::WrongOrientation {
            reason: reason.into(),
        }
    }

    pub fn invalid_transform_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTransformName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn insufficient_variation(signal: impl Into<String>, peak_to_peak: f64, minimum: f64) -> Self {
        Self::InsufficientSignalVariation {
            signal: signal.into(),
            peak_to_peak,
            minimum,
        }
    }

    pub fn too_few_samples(stage: impl Into<String>, found: usize, required: usize) -> Self {
        Self::TooFewSamples {
            stage: stage.into(),
            found,
            required,
        }
    }

    /// Fieldless result code
    pub fn code(&self) -> CalibrationErrorCode {
        match self {
            Self::NoVideoData => CalibrationErrorCode::NoVideoData,
            Self::NoTrackerData => CalibrationErrorCode::NoTrackerData,
            Self::WrongOrientation { .. } => CalibrationErrorCode::WrongOrientation,
            Self::EmptyVideoData => CalibrationErrorCode::EmptyVideoData,
            Self::EmptyTrackerData => CalibrationErrorCode::EmptyTrackerData,
            Self::ResolutionTooSmall { .. } => CalibrationErrorCode::ResolutionTooSmall,
            Self::InvalidTransformName { .. } => CalibrationErrorCode::InvalidTransformName,
            Self::InsufficientOverlap { .. } => CalibrationErrorCode::InsufficientOverlap,
            Self::InsufficientSignalVariation { .. } => {
                CalibrationErrorCode::InsufficientSignalVariation
            }
            Self::TooFewSamples { .. } => CalibrationErrorCode::TooFewSamples,
            Self::CorrelationResultEmpty => CalibrationErrorCode::CorrelationResultEmpty,
            Self::ResultAboveThreshold { .. } => CalibrationErrorCode::ResultAboveThreshold,
            Self::NotYetComputed => CalibrationErrorCode::NotYetComputed,
        }
    }
}

/// Result code of a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationErrorCode {
    NoVideoData,
    NoTrackerData,
    WrongOrientation,
    EmptyVideoData,
    EmptyTrackerData,
    ResolutionTooSmall,
    InvalidTransformName,
    InsufficientOverlap,
    InsufficientSignalVariation,
    TooFewSamples,
    CorrelationResultEmpty,
    ResultAboveThreshold,
    NotYetComputed,
}

impl CalibrationErrorCode {
    /// Stable label used in metrics and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoVideoData => "no_video_data",
            Self::NoTrackerData => "no_tracker_data",
            Self::WrongOrientation => "wrong_orientation",
            Self::EmptyVideoData => "empty_video_data",
            Self::EmptyTrackerData => "empty_tracker_data",
            Self::ResolutionTooSmall => "resolution_too_small",
            Self::InvalidTransformName => "invalid_transform_name",
            Self::InsufficientOverlap => "insufficient_overlap",
            Self::InsufficientSignalVariation => "insufficient_signal_variation",
            Self::TooFewSamples => "too_few_samples",
            Self::CorrelationResultEmpty => "correlation_result_empty",
            Self::ResultAboveThreshold => "result_above_threshold",
            Self::NotYetComputed => "not_yet_computed",
        }
    }
}

impl std::fmt::Display for CalibrationErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = CalibrationError::too_few_samples("tracker PCA", 1, 2);
        assert_eq!(err.code(), CalibrationErrorCode::TooFewSamples);
        assert_eq!(err.code().as_str(), "too_few_samples");
        assert!(err.to_string().contains("1 samples available"));
    }

    #[test]
    fn test_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&CalibrationErrorCode::InsufficientOverlap).unwrap();
        assert_eq!(json, "\"insufficient_overlap\"");
    }
}

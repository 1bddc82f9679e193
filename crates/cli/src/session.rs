//! One calibration run over a loaded recording.

use std::sync::Arc;

use contracts::{CalibrationError, CalibrationResult, TemporalCalibrationConfig};
use recording::Recording;
use temporal_calibration::TemporalCalibration;

/// Calibrate `recording` with a fresh engine.
///
/// A result that fails the score threshold is still returned, flagged with
/// `above_threshold`.
pub fn calibrate(
    config: &TemporalCalibrationConfig,
    recording: Recording,
) -> Result<CalibrationResult, CalibrationError> {
    let mut engine = TemporalCalibration::new(config.clone());
    engine.set_video_frames(Arc::new(recording.video));
    engine.set_tracker_frames(Arc::new(recording.tracker));

    match engine.update().cloned() {
        Ok(result) => Ok(result),
        Err(CalibrationError::ResultAboveThreshold { .. }) => engine.result().cloned(),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recording::{generate, SyntheticRecordingConfig};

    fn config() -> TemporalCalibrationConfig {
        TemporalCalibrationConfig {
            sampling_resolution_sec: 0.005,
            max_tracker_lag_sec: 0.5,
            ..Default::default()
        }
    }

    fn recording(lag: f64) -> Recording {
        generate(&SyntheticRecordingConfig {
            duration_sec: 4.0,
            image_width: 48,
            image_height: 96,
            line_depth_px: 48.0,
            amplitude_px: 16.0,
            tracker_lag_sec: lag,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_calibrate_recovers_lag() {
        let result = calibrate(&config(), recording(0.1)).unwrap();
        assert!((result.tracker_lag_sec - 0.1).abs() <= 0.02, "{}", result.tracker_lag_sec);
        assert!(!result.above_threshold);
    }

    #[test]
    fn test_threshold_failure_keeps_result() {
        let mut config = config();
        config.alignment.thresholds.ssd = Some(1.0);
        let result = calibrate(&config, recording(0.1)).unwrap();
        assert!(result.above_threshold);
    }

    #[test]
    fn test_empty_recording_fails() {
        let err = calibrate(&config(), Recording::default()).unwrap_err();
        assert_eq!(err, CalibrationError::EmptyVideoData);
    }
}

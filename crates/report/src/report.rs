//! CalibrationReport - one published calibration plus its context

use chrono::{DateTime, Utc};
use contracts::{CalibrationResult, ScalarSignal, TemporalCalibrationConfig};
use serde::{Deserialize, Serialize};

/// Whether the published result passed the score threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Ok,
    /// Published, but the best score failed the configured threshold
    Suspect,
}

/// Serializable calibration report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub generated_at: DateTime<Utc>,
    /// Where the input came from (recording path, "synthetic", ...)
    pub source: String,
    pub status: ReportStatus,
    pub result: CalibrationResult,
    /// Configuration the result was computed with
    pub config: TemporalCalibrationConfig,
}

impl CalibrationReport {
    pub fn new(
        source: impl Into<String>,
        result: CalibrationResult,
        config: TemporalCalibrationConfig,
    ) -> Self {
        let status = if result.above_threshold {
            ReportStatus::Suspect
        } else {
            ReportStatus::Ok
        };
        Self {
            generated_at: Utc::now(),
            source: source.into(),
            status,
            result,
            config,
        }
    }

    /// Diagnostic signals as (file stem, column header, signal)
    pub fn signal_tables(&self) -> [(&'static str, &'static str, &ScalarSignal); 4] {
        let signals = &self.result.signals;
        [
            ("video_position", "time_sec,value", &signals.video_position),
            (
                "uncalibrated_tracker_position",
                "time_sec,value",
                &signals.uncalibrated_tracker_position,
            ),
            (
                "calibrated_tracker_position",
                "time_sec,value",
                &signals.calibrated_tracker_position,
            ),
            ("correlation", "offset_sec,score", &signals.correlation),
        ]
    }
}

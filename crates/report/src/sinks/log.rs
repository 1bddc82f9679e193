//! LogSink - logs a calibration summary via tracing

use contracts::ContractError;
use tracing::{info, instrument, warn};

use crate::{CalibrationReport, ReportSink, ReportStatus};

/// Sink that logs report summaries
pub struct LogSink {
    name: String,
    written: usize,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
        }
    }

    fn log_summary(&self, report: &CalibrationReport) {
        let result = &report.result;
        let direct = &result.candidates[0];
        let inverted = &result.candidates[1];
        info!(
            sink = %self.name,
            source = %report.source,
            lag_ms = result.tracker_lag_sec * 1000.0,
            calibration_error = result.calibration_error,
            max_calibration_error = result.max_calibration_error,
            best_score = result.best_score,
            metric = result.metric.as_str(),
            sign = ?result.selected_sign,
            direct_lag_ms = direct.lag_sec * 1000.0,
            inverted_lag_ms = inverted.lag_sec * 1000.0,
            "calibration report"
        );
        if report.status == ReportStatus::Suspect {
            warn!(sink = %self.name, "best score failed the threshold, lag is suspect");
        }
        if let Some(stats) = &result.video_stats {
            info!(
                sink = %self.name,
                frames = stats.total_frames,
                accepted = stats.accepted_frames,
                unusable = stats.unusable_frames(),
                "video extraction"
            );
        }
    }
}

impl ReportSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_write", skip(self, report), fields(sink = %self.name))]
    fn write(&mut self, report: &CalibrationReport) -> Result<(), ContractError> {
        self.log_summary(report);
        self.written += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    fn flush(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, reports = self.written, "LogSink flushed");
        Ok(())
    }
}

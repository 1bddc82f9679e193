//! FileSink - writes the report and its signals to disk
//!
//! Layout under `base_path`:
//! - `report.json`
//! - `<signal>.csv` for each diagnostic signal

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, ScalarSignal};
use tracing::{debug, error, instrument};

use crate::{CalibrationReport, ReportError, ReportSink};

const REPORT_FILE: &str = "report.json";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map; `base_path` is required.
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> Result<Self, ReportError> {
        let base_path = params
            .get("base_path")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ReportError::missing_param(name, "base_path"))?;
        Ok(Self { base_path })
    }
}

/// Sink that writes reports to disk files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;
        Ok(Self {
            name: name.into(),
            config,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ReportError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(&name, params)?;
        Ok(Self::new(name, config)?)
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn write_to_disk(&self, report: &CalibrationReport) -> Result<(), ReportError> {
        fs::create_dir_all(&self.config.base_path)?;

        let report_path = self.config.base_path.join(REPORT_FILE);
        let mut writer = BufWriter::new(File::create(&report_path)?);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;

        for (stem, header, signal) in report.signal_tables() {
            let path = self.config.base_path.join(format!("{stem}.csv"));
            write_csv(&path, header, signal)?;
        }
        debug!(sink = %self.name, dir = %self.config.base_path.display(), "report files written");
        Ok(())
    }
}

fn write_csv(path: &Path, header: &str, signal: &ScalarSignal) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{header}")?;
    for (t, v) in signal.iter() {
        writeln!(writer, "{t},{v}")?;
    }
    writer.flush()
}

impl ReportSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_sink_write", skip(self, report), fields(sink = %self.name))]
    fn write(&mut self, report: &CalibrationReport) -> Result<(), ContractError> {
        self.write_to_disk(report).map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_report;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_write() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            base_path: dir.path().join("out"),
        };
        let mut sink = FileSink::new("test_file", config).unwrap();
        let report = sample_report();
        sink.write(&report).unwrap();
        sink.flush().unwrap();

        let json = fs::read_to_string(sink.base_path().join(REPORT_FILE)).unwrap();
        let parsed: CalibrationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.source, "unit-test");
        assert_eq!(parsed.result.candidates, report.result.candidates);

        let csv = fs::read_to_string(sink.base_path().join("correlation.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "offset_sec,score");
        assert_eq!(lines.len(), 4);
        for stem in [
            "video_position",
            "uncalibrated_tracker_position",
            "calibrated_tracker_position",
        ] {
            assert!(sink.base_path().join(format!("{stem}.csv")).exists());
        }
    }

    #[test]
    fn test_from_params() {
        let params = HashMap::from([("base_path".to_string(), "  ".to_string())]);
        assert!(matches!(
            FileSinkConfig::from_params("files", &params),
            Err(ReportError::MissingParam { .. })
        ));
    }
}

//! Error types for CLI operations.

use contracts::CalibrationError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file not found
    #[error("{kind} file not found: {path}")]
    FileNotFound { kind: &'static str, path: String },

    /// Calibration did not produce a result
    #[error("Temporal calibration failed ({code}): {source}")]
    Calibration {
        code: &'static str,
        #[source]
        source: CalibrationError,
    },

    /// Some report sinks failed
    #[error("{failed} of {total} report sinks failed")]
    Publish { failed: usize, total: usize },
}

impl CliError {
    pub fn file_not_found(kind: &'static str, path: &std::path::Path) -> Self {
        Self::FileNotFound {
            kind,
            path: path.display().to_string(),
        }
    }
}

impl From<CalibrationError> for CliError {
    fn from(source: CalibrationError) -> Self {
        Self::Calibration {
            code: source.code().as_str(),
            source,
        }
    }
}

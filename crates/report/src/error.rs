//! Report error types

use thiserror::Error;

/// Errors raised while building or feeding report sinks
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    #[error("sink '{sink_name}' requires parameter '{param}'")]
    MissingParam { sink_name: String, param: String },

    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn missing_param(sink_name: impl Into<String>, param: impl Into<String>) -> Self {
        Self::MissingParam {
            sink_name: sink_name.into(),
            param: param.into(),
        }
    }
}

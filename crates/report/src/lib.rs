//! # Report
//!
//! 标定报告输出：将一次标定结果分发到配置的各个 sink。
//!
//! - `LogSink`：通过 tracing 输出摘要
//! - `FileSink`：`report.json` + 每个诊断信号一个 CSV

mod error;
mod report;
pub mod sinks;

pub use error::ReportError;
pub use report::{CalibrationReport, ReportStatus};
pub use sinks::{FileSink, FileSinkConfig, LogSink};

use contracts::{ContractError, SinkConfig, SinkType};
use tracing::{instrument, warn};

/// Destination of calibration reports
pub trait ReportSink: Send {
    fn name(&self) -> &str;

    fn write(&mut self, report: &CalibrationReport) -> Result<(), ContractError>;

    fn flush(&mut self) -> Result<(), ContractError>;
}

/// Build every configured sink, in configuration order.
pub fn create_sinks(configs: &[SinkConfig]) -> Result<Vec<Box<dyn ReportSink>>, ReportError> {
    configs.iter().map(create_sink).collect()
}

#[instrument(
    name = "report_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink(config: &SinkConfig) -> Result<Box<dyn ReportSink>, ReportError> {
    match config.sink_type {
        SinkType::Log => Ok(Box::new(LogSink::new(&config.name))),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params).map_err(|e| match e {
                ReportError::MissingParam { .. } => e,
                other => ReportError::sink_creation(&config.name, other.to_string()),
            })?;
            Ok(Box::new(sink))
        }
    }
}

/// Write `report` to every sink and flush it.
///
/// A failing sink does not stop the others; the failures are returned.
pub fn publish(
    sinks: &mut [Box<dyn ReportSink>],
    report: &CalibrationReport,
) -> Vec<ContractError> {
    let mut failures = Vec::new();
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.write(report).and_then(|()| sink.flush()) {
            warn!(sink = %sink.name(), error = %e, "report sink failed");
            failures.push(e);
        }
    }
    failures
}

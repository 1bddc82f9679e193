//! 蓝图格式：扩展名识别与 TOML / JSON 编解码

use std::path::Path;

use contracts::{CalibrationBlueprint, ContractError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 扩展名不区分大小写
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    pub(crate) fn of_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "{}: cannot determine config format without an extension",
                path.display()
            ))
        })?;
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// 反序列化，不做校验
    pub fn parse(self, content: &str) -> Result<CalibrationBlueprint, ContractError> {
        let parsed = match self {
            Self::Toml => toml::from_str(content).map_err(boxed),
            Self::Json => serde_json::from_str(content).map_err(boxed),
        };
        parsed.map_err(|e| ContractError::ConfigParse {
            message: format!("{} parse error: {e}", self.name()),
            source: Some(e),
        })
    }

    pub fn render(self, blueprint: &CalibrationBlueprint) -> Result<String, ContractError> {
        let rendered = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(boxed),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(boxed),
        };
        rendered.map_err(|e| ContractError::ConfigParse {
            message: format!("{} serialize error: {e}", self.name()),
            source: Some(e),
        })
    }
}

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

fn boxed(e: impl std::error::Error + Send + Sync + 'static) -> BoxedError {
    Box::new(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AlignmentMetric, Interpolation, PeakPositionMetric, SinkType};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[calibration]
sampling_resolution_sec = 0.002
max_tracker_lag_sec = 1.0

[calibration.video]
peak_position_metric = "peak_start"

[calibration.alignment]
metric = "correlation"
interpolation = "monotone_cubic"

[[sinks]]
name = "log"
sink_type = "log"
"#;
        let bp = ConfigFormat::Toml.parse(content).unwrap();
        assert_eq!(bp.calibration.sampling_resolution_sec, 0.002);
        assert_eq!(bp.calibration.max_tracker_lag_sec, 1.0);
        assert_eq!(
            bp.calibration.video.peak_position_metric,
            PeakPositionMetric::PeakStart
        );
        assert_eq!(bp.calibration.video.number_of_scanlines, 40);
        assert_eq!(bp.calibration.alignment.metric, AlignmentMetric::Correlation);
        assert_eq!(
            bp.calibration.alignment.interpolation,
            Interpolation::MonotoneCubic
        );
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "calibration": { "probe_to_reference_transform_name": "ProbeToTracker" },
            "sinks": [{ "name": "file", "sink_type": "file", "params": { "base_path": "out" } }]
        }"#;
        let result = ConfigFormat::Json.parse(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(
            bp.calibration.probe_to_reference_transform_name,
            "ProbeToTracker"
        );
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = ConfigFormat::Toml.parse(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_metric() {
        let content = r#"
[calibration.alignment]
metric = "mutual_information"
"#;
        assert!(ConfigFormat::Toml.parse(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
        assert!(ConfigFormat::of_path(Path::new("calibration")).is_err());
    }
}

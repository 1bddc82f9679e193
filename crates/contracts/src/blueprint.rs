//! CalibrationBlueprint - Config Loader 输出
//!
//! 描述一次标定运行的完整配置：算法参数与报告输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::TemporalCalibrationConfig;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的标定配置蓝图
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CalibrationBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 标定算法参数
    #[serde(default)]
    #[validate(nested)]
    pub calibration: TemporalCalibrationConfig,

    /// 报告输出路由
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Sink 输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 类型特定参数 (file: base_path)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    pub fn log(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: SinkType::Log,
            params: HashMap::new(),
        }
    }

    pub fn file(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: SinkType::File,
            params: HashMap::from([("base_path".to_string(), base_path.into())]),
        }
    }
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON 报告 + CSV 信号)
    File,
}

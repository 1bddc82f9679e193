//! # Config Loader
//!
//! 读取标定蓝图 (`CalibrationBlueprint`)：按扩展名选择 TOML 或 JSON，
//! 反序列化后统一校验，只有校验通过的蓝图会交给调用方。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("calibration.toml")).unwrap();
//! println!("Max lag: {} s", blueprint.calibration.max_tracker_lag_sec);
//! ```

mod parser;
mod validator;

pub use contracts::CalibrationBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// 蓝图加载入口
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从文件加载，格式由扩展名 (.toml / .json) 决定
    pub fn load_from_path(path: &Path) -> Result<CalibrationBlueprint, ContractError> {
        let format = ConfigFormat::of_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// 解析并校验
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CalibrationBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// 校验已构造的蓝图
    pub fn validate(blueprint: &CalibrationBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &CalibrationBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.render(blueprint)
    }

    pub fn to_json(blueprint: &CalibrationBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.render(blueprint)
    }
}

//! 配置校验模块
//!
//! 校验规则：
//! - 数值范围 (由 `validator` derive 声明在配置结构体上)
//! - minimum_valid_scanlines <= number_of_scanlines
//! - 变换名称符合 `<From>To<To>` 格式
//! - 保存中间图像时必须指定输出目录
//! - sink 名称非空且唯一，file sink 必须指定 base_path

use std::collections::HashSet;

use contracts::{CalibrationBlueprint, ContractError, SinkType, TransformName};
use validator::Validate;

/// 校验 CalibrationBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &CalibrationBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_scanlines(blueprint)?;
    validate_transform_name(blueprint)?;
    validate_diagnostics(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验数值范围
fn validate_ranges(blueprint: &CalibrationBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("calibration", e.to_string()))
}

/// 校验扫描线数量
fn validate_scanlines(blueprint: &CalibrationBlueprint) -> Result<(), ContractError> {
    let video = &blueprint.calibration.video;
    if video.minimum_valid_scanlines > video.number_of_scanlines {
        return Err(ContractError::config_validation(
            "calibration.video.minimum_valid_scanlines",
            format!(
                "minimum_valid_scanlines ({}) must be <= number_of_scanlines ({})",
                video.minimum_valid_scanlines, video.number_of_scanlines
            ),
        ));
    }
    Ok(())
}

/// 校验变换名称
fn validate_transform_name(blueprint: &CalibrationBlueprint) -> Result<(), ContractError> {
    let name = &blueprint.calibration.probe_to_reference_transform_name;
    name.parse::<TransformName>().map(|_| ()).map_err(|e| {
        ContractError::config_validation(
            "calibration.probe_to_reference_transform_name",
            e.to_string(),
        )
    })
}

/// 校验诊断输出
fn validate_diagnostics(blueprint: &CalibrationBlueprint) -> Result<(), ContractError> {
    let diagnostics = &blueprint.calibration.diagnostics;
    if diagnostics.save_intermediate_images && diagnostics.output_directory.is_none() {
        return Err(ContractError::config_validation(
            "calibration.diagnostics.output_directory",
            "output_directory is required when save_intermediate_images is enabled",
        ));
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &CalibrationBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("base_path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.base_path", sink.name),
                "file sink requires base_path",
            ));
        }
    }
    Ok(())
}

//! TrackerSequence - 跟踪器变换序列
//!
//! 每一帧包含若干命名的刚体变换 (例如 `ProbeToTracker`)。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 变换名称解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformNameError {
    #[error("transform name is empty")]
    Empty,

    #[error("'{0}' has no '<From>To<To>' separator")]
    MissingSeparator(String),

    #[error("'{0}' is ambiguous, more than one 'To' separator")]
    Ambiguous(String),

    #[error("'{name}': coordinate frame '{frame}' must start with an upper-case letter")]
    InvalidFrameName { name: String, frame: String },
}

/// 变换名称 `<From>To<To>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformName {
    from: String,
    to: String,
}

impl TransformName {
    /// 由两个坐标系名称构造
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self, TransformNameError> {
        let from = from.into();
        let to = to.into();
        let name = format!("{from}To{to}");
        for frame in [&from, &to] {
            if !frame.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                return Err(TransformNameError::InvalidFrameName {
                    name,
                    frame: frame.clone(),
                });
            }
        }
        Ok(Self { from, to })
    }

    pub fn from_frame(&self) -> &str {
        &self.from
    }

    pub fn to_frame(&self) -> &str {
        &self.to
    }

    /// 反向变换的名称
    pub fn inverted(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl FromStr for TransformName {
    type Err = TransformNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TransformNameError::Empty);
        }

        // A separator is a "To" that is followed by an upper-case letter.
        let bytes = s.as_bytes();
        let separators: Vec<usize> = s
            .match_indices("To")
            .map(|(idx, _)| idx)
            .filter(|&idx| idx > 0)
            .filter(|&idx| bytes.get(idx + 2).is_some_and(|b| b.is_ascii_uppercase()))
            .collect();

        match separators.as_slice() {
            [] => Err(TransformNameError::MissingSeparator(s.to_string())),
            [idx] => Self::new(&s[..*idx], &s[idx + 2..]),
            _ => Err(TransformNameError::Ambiguous(s.to_string())),
        }
    }
}

impl fmt::Display for TransformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}To{}", self.from, self.to)
    }
}

impl Serialize for TransformName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransformName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 4x4 齐次刚体变换 (行优先, 平移单位 mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub matrix: [[f64; 4]; 4],
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        matrix: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// 纯平移变换
    pub fn from_translation(translation: [f64; 3]) -> Self {
        let mut transform = Self::IDENTITY;
        for (row, value) in translation.iter().enumerate() {
            transform.matrix[row][3] = *value;
        }
        transform
    }

    /// 平移分量 (第 4 列)
    pub fn translation(&self) -> [f64; 3] {
        [self.matrix[0][3], self.matrix[1][3], self.matrix[2][3]]
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 变换状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStatus {
    #[default]
    Ok,
    /// 跟踪器报告无效 (例如标记被遮挡)
    Invalid,
    /// 本帧缺失
    Missing,
}

/// 命名变换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTransform {
    pub name: TransformName,
    pub transform: RigidTransform,
    #[serde(default)]
    pub status: TransformStatus,
}

impl NamedTransform {
    pub fn new(name: TransformName, transform: RigidTransform) -> Self {
        Self {
            name,
            transform,
            status: TransformStatus::Ok,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == TransformStatus::Ok
    }
}

/// 跟踪器帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerFrame {
    /// 时间戳 (seconds), 与视频同一时钟域
    pub timestamp: f64,

    /// 本帧的全部命名变换
    pub transforms: Vec<NamedTransform>,
}

/// 跟踪器帧序列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerSequence {
    pub frames: Vec<TrackerFrame>,
}

impl TrackerSequence {
    pub fn new(frames: Vec<TrackerFrame>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transform_name() {
        let name: TransformName = "ProbeToReference".parse().unwrap();
        assert_eq!(name.from_frame(), "Probe");
        assert_eq!(name.to_frame(), "Reference");
        assert_eq!(name.to_string(), "ProbeToReference");
        assert_eq!(name.inverted().to_string(), "ReferenceToProbe");
    }

    #[test]
    fn test_parse_transform_name_with_to_inside_frame() {
        let name: TransformName = "ToolToTracker".parse().unwrap();
        assert_eq!(name.from_frame(), "Tool");
        assert_eq!(name.to_frame(), "Tracker");
    }

    #[test]
    fn test_parse_invalid_transform_names() {
        assert_eq!("".parse::<TransformName>(), Err(TransformNameError::Empty));
        assert!(matches!(
            "Probe".parse::<TransformName>(),
            Err(TransformNameError::MissingSeparator(_))
        ));
        assert!(matches!(
            "ProbeToReferenceToTracker".parse::<TransformName>(),
            Err(TransformNameError::Ambiguous(_))
        ));
        assert!(matches!(
            "ToReference".parse::<TransformName>(),
            Err(TransformNameError::MissingSeparator(_))
        ));
    }

    #[test]
    fn test_transform_name_serde() {
        let name: TransformName = "ProbeToTracker".parse().unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"ProbeToTracker\"");
        let back: TransformName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_translation() {
        let t = RigidTransform::from_translation([1.0, 2.0, 3.0]);
        assert_eq!(t.translation(), [1.0, 2.0, 3.0]);
    }
}

//! VideoSequence - 超声视频帧序列
//!
//! 单通道强度图像 + 时间戳 + 有效性标记。引擎只读，不修改调用方的数据。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 超声图像方向
///
/// 第一个字母：标记侧 (M = marked, 左侧) / 非标记侧 (U)；
/// 第二个字母：远场在图像底部 (F) / 近场在底部 (N)。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageOrientation {
    #[default]
    MF,
    MN,
    UF,
    UN,
}

/// 图像数据类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    /// B 模式亮度图像
    #[default]
    Brightness,
    /// RF 实数数据
    RfReal,
    /// RF IQ，按行排列
    RfIqLine,
    /// RF IQ，交替排列
    RfIqAlternating,
}

/// 帧状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    #[default]
    Ok,
    Invalid,
}

/// 单通道 8 位强度图像，按行存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityImage {
    /// 图像宽度 (列数)
    pub width: u32,

    /// 图像高度 (行数)
    pub height: u32,

    /// 像素数据 (零拷贝), 长度 = width * height
    pub pixels: Bytes,
}

impl IntensityImage {
    pub fn new(width: u32, height: u32, pixels: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// 全黑图像
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0u8; width as usize * height as usize])
    }

    /// 像素缓冲区长度是否与尺寸一致
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize
    }

    /// 读取 (x, y) 处的强度，越界返回 None
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// 第 x 列的强度剖面 (每行一个值)
    pub fn column_profile(&self, x: u32) -> Vec<u8> {
        (0..self.height).filter_map(|y| self.get(x, y)).collect()
    }
}

/// 带时间戳的视频帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFrame {
    /// 采集时间戳 (seconds)
    pub timestamp: f64,

    /// 帧状态
    #[serde(default)]
    pub status: FrameStatus,

    /// 图像
    pub image: IntensityImage,
}

impl VideoFrame {
    pub fn is_valid(&self) -> bool {
        self.status == FrameStatus::Ok
    }
}

/// 视频帧序列
///
/// 时间戳单调不减，但不要求等间隔。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSequence {
    /// 序列的图像方向
    #[serde(default)]
    pub orientation: ImageOrientation,

    /// 序列的图像类型
    #[serde(default)]
    pub image_type: ImageType,

    /// 帧列表
    pub frames: Vec<VideoFrame>,
}

impl VideoSequence {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            orientation: ImageOrientation::default(),
            image_type: ImageType::default(),
            frames,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 首尾时间戳
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((self.frames.first()?.timestamp, self.frames.last()?.timestamp))
    }
}

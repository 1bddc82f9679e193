//! CalibrationResult - 标定输出
//!
//! 一次成功 `update()` 的不可变产物。

use serde::{Deserialize, Serialize};

use crate::{AlignmentMetric, NormalizationMethod, ScalarSignal};

/// 跟踪器信号的符号约定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// 原始符号 (候选 1)
    #[default]
    Direct,
    /// 取反后的跟踪器信号 (候选 2)
    Inverted,
}

/// 某一符号约定下的最佳延迟
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagCandidate {
    pub sign: SignConvention,
    /// 最佳延迟 (seconds)
    pub lag_sec: f64,
    /// 对应的最佳得分
    pub score: f64,
}

/// 视频位置指标提取统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoExtractionStats {
    /// 输入帧数
    pub total_frames: usize,
    /// 产生指标值的帧数
    pub accepted_frames: usize,
    /// 状态无效的帧数
    pub invalid_frames: usize,
    /// 有效扫描线不足的帧数
    pub too_few_scanlines: usize,
    /// 直线拟合失败的帧数
    pub line_fit_failures: usize,
    /// 拟合直线接近竖直的帧数
    pub near_vertical_lines: usize,
    /// 时间戳重复的帧数
    pub duplicate_timestamps: usize,
    /// 最长连续不可用帧数
    pub max_consecutive_unusable: usize,
}

impl VideoExtractionStats {
    /// 不可用帧数 (无效或检测失败)
    pub fn unusable_frames(&self) -> usize {
        self.invalid_frames + self.too_few_scanlines + self.line_fit_failures + self.near_vertical_lines
    }

    /// 不可用帧比例
    pub fn unusable_fraction(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.unusable_frames() as f64 / self.total_frames as f64
        }
    }
}

/// 诊断用信号
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSignals {
    /// 归一化后的滑动视频信号
    pub video_position: ScalarSignal,
    /// 归一化的跟踪器信号，原始时间戳
    pub uncalibrated_tracker_position: ScalarSignal,
    /// 归一化的跟踪器信号，时间戳减去延迟
    pub calibrated_tracker_position: ScalarSignal,
    /// 得分 vs 偏移
    pub correlation: ScalarSignal,
}

/// 标定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// 跟踪器延迟 (seconds)，正值表示跟踪器数据晚于视频
    pub tracker_lag_sec: f64,

    /// 最佳对齐得分
    pub best_score: f64,

    /// 最佳偏移处跟踪器信号的归一化系数
    pub normalization_factor: f64,

    /// RMS 标定误差 (信号物理单位)
    pub calibration_error: f64,

    /// 最大逐点误差
    pub max_calibration_error: f64,

    /// 使用的对齐指标
    pub metric: AlignmentMetric,

    /// 使用的归一化方法
    pub normalization: NormalizationMethod,

    /// 被选中的符号约定
    pub selected_sign: SignConvention,

    /// 两种符号约定的候选
    pub candidates: [LagCandidate; 2],

    /// 得分低于阈值，结果可疑
    pub above_threshold: bool,

    /// 跟踪器运动主轴 (单位向量)，仅在使用跟踪器帧时存在
    pub principal_axis: Option<[f64; 3]>,

    /// 视频提取统计，仅在使用视频帧时存在
    pub video_stats: Option<VideoExtractionStats>,

    /// 诊断信号
    pub signals: CalibrationSignals,
}

impl CalibrationResult {
    /// 指定符号约定的候选
    pub fn candidate(&self, sign: SignConvention) -> &LagCandidate {
        match sign {
            SignConvention::Direct => &self.candidates[0],
            SignConvention::Inverted => &self.candidates[1],
        }
    }
}

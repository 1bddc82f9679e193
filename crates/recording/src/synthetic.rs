//! 合成录制
//!
//! 视频：一条水平高亮反射带，深度按 `depth + A * sin(2πft)` 运动。
//! 跟踪器：探头与参考物在跟踪器坐标系下的位姿，探头相对参考物沿运动轴
//! 位移 `A * mm_per_px * sin(2πf(t - lag))`，即跟踪器数据比视频晚 `lag` 秒。

use std::f64::consts::PI;

use contracts::{
    ContractError, FrameStatus, IntensityImage, NamedTransform, RigidTransform, TrackerFrame,
    TrackerSequence, TransformName, VideoFrame, VideoSequence,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::Recording;

/// 背景灰度
const BACKGROUND: f64 = 10.0;
/// 反射带峰值高出背景的灰度
const BAND_PEAK: f64 = 200.0;
/// 反射带半宽 (px)
const BAND_HALF_WIDTH_PX: f64 = 2.0;
/// 参考物在跟踪器坐标系下的固定位置 (mm)
const REFERENCE_POSITION: [f64; 3] = [120.0, -40.0, 850.0];

/// 合成录制配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SyntheticRecordingConfig {
    /// 时长 (seconds)
    #[validate(range(exclusive_min = 0.0))]
    pub duration_sec: f64,

    /// 视频帧率 (Hz)
    #[validate(range(exclusive_min = 0.0))]
    pub video_fps: f64,

    /// 跟踪器采样率 (Hz)
    #[validate(range(exclusive_min = 0.0))]
    pub tracker_rate_hz: f64,

    #[validate(range(min = 1))]
    pub image_width: u32,

    #[validate(range(min = 1))]
    pub image_height: u32,

    /// 反射带平均深度 (px)
    pub line_depth_px: f64,

    /// 运动幅度 (px)
    #[validate(range(min = 0.0))]
    pub amplitude_px: f64,

    /// 运动频率 (Hz)
    #[validate(range(exclusive_min = 0.0))]
    pub frequency_hz: f64,

    /// 像素尺寸 (mm/px)
    #[validate(range(exclusive_min = 0.0))]
    pub mm_per_px: f64,

    /// 运动方向 (跟踪器坐标系，无需归一化)
    pub motion_axis: [f64; 3],

    /// 跟踪器相对视频的延迟 (seconds)
    pub tracker_lag_sec: f64,

    /// 像素均匀噪声幅度 (灰度)
    #[validate(range(min = 0.0))]
    pub pixel_noise: f64,

    /// 位置均匀噪声幅度 (mm)
    #[validate(range(min = 0.0))]
    pub position_noise_mm: f64,

    /// 每隔多少帧插入一帧无效帧
    #[validate(range(min = 2))]
    pub invalid_frame_period: Option<usize>,

    /// 随机种子
    pub seed: u64,
}

impl Default for SyntheticRecordingConfig {
    fn default() -> Self {
        Self {
            duration_sec: 10.0,
            video_fps: 25.0,
            tracker_rate_hz: 60.0,
            image_width: 128,
            image_height: 128,
            line_depth_px: 64.0,
            amplitude_px: 20.0,
            frequency_hz: 0.4,
            mm_per_px: 0.2,
            motion_axis: [0.0, 0.0, 1.0],
            tracker_lag_sec: 0.0,
            pixel_noise: 0.0,
            position_noise_mm: 0.0,
            invalid_frame_period: None,
            seed: 42,
        }
    }
}

impl SyntheticRecordingConfig {
    /// 视频深度 (px)
    pub fn depth_at(&self, t: f64) -> f64 {
        self.line_depth_px + self.amplitude_px * (2.0 * PI * self.frequency_hz * t).sin()
    }

    /// 探头相对参考物沿运动轴的位移 (mm)
    pub fn displacement_at(&self, t: f64) -> f64 {
        let phase = 2.0 * PI * self.frequency_hz * (t - self.tracker_lag_sec);
        self.amplitude_px * self.mm_per_px * phase.sin()
    }

    fn unit_axis(&self) -> Result<[f64; 3], ContractError> {
        let [x, y, z] = self.motion_axis;
        let norm = (x * x + y * y + z * z).sqrt();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(ContractError::config_validation(
                "motion_axis",
                "motion axis must be a non-zero vector",
            ));
        }
        Ok([x / norm, y / norm, z / norm])
    }
}

/// 生成合成录制，同一配置 (含种子) 生成的结果完全一致。
pub fn generate(config: &SyntheticRecordingConfig) -> Result<Recording, ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("synthetic", e.to_string()))?;
    let axis = config.unit_axis()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let video = generate_video(config, &mut rng);
    let tracker = generate_tracker(config, axis, &mut rng)?;
    debug!(
        video_frames = video.len(),
        tracker_frames = tracker.len(),
        lag_sec = config.tracker_lag_sec,
        "synthetic recording generated"
    );
    Ok(Recording { video, tracker })
}

fn sample_times(duration_sec: f64, rate_hz: f64) -> impl Iterator<Item = f64> {
    let count = (duration_sec * rate_hz).floor() as usize + 1;
    (0..count).map(move |i| i as f64 / rate_hz)
}

fn uniform(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.random_range(-amplitude..=amplitude)
    } else {
        0.0
    }
}

fn generate_video(config: &SyntheticRecordingConfig, rng: &mut StdRng) -> VideoSequence {
    let frames = sample_times(config.duration_sec, config.video_fps)
        .enumerate()
        .map(|(index, t)| {
            let status = match config.invalid_frame_period {
                Some(period) if index % period == period - 1 => FrameStatus::Invalid,
                _ => FrameStatus::Ok,
            };
            VideoFrame {
                timestamp: t,
                status,
                image: render_band(config, config.depth_at(t), rng),
            }
        })
        .collect();
    VideoSequence::new(frames)
}

/// 高斯剖面的水平反射带
fn render_band(config: &SyntheticRecordingConfig, depth: f64, rng: &mut StdRng) -> IntensityImage {
    let (width, height) = (config.image_width, config.image_height);
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let d = (f64::from(y) - depth) / BAND_HALF_WIDTH_PX;
        let row = BACKGROUND + BAND_PEAK * (-d * d).exp();
        for _ in 0..width {
            let v = row + uniform(rng, config.pixel_noise);
            pixels.push(v.round().clamp(0.0, 255.0) as u8);
        }
    }
    IntensityImage::new(width, height, pixels)
}

fn generate_tracker(
    config: &SyntheticRecordingConfig,
    axis: [f64; 3],
    rng: &mut StdRng,
) -> Result<TrackerSequence, ContractError> {
    let probe = TransformName::new("Probe", "Tracker")
        .map_err(|e| ContractError::config_validation("synthetic", e.to_string()))?;
    let reference = TransformName::new("Reference", "Tracker")
        .map_err(|e| ContractError::config_validation("synthetic", e.to_string()))?;

    let frames = sample_times(config.duration_sec, config.tracker_rate_hz)
        .map(|t| {
            let d = config.displacement_at(t);
            let mut position = REFERENCE_POSITION;
            for (p, a) in position.iter_mut().zip(axis) {
                *p += a * d + uniform(rng, config.position_noise_mm);
            }
            TrackerFrame {
                timestamp: t,
                transforms: vec![
                    NamedTransform::new(probe.clone(), RigidTransform::from_translation(position)),
                    NamedTransform::new(
                        reference.clone(),
                        RigidTransform::from_translation(REFERENCE_POSITION),
                    ),
                ],
            }
        })
        .collect();
    Ok(TrackerSequence::new(frames))
}

//! # Temporal Calibration
//!
//! 超声视频与跟踪器之间的时间延迟标定。
//!
//! 流程：
//! - 视频帧 → 反射线深度信号 (`video_metric`)
//! - 跟踪器变换 → 主轴投影信号 (`tracker_metric`)
//! - 两个信号在延迟窗口内滑动比对，取两种符号约定中绝对值较小的延迟 (`aligner`)
//!
//! ## 使用示例
//!
//! ```
//! use contracts::ScalarSignal;
//! use temporal_calibration::TemporalCalibration;
//!
//! let values = vec![0.0, 1.0, 0.0, -1.0, 0.0];
//! let video = ScalarSignal::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], values.clone()).unwrap();
//! let tracker = ScalarSignal::new(vec![0.05, 0.15, 0.25, 0.35, 0.45], values).unwrap();
//!
//! let mut engine = TemporalCalibration::default();
//! engine.set_video_position_signal(video);
//! engine.set_tracker_position_signal(tracker);
//! engine.set_sampling_resolution_sec(0.01);
//! engine.set_maximum_video_tracker_lag_sec(0.2);
//!
//! let result = engine.update().unwrap();
//! assert!((result.tracker_lag_sec - 0.05).abs() < 0.01);
//! ```

pub mod aligner;
pub mod debug_images;
mod engine;
pub mod interpolation;
pub mod line_fit;
pub mod peak;
pub mod tracker_metric;
pub mod transform_repository;
pub mod video_metric;

pub use aligner::{lag_steps, normalize, Alignment, SignalAligner, SignalScore};
pub use engine::TemporalCalibration;
pub use line_fit::{LineFit, LineFitter, LineModel, RansacLineFitter};
pub use peak::PeakLocator;
pub use transform_repository::TransformRepository;

// Re-export contracts types
pub use contracts::{
    CalibrationError, CalibrationResult, LabeledSignal, ScalarSignal, TemporalCalibrationConfig,
    TrackerSequence, VideoSequence,
};

//! # Recording
//!
//! 录制文件：一段视频帧序列与对应的跟踪器帧序列。
//!
//! - `.bin`：bincode，体积小，用于大批量帧
//! - `.json`：serde_json，便于人工检查
//!
//! `synthetic` 模块生成已知延迟的合成录制，用于端到端验证。

pub mod synthetic;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use contracts::{ContractError, TrackerSequence, VideoSequence};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use synthetic::{generate, SyntheticRecordingConfig};

/// 一次录制
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub video: VideoSequence,
    pub tracker: TrackerSequence,
}

/// 录制文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingFormat {
    Bincode,
    Json,
}

impl RecordingFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" => Some(Self::Bincode),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn of_path(path: &Path) -> Result<Self, ContractError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                ContractError::recording(
                    path.display().to_string(),
                    "unsupported recording format, expected .bin or .json",
                )
            })
    }
}

/// 录制文件读写
pub struct RecordingStore;

impl RecordingStore {
    /// Load a recording; the format follows the file extension.
    pub fn load(path: &Path) -> Result<Recording, ContractError> {
        let format = RecordingFormat::of_path(path)?;
        let reader = BufReader::new(File::open(path)?);
        let recording: Recording = match format {
            RecordingFormat::Bincode => bincode::deserialize_from(reader)
                .map_err(|e| ContractError::recording(path.display().to_string(), e.to_string()))?,
            RecordingFormat::Json => serde_json::from_reader(reader)
                .map_err(|e| ContractError::recording(path.display().to_string(), e.to_string()))?,
        };
        info!(
            path = %path.display(),
            video_frames = recording.video.len(),
            tracker_frames = recording.tracker.len(),
            "recording loaded"
        );
        Ok(recording)
    }

    /// Save a recording; parent directories are created when missing.
    pub fn save(path: &Path, recording: &Recording) -> Result<(), ContractError> {
        let format = RecordingFormat::of_path(path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            RecordingFormat::Bincode => bincode::serialize_into(&mut writer, recording)
                .map_err(|e| ContractError::recording(path.display().to_string(), e.to_string()))?,
            RecordingFormat::Json => serde_json::to_writer(&mut writer, recording)
                .map_err(|e| ContractError::recording(path.display().to_string(), e.to_string()))?,
        }
        writer.flush()?;
        debug!(path = %path.display(), ?format, "recording saved");
        Ok(())
    }
}

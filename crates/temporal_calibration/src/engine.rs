//! Temporal calibration engine.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    CalibrationError, CalibrationResult, CalibrationSignals, ImageOrientation, ImageType,
    LabeledSignal, ScalarSignal, TemporalCalibrationConfig, TrackerSequence, TransformName,
    VideoExtractionStats, VideoSequence, MINIMUM_SAMPLING_RESOLUTION_SEC,
};
use tracing::{debug, info, instrument, warn};

use crate::aligner::SignalAligner;
use crate::debug_images::IntermediateImageWriter;
use crate::line_fit::{LineFitter, RansacLineFitter};
use crate::tracker_metric::{resolve_positions, TrackerPositionExtractor};
use crate::video_metric::VideoPositionExtractor;

const TIME_LABEL: &str = "Time [s]";
const OFFSET_LABEL: &str = "Tracker offset [s]";

/// Video input: raw frames or an already extracted position signal
#[derive(Debug, Clone)]
enum VideoInput {
    Frames(Arc<VideoSequence>),
    PositionSignal(ScalarSignal),
}

/// Tracker input: raw transforms or an already extracted position signal
#[derive(Debug, Clone)]
enum TrackerInput {
    Frames(Arc<TrackerSequence>),
    PositionSignal(ScalarSignal),
}

/// Estimates the time offset between a video stream and a tracker stream
///
/// Inputs and settings are set through the setters, then [`update`] runs the
/// whole pipeline. The last published result stays available through the
/// accessors until the next `update()`.
///
/// [`update`]: TemporalCalibration::update
pub struct TemporalCalibration {
    config: TemporalCalibrationConfig,
    line_fitter: Box<dyn LineFitter>,
    video: Option<VideoInput>,
    tracker: Option<TrackerInput>,
    result: Option<CalibrationResult>,
}

impl fmt::Debug for TemporalCalibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporalCalibration")
            .field("config", &self.config)
            .field("video", &self.video.as_ref().map(VideoInput::describe))
            .field("tracker", &self.tracker.as_ref().map(TrackerInput::describe))
            .field("has_result", &self.result.is_some())
            .finish()
    }
}

impl VideoInput {
    fn describe(&self) -> String {
        match self {
            Self::Frames(seq) => format!("{} frames", seq.len()),
            Self::PositionSignal(s) => format!("{} signal samples", s.len()),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Frames(seq) => seq.is_empty(),
            Self::PositionSignal(s) => s.is_empty(),
        }
    }
}

impl TrackerInput {
    fn describe(&self) -> String {
        match self {
            Self::Frames(seq) => format!("{} frames", seq.len()),
            Self::PositionSignal(s) => format!("{} signal samples", s.len()),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Frames(seq) => seq.is_empty(),
            Self::PositionSignal(s) => s.is_empty(),
        }
    }
}

impl Default for TemporalCalibration {
    fn default() -> Self {
        Self::new(TemporalCalibrationConfig::default())
    }
}

impl TemporalCalibration {
    pub fn new(config: TemporalCalibrationConfig) -> Self {
        let line_fitter = Box::new(RansacLineFitter::new(config.video.line_fit.clone()));
        Self {
            config,
            line_fitter,
            video: None,
            tracker: None,
            result: None,
        }
    }

    /// Replace the default RANSAC line fitter
    pub fn with_line_fitter(mut self, fitter: Box<dyn LineFitter>) -> Self {
        self.line_fitter = fitter;
        self
    }

    pub fn config(&self) -> &TemporalCalibrationConfig {
        &self.config
    }

    // ---- inputs ----

    pub fn set_video_frames(&mut self, frames: Arc<VideoSequence>) {
        self.video = Some(VideoInput::Frames(frames));
    }

    /// Use a precomputed video position signal instead of frames
    pub fn set_video_position_signal(&mut self, signal: ScalarSignal) {
        self.video = Some(VideoInput::PositionSignal(signal));
    }

    pub fn set_tracker_frames(&mut self, frames: Arc<TrackerSequence>) {
        self.tracker = Some(TrackerInput::Frames(frames));
    }

    /// Use a precomputed tracker position signal instead of frames
    pub fn set_tracker_position_signal(&mut self, signal: ScalarSignal) {
        self.tracker = Some(TrackerInput::PositionSignal(signal));
    }

    // ---- settings ----

    pub fn set_sampling_resolution_sec(&mut self, resolution_sec: f64) {
        self.config.sampling_resolution_sec = resolution_sec;
    }

    pub fn set_maximum_video_tracker_lag_sec(&mut self, max_lag_sec: f64) {
        self.config.max_tracker_lag_sec = max_lag_sec;
    }

    pub fn set_probe_to_reference_transform_name(&mut self, name: impl Into<String>) {
        self.config.probe_to_reference_transform_name = name.into();
    }

    pub fn set_save_intermediate_images(&mut self, enabled: bool) {
        self.config.diagnostics.save_intermediate_images = enabled;
    }

    pub fn set_intermediate_files_output_directory(&mut self, dir: impl Into<PathBuf>) {
        self.config.diagnostics.output_directory = Some(dir.into());
    }

    // ---- computation ----

    /// Run the calibration.
    ///
    /// On success the new result is published and returned. A failure clears
    /// any previous result, except `ResultAboveThreshold`: that result is
    /// published but flagged as suspect.
    #[instrument(name = "temporal_calibration_update", skip(self))]
    pub fn update(&mut self) -> Result<&CalibrationResult, CalibrationError> {
        let started = Instant::now();
        self.result = None;

        let outcome = self.compute();
        metrics::histogram!("tcal_update_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                metrics::counter!("tcal_updates_total", "status" => e.code().as_str()).increment(1);
                warn!(error = %e, "temporal calibration failed");
                return Err(e);
            }
        };

        metrics::gauge!("tcal_tracker_lag_ms").set(result.tracker_lag_sec * 1000.0);
        metrics::gauge!("tcal_calibration_error").set(result.calibration_error);

        let threshold_error = self.threshold_error(&result);
        let status = if threshold_error.is_some() {
            "above_threshold"
        } else {
            "ok"
        };
        metrics::counter!("tcal_updates_total", "status" => status).increment(1);
        info!(
            lag_sec = result.tracker_lag_sec,
            calibration_error = result.calibration_error,
            max_calibration_error = result.max_calibration_error,
            status,
            "temporal calibration finished"
        );

        let published: &CalibrationResult = self.result.insert(result);
        match threshold_error {
            Some(e) => Err(e),
            None => Ok(published),
        }
    }

    fn threshold_error(&self, result: &CalibrationResult) -> Option<CalibrationError> {
        if !result.above_threshold {
            return None;
        }
        let threshold = self.config.alignment.thresholds.for_metric(result.metric)?;
        warn!(
            score = result.best_score,
            threshold,
            lag_sec = result.tracker_lag_sec,
            "best alignment score fails the threshold, result is suspect"
        );
        Some(CalibrationError::ResultAboveThreshold {
            score: result.best_score,
            threshold,
            lag_sec: result.tracker_lag_sec,
        })
    }

    fn compute(&self) -> Result<CalibrationResult, CalibrationError> {
        let video = self.video.as_ref().ok_or(CalibrationError::NoVideoData)?;
        let tracker = self.tracker.as_ref().ok_or(CalibrationError::NoTrackerData)?;
        if let VideoInput::Frames(sequence) = video {
            check_video_format(sequence)?;
        }
        if video.is_empty() {
            return Err(CalibrationError::EmptyVideoData);
        }
        if tracker.is_empty() {
            return Err(CalibrationError::EmptyTrackerData);
        }

        let resolution = self.config.sampling_resolution_sec;
        if !resolution.is_finite() || resolution < MINIMUM_SAMPLING_RESOLUTION_SEC {
            return Err(CalibrationError::ResolutionTooSmall {
                requested: resolution,
                minimum: MINIMUM_SAMPLING_RESOLUTION_SEC,
            });
        }

        let max_lag = self.config.max_tracker_lag_sec;
        let (tracker_signal, principal_axis) = match tracker {
            TrackerInput::Frames(sequence) => {
                let name = self.parse_transform_name()?;
                let positions = resolve_positions(sequence, &name);
                if positions.is_empty() {
                    return Err(CalibrationError::invalid_transform_name(
                        name.to_string(),
                        "no tracker frame resolves the transform",
                    ));
                }
                let (video_min, video_max) = video_time_range(video)?;
                let tracker_min = positions.first().map_or(f64::NAN, |p| p.timestamp);
                let tracker_max = positions.last().map_or(f64::NAN, |p| p.timestamp);
                let common_min = video_min.max(tracker_min);
                let common_max = video_max.min(tracker_max);
                let window = (common_min + max_lag, common_max - max_lag);
                let overlaps = window.0 < window.1;
                if !overlaps {
                    return Err(CalibrationError::InsufficientOverlap {
                        common_min,
                        common_max,
                        max_lag,
                    });
                }
                debug!(common_min, common_max, "tracker window");
                let extraction = TrackerPositionExtractor.extract(&positions, window)?;
                let axis = extraction.principal_axis;
                (extraction.signal, Some([axis.x, axis.y, axis.z]))
            }
            TrackerInput::PositionSignal(signal) => (signal.clone(), None),
        };

        let (video_signal, video_stats) = match video {
            VideoInput::Frames(sequence) => {
                let extraction = self.extract_video(sequence);
                (extraction.signal, Some(extraction.stats))
            }
            VideoInput::PositionSignal(signal) => (signal.clone(), None),
        };

        let alignment = SignalAligner::new(&self.config.alignment, resolution, max_lag)
            .align(&video_signal, &tracker_signal)?;

        let metric = self.config.alignment.metric;
        let above_threshold = self
            .config
            .alignment
            .thresholds
            .for_metric(metric)
            .is_some_and(|threshold| alignment.best_score <= threshold);

        Ok(CalibrationResult {
            tracker_lag_sec: alignment.tracker_lag_sec,
            best_score: alignment.best_score,
            normalization_factor: alignment.normalization_factor,
            calibration_error: alignment.calibration_error,
            max_calibration_error: alignment.max_calibration_error,
            metric,
            normalization: self.config.alignment.normalization,
            selected_sign: alignment.selected_sign,
            candidates: alignment.candidates,
            above_threshold,
            principal_axis,
            video_stats,
            signals: CalibrationSignals {
                video_position: alignment.video_signal,
                uncalibrated_tracker_position: alignment.uncalibrated_tracker_signal,
                calibrated_tracker_position: alignment.calibrated_tracker_signal,
                correlation: alignment.correlation_signal,
            },
        })
    }

    fn parse_transform_name(&self) -> Result<TransformName, CalibrationError> {
        let raw = &self.config.probe_to_reference_transform_name;
        raw.parse()
            .map_err(|e: contracts::TransformNameError| {
                CalibrationError::invalid_transform_name(raw.clone(), e.to_string())
            })
    }

    fn extract_video(&self, sequence: &VideoSequence) -> crate::video_metric::VideoExtraction {
        let mut writer = self.intermediate_image_writer();
        VideoPositionExtractor::new(&self.config.video, self.line_fitter.as_ref())
            .extract(sequence, writer.as_mut())
    }

    fn intermediate_image_writer(&self) -> Option<IntermediateImageWriter> {
        let diagnostics = &self.config.diagnostics;
        if !diagnostics.save_intermediate_images {
            return None;
        }
        match &diagnostics.output_directory {
            Some(dir) => IntermediateImageWriter::new(dir),
            None => {
                warn!("intermediate images requested without an output directory, skipped");
                None
            }
        }
    }

    // ---- results ----

    /// The published result
    pub fn result(&self) -> Result<&CalibrationResult, CalibrationError> {
        self.result.as_ref().ok_or(CalibrationError::NotYetComputed)
    }

    pub fn tracker_lag_sec(&self) -> Result<f64, CalibrationError> {
        self.result().map(|r| r.tracker_lag_sec)
    }

    pub fn calibration_error(&self) -> Result<f64, CalibrationError> {
        self.result().map(|r| r.calibration_error)
    }

    pub fn max_calibration_error(&self) -> Result<f64, CalibrationError> {
        self.result().map(|r| r.max_calibration_error)
    }

    /// Best alignment score of the selected sign convention
    pub fn best_correlation(&self) -> Result<f64, CalibrationError> {
        self.result().map(|r| r.best_score)
    }

    /// Video statistics of the last run, `None` in signal mode
    pub fn video_stats(&self) -> Result<Option<&VideoExtractionStats>, CalibrationError> {
        self.result().map(|r| r.video_stats.as_ref())
    }

    pub fn uncalibrated_tracker_position_signal(&self) -> Result<LabeledSignal, CalibrationError> {
        self.labeled(
            TIME_LABEL,
            "Uncalibrated tracker position [normalized]",
            |s| &s.uncalibrated_tracker_position,
        )
    }

    pub fn calibrated_tracker_position_signal(&self) -> Result<LabeledSignal, CalibrationError> {
        self.labeled(
            TIME_LABEL,
            "Calibrated tracker position [normalized]",
            |s| &s.calibrated_tracker_position,
        )
    }

    pub fn video_position_signal(&self) -> Result<LabeledSignal, CalibrationError> {
        self.labeled(TIME_LABEL, "Video position [normalized]", |s| &s.video_position)
    }

    /// Score vs tracker offset; the time axis is the candidate offset.
    pub fn correlation_signal(&self) -> Result<LabeledSignal, CalibrationError> {
        let metric = self.result()?.metric;
        self.labeled(
            OFFSET_LABEL,
            &format!("{} score", metric.as_str()),
            |s| &s.correlation,
        )
    }

    fn labeled(
        &self,
        time_label: &str,
        value_label: &str,
        pick: impl Fn(&CalibrationSignals) -> &ScalarSignal,
    ) -> Result<LabeledSignal, CalibrationError> {
        let result = self.result()?;
        Ok(LabeledSignal::new(
            time_label,
            value_label,
            pick(&result.signals).clone(),
        ))
    }
}

/// Earliest and latest timestamp of the video input
fn video_time_range(video: &VideoInput) -> Result<(f64, f64), CalibrationError> {
    let range = match video {
        VideoInput::Frames(sequence) => sequence
            .frames
            .iter()
            .map(|f| f.timestamp)
            .filter(|t| t.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, t| match acc {
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
                None => Some((t, t)),
            }),
        VideoInput::PositionSignal(signal) => signal.time_range(),
    };
    range.ok_or(CalibrationError::EmptyVideoData)
}

/// Only MF-oriented brightness frames of one consistent size are accepted.
fn check_video_format(sequence: &VideoSequence) -> Result<(), CalibrationError> {
    if sequence.orientation != ImageOrientation::MF {
        return Err(CalibrationError::wrong_orientation(format!(
            "image orientation {:?}, expected MF",
            sequence.orientation
        )));
    }
    if sequence.image_type != ImageType::Brightness {
        return Err(CalibrationError::wrong_orientation(format!(
            "image type {:?}, expected brightness",
            sequence.image_type
        )));
    }
    let Some(first) = sequence.frames.first() else {
        return Ok(());
    };
    let (width, height) = (first.image.width, first.image.height);
    for (index, frame) in sequence.frames.iter().enumerate() {
        if frame.image.width != width || frame.image.height != height {
            return Err(CalibrationError::wrong_orientation(format!(
                "frame {index} is {}x{}, expected {width}x{height}",
                frame.image.width, frame.image.height
            )));
        }
        if !frame.image.is_consistent() {
            return Err(CalibrationError::wrong_orientation(format!(
                "frame {index} pixel buffer does not match {width}x{height}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        AlignmentThresholds, FrameStatus, IntensityImage, NamedTransform, RigidTransform,
        TrackerFrame, VideoFrame,
    };
    use std::f64::consts::PI;

    const VALUES: [f64; 5] = [10.0, 12.0, 9.0, 11.0, 10.5];

    fn concrete_engine() -> TemporalCalibration {
        let mut engine = TemporalCalibration::default();
        engine.set_video_position_signal(
            ScalarSignal::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], VALUES.to_vec()).unwrap(),
        );
        engine.set_tracker_position_signal(
            ScalarSignal::new(vec![0.05, 0.15, 0.25, 0.35, 0.45], VALUES.to_vec()).unwrap(),
        );
        engine.set_sampling_resolution_sec(0.01);
        engine.set_maximum_video_tracker_lag_sec(0.2);
        engine
    }

    /// Frame with a soft bright band centred on `depth`
    fn band_frame(timestamp: f64, depth: f64) -> VideoFrame {
        let (width, height) = (64u32, 96u32);
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            let d = (f64::from(y) - depth) / 2.0;
            let v = 10.0 + 200.0 * (-d * d).exp();
            for _ in 0..width {
                pixels.push(v.round() as u8);
            }
        }
        VideoFrame {
            timestamp,
            status: FrameStatus::Ok,
            image: IntensityImage::new(width, height, pixels),
        }
    }

    fn frames_engine(lag: f64) -> TemporalCalibration {
        let motion = |t: f64| (2.0 * PI * 0.5 * t).sin();
        let video: Vec<VideoFrame> = (0..80)
            .map(|i| {
                let t = i as f64 / 20.0;
                band_frame(t, 48.0 + 10.0 * motion(t))
            })
            .collect();
        let name: TransformName = "ProbeToReference".parse().unwrap();
        let tracker: Vec<TrackerFrame> = (0..200)
            .map(|i| {
                let t = i as f64 / 50.0;
                let x = 2.0 * motion(t - lag);
                TrackerFrame {
                    timestamp: t,
                    transforms: vec![NamedTransform::new(
                        name.clone(),
                        RigidTransform::from_translation([x, 0.5 * x, 30.0]),
                    )],
                }
            })
            .collect();

        let mut engine = TemporalCalibration::default();
        engine.set_video_frames(Arc::new(VideoSequence::new(video)));
        engine.set_tracker_frames(Arc::new(TrackerSequence::new(tracker)));
        engine.set_sampling_resolution_sec(0.01);
        engine.set_maximum_video_tracker_lag_sec(0.3);
        engine
    }

    #[test]
    fn test_concrete_scenario() {
        let mut engine = concrete_engine();
        let result = engine.update().unwrap();
        assert!((result.tracker_lag_sec - 0.05).abs() < 0.01, "lag = {}", result.tracker_lag_sec);
        assert!(result.calibration_error < 0.1);
        assert!(!result.above_threshold);
        assert!(result.video_stats.is_none());
        assert!(result.principal_axis.is_none());
    }

    #[test]
    fn test_accessors_before_update() {
        let engine = concrete_engine();
        assert_eq!(engine.tracker_lag_sec(), Err(CalibrationError::NotYetComputed));
        assert_eq!(engine.calibration_error(), Err(CalibrationError::NotYetComputed));
        assert!(engine.correlation_signal().is_err());
        assert!(engine.result().is_err());
    }

    #[test]
    fn test_precondition_order() {
        let mut engine = TemporalCalibration::default();
        assert_eq!(engine.update().unwrap_err(), CalibrationError::NoVideoData);

        engine.set_video_position_signal(ScalarSignal::default());
        assert_eq!(engine.update().unwrap_err(), CalibrationError::NoTrackerData);

        engine.set_tracker_position_signal(ScalarSignal::default());
        assert_eq!(engine.update().unwrap_err(), CalibrationError::EmptyVideoData);

        engine.set_video_position_signal(ScalarSignal::from_pairs([(0.0, 1.0)]).unwrap());
        assert_eq!(engine.update().unwrap_err(), CalibrationError::EmptyTrackerData);

        engine.set_tracker_position_signal(ScalarSignal::from_pairs([(0.0, 1.0)]).unwrap());
        engine.set_sampling_resolution_sec(1e-6);
        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::ResolutionTooSmall { .. }
        ));
    }

    #[test]
    fn test_wrong_orientation() {
        let mut sequence = VideoSequence::new(vec![band_frame(0.0, 10.0)]);
        sequence.orientation = ImageOrientation::UN;
        let mut engine = concrete_engine();
        engine.set_video_frames(Arc::new(sequence));
        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::WrongOrientation { .. }
        ));

        let mut mixed = VideoSequence::new(vec![band_frame(0.0, 10.0)]);
        mixed.frames.push(VideoFrame {
            timestamp: 0.1,
            status: FrameStatus::Ok,
            image: IntensityImage::blank(8, 8),
        });
        engine.set_video_frames(Arc::new(mixed));
        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::WrongOrientation { .. }
        ));
    }

    #[test]
    fn test_invalid_transform_name() {
        let mut engine = frames_engine(0.0);
        engine.set_probe_to_reference_transform_name("Probe");
        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::InvalidTransformName { .. }
        ));

        engine.set_probe_to_reference_transform_name("StylusToReference");
        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::InvalidTransformName { .. }
        ));
    }

    #[test]
    fn test_frames_mode_recovers_lag() {
        let mut engine = frames_engine(0.1);
        let result = engine.update().unwrap().clone();
        assert!((result.tracker_lag_sec - 0.1).abs() <= 0.02, "lag = {}", result.tracker_lag_sec);

        let axis = result.principal_axis.unwrap();
        let norm = axis.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);

        let stats = result.video_stats.unwrap();
        assert_eq!(stats.total_frames, 80);
        assert_eq!(stats.accepted_frames, 80);
    }

    #[test]
    fn test_frames_mode_insufficient_overlap() {
        let mut engine = frames_engine(0.0);
        engine.set_maximum_video_tracker_lag_sec(2.5);
        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::InsufficientOverlap { .. }
        ));
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut engine = frames_engine(0.05);
        let first = engine.update().unwrap().clone();
        let second = engine.update().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_failure_clears_previous_result() {
        let mut engine = concrete_engine();
        engine.update().unwrap();
        assert!(engine.result().is_ok());

        engine.set_tracker_position_signal(
            ScalarSignal::new(vec![0.05, 0.15, 0.25, 0.35, 0.45], vec![1.0; 5]).unwrap(),
        );
        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::InsufficientSignalVariation { .. }
        ));
        assert_eq!(engine.result().unwrap_err(), CalibrationError::NotYetComputed);
    }

    #[test]
    fn test_threshold_publishes_suspect_result() {
        let mut config = TemporalCalibrationConfig::default();
        // SSD scores are never positive
        config.alignment.thresholds = AlignmentThresholds {
            ssd: Some(1.0),
            ..Default::default()
        };
        let mut engine = TemporalCalibration::new(config);
        engine.set_video_position_signal(
            ScalarSignal::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], VALUES.to_vec()).unwrap(),
        );
        engine.set_tracker_position_signal(
            ScalarSignal::new(vec![0.05, 0.15, 0.25, 0.35, 0.45], VALUES.to_vec()).unwrap(),
        );
        engine.set_sampling_resolution_sec(0.01);
        engine.set_maximum_video_tracker_lag_sec(0.2);

        let err = engine.update().unwrap_err();
        assert!(matches!(err, CalibrationError::ResultAboveThreshold { threshold, .. } if threshold == 1.0));
        let result = engine.result().unwrap();
        assert!(result.above_threshold);
        assert!((result.tracker_lag_sec - 0.05).abs() < 0.01);
    }

    #[test]
    fn test_score_equal_to_threshold_is_suspect() {
        let best = concrete_engine().update().unwrap().best_score;

        let mut config = TemporalCalibrationConfig::default();
        config.alignment.thresholds.ssd = Some(best);
        let mut engine = TemporalCalibration::new(config);
        engine.set_video_position_signal(
            ScalarSignal::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], VALUES.to_vec()).unwrap(),
        );
        engine.set_tracker_position_signal(
            ScalarSignal::new(vec![0.05, 0.15, 0.25, 0.35, 0.45], VALUES.to_vec()).unwrap(),
        );
        engine.set_sampling_resolution_sec(0.01);
        engine.set_maximum_video_tracker_lag_sec(0.2);

        assert!(matches!(
            engine.update().unwrap_err(),
            CalibrationError::ResultAboveThreshold { score, threshold, .. } if score == threshold
        ));
        assert!(engine.result().unwrap().above_threshold);
    }

    #[test]
    fn test_constant_video_signal_is_rejected() {
        let mut engine = concrete_engine();
        engine.set_video_position_signal(
            ScalarSignal::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], vec![2.5; 5]).unwrap(),
        );
        let err = engine.update().unwrap_err();
        assert!(
            matches!(
                err,
                CalibrationError::InsufficientSignalVariation { ref signal, .. } if signal == "video_position"
            ),
            "{err}"
        );
        assert_eq!(engine.result().unwrap_err(), CalibrationError::NotYetComputed);
    }

    #[test]
    fn test_labeled_signals() {
        let mut engine = concrete_engine();
        engine.update().unwrap();
        let correlation = engine.correlation_signal().unwrap();
        assert_eq!(correlation.time_label, "Tracker offset [s]");
        assert_eq!(correlation.value_label, "ssd score");

        let video = engine
            .video_position_signal()
            .unwrap()
            .with_labels("t", "depth");
        assert_eq!(video.time_label, "t");
        assert!(!video.signal.is_empty());
    }

    #[test]
    fn test_intermediate_images_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = frames_engine(0.0);
        engine.set_save_intermediate_images(true);
        engine.set_intermediate_files_output_directory(dir.path());
        engine.update().unwrap();
        assert!(dir.path().join("scanlines_0000.png").exists());
        assert!(dir.path().join("peaks_0079.png").exists());
    }
}

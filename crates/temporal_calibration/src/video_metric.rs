//! Video position metric extraction
//!
//! Each frame is reduced to one scalar: the depth of the bright reflector line
//! where it crosses the horizontal middle of the image. Frames that cannot be
//! reduced are skipped and counted, never padded.

use contracts::{
    ScalarSignal, VideoExtractionStats, VideoFrame, VideoMetricConfig, VideoSequence,
    TIMESTAMP_EPSILON_SEC,
};
use nalgebra::Point2;
use tracing::{debug, instrument, warn};

use crate::debug_images::IntermediateImageWriter;
use crate::line_fit::{LineFitter, LineModel};
use crate::peak::{find_largest_peak, PeakLocator};

/// Output of the video stage
#[derive(Debug, Clone, PartialEq)]
pub struct VideoExtraction {
    pub signal: ScalarSignal,
    pub stats: VideoExtractionStats,
}

/// Outcome of a single frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Metric value of the frame
    Accepted(f64),
    /// Frame status was not Ok
    Invalid,
    /// Fewer valid scanlines than required
    TooFewScanlines { valid: usize },
    /// The line fitter returned no model
    LineFitFailed,
    /// Fitted line too close to vertical
    NearVertical,
}

/// Reduces video frames to a position-vs-time signal
pub struct VideoPositionExtractor<'a> {
    config: &'a VideoMetricConfig,
    fitter: &'a dyn LineFitter,
}

impl<'a> VideoPositionExtractor<'a> {
    pub fn new(config: &'a VideoMetricConfig, fitter: &'a dyn LineFitter) -> Self {
        Self { config, fitter }
    }

    /// Evenly spaced scanline columns, `x_i = (i + 1) * width / (n + 1)`
    pub fn scanline_columns(width: u32, count: u32) -> Vec<u32> {
        let width = u64::from(width);
        let slots = u64::from(count) + 1;
        (1..slots).map(|i| (i * width / slots) as u32).collect()
    }

    /// Peak position on every valid scanline, as (column, row) points
    pub fn detect_peaks(&self, frame: &VideoFrame, columns: &[u32]) -> Vec<Point2<f64>> {
        let metric = self.config.peak_position_metric;
        let mut points = Vec::with_capacity(columns.len());
        for &x in columns {
            let profile = frame.image.column_profile(x);
            let Some(peak) = find_largest_peak(&profile, self.config.intensity_threshold_fraction)
            else {
                continue;
            };
            if let Some(y) = metric.locate(&profile, &peak) {
                points.push(Point2::new(f64::from(x), y));
            }
        }
        points
    }

    /// Process one frame
    pub fn process_frame(
        &self,
        frame: &VideoFrame,
        frame_index: usize,
        columns: &[u32],
        diagnostics: Option<&mut IntermediateImageWriter>,
    ) -> FrameOutcome {
        if !frame.is_valid() {
            return FrameOutcome::Invalid;
        }

        let points = self.detect_peaks(frame, columns);
        let invalid_scanlines = columns.len() - points.len();
        if invalid_scanlines > 0 {
            metrics::counter!("tcal_scanlines_invalid_total").increment(invalid_scanlines as u64);
        }

        let (outcome, line) = self.reduce(frame, &points);

        if let Some(writer) = diagnostics {
            writer.write_scanlines(frame_index, &frame.image, columns);
            writer.write_peaks(frame_index, &frame.image, &points, line.as_ref());
        }
        outcome
    }

    fn reduce(&self, frame: &VideoFrame, points: &[Point2<f64>]) -> (FrameOutcome, Option<LineModel>) {
        if points.len() < self.config.minimum_valid_scanlines as usize {
            return (FrameOutcome::TooFewScanlines { valid: points.len() }, None);
        }
        let Some(fit) = self.fitter.fit_line(points) else {
            return (FrameOutcome::LineFitFailed, None);
        };

        let mid_x = f64::from(frame.image.width) * 0.5;
        match fit.model.y_at(mid_x, self.config.min_x_slope_component) {
            Some(y) if y.is_finite() => (FrameOutcome::Accepted(y.abs()), Some(fit.model)),
            Some(_) => (FrameOutcome::LineFitFailed, Some(fit.model)),
            None => (FrameOutcome::NearVertical, Some(fit.model)),
        }
    }

    /// Process the whole sequence.
    #[instrument(
        name = "video_metric_extract",
        skip(self, sequence, diagnostics),
        fields(frames = sequence.len())
    )]
    pub fn extract(
        &self,
        sequence: &VideoSequence,
        mut diagnostics: Option<&mut IntermediateImageWriter>,
    ) -> VideoExtraction {
        let mut signal = ScalarSignal::default();
        let mut stats = VideoExtractionStats {
            total_frames: sequence.len(),
            ..Default::default()
        };
        let mut consecutive_unusable = 0usize;
        let mut last_timestamp: Option<f64> = None;

        for (index, frame) in sequence.frames.iter().enumerate() {
            let columns = Self::scanline_columns(frame.image.width, self.config.number_of_scanlines);
            let outcome = self.process_frame(frame, index, &columns, diagnostics.as_deref_mut());

            let FrameOutcome::Accepted(value) = outcome else {
                Self::count_skipped(&mut stats, index, &outcome);
                consecutive_unusable += 1;
                stats.max_consecutive_unusable =
                    stats.max_consecutive_unusable.max(consecutive_unusable);
                metrics::counter!("tcal_video_frames_total", "status" => "skipped").increment(1);
                continue;
            };
            consecutive_unusable = 0;

            if last_timestamp.is_some_and(|last| frame.timestamp <= last + TIMESTAMP_EPSILON_SEC) {
                stats.duplicate_timestamps += 1;
                continue;
            }
            if signal.push(frame.timestamp, value).is_err() {
                stats.duplicate_timestamps += 1;
                continue;
            }
            last_timestamp = Some(frame.timestamp);
            stats.accepted_frames += 1;
            metrics::counter!("tcal_video_frames_total", "status" => "accepted").increment(1);
        }

        self.report_quality(&stats);
        VideoExtraction { signal, stats }
    }

    fn count_skipped(stats: &mut VideoExtractionStats, index: usize, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Accepted(_) => {}
            FrameOutcome::Invalid => stats.invalid_frames += 1,
            FrameOutcome::TooFewScanlines { valid } => {
                debug!(frame_index = index, valid, "too few valid scanlines, frame skipped");
                stats.too_few_scanlines += 1;
            }
            FrameOutcome::LineFitFailed => {
                debug!(frame_index = index, "line fit failed, frame skipped");
                stats.line_fit_failures += 1;
            }
            FrameOutcome::NearVertical => {
                debug!(frame_index = index, "detected line is near vertical, frame skipped");
                stats.near_vertical_lines += 1;
            }
        }
    }

    fn report_quality(&self, stats: &VideoExtractionStats) {
        let fraction = stats.unusable_fraction();
        if fraction > self.config.max_invalid_frame_fraction {
            warn!(
                unusable = stats.unusable_frames(),
                total = stats.total_frames,
                percent = fraction * 100.0,
                limit_percent = self.config.max_invalid_frame_fraction * 100.0,
                "too many unusable video frames"
            );
        }
        if stats.max_consecutive_unusable > self.config.max_consecutive_invalid_frames {
            warn!(
                consecutive = stats.max_consecutive_unusable,
                limit = self.config.max_consecutive_invalid_frames,
                "too many consecutive unusable video frames"
            );
        }
        debug!(
            accepted = stats.accepted_frames,
            invalid = stats.invalid_frames,
            too_few_scanlines = stats.too_few_scanlines,
            line_fit_failures = stats.line_fit_failures,
            near_vertical = stats.near_vertical_lines,
            "video position metric computed"
        );
    }
}

//! Signal alignment
//!
//! The video signal is held fixed ("sliding" signal, cropped by the lag window
//! at both ends) while the tracker signal is resampled at every candidate
//! offset `k * resolution`, `|k * resolution| <= max_lag`. Each offset is
//! scored, and the sweep is repeated with the tracker negated because the
//! principal axis sign is arbitrary. The smaller-magnitude lag wins.

use contracts::{
    AlignmentConfig, AlignmentMetric, CalibrationError, LagCandidate, NormalizationMethod,
    ScalarSignal, SignConvention, MINIMUM_SAMPLING_RESOLUTION_SEC,
};
use tracing::{debug, info, instrument, warn};

use crate::interpolation::Resampler;

/// Scores two equal-length normalized signals; larger is better.
pub trait SignalScore {
    fn score(&self, a: &[f64], b: &[f64]) -> f64;
}

impl SignalScore for AlignmentMetric {
    fn score(&self, a: &[f64], b: &[f64]) -> f64 {
        let pairs = a.iter().zip(b);
        match self {
            AlignmentMetric::Ssd => -pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>(),
            AlignmentMetric::Correlation => pairs.map(|(x, y)| x * y).sum(),
            AlignmentMetric::Sad => -pairs.map(|(x, y)| (x - y).abs()).sum::<f64>(),
        }
    }
}

/// Mean-removed, scaled values
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub values: Vec<f64>,
    /// Multiplier applied after removing the mean (1 / peak-to-peak or 1 / std)
    pub factor: f64,
}

/// Normalize `values`.
///
/// `None` when the raw peak-to-peak is below `minimum_peak_to_peak` or the
/// divisor is not usable.
pub fn normalize(
    values: &[f64],
    method: NormalizationMethod,
    minimum_peak_to_peak: f64,
) -> Option<Normalized> {
    if values.is_empty() {
        return None;
    }
    let p2p = contracts::peak_to_peak(values);
    if p2p.is_nan() || p2p < minimum_peak_to_peak {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let divisor = match method {
        NormalizationMethod::Amplitude => p2p,
        NormalizationMethod::StandardDeviation => {
            if values.len() < 2 {
                return None;
            }
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        }
    };
    if !divisor.is_finite() || divisor <= 0.0 {
        return None;
    }
    let factor = 1.0 / divisor;
    Some(Normalized {
        values: values.iter().map(|v| (v - mean) * factor).collect(),
        factor,
    })
}

/// Best offset of one sign convention
#[derive(Debug, Clone)]
struct Sweep {
    sign: SignConvention,
    offset: f64,
    score: f64,
    factor: f64,
    /// sliding minus resampled tracker, both normalized
    residuals: Vec<f64>,
    curve: ScalarSignal,
}

impl Sweep {
    fn candidate(&self) -> LagCandidate {
        LagCandidate {
            sign: self.sign,
            lag_sec: self.offset,
            score: self.score,
        }
    }
}

/// Output of the aligner
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub tracker_lag_sec: f64,
    pub best_score: f64,
    pub normalization_factor: f64,
    pub calibration_error: f64,
    pub max_calibration_error: f64,
    pub selected_sign: SignConvention,
    pub candidates: [LagCandidate; 2],
    pub common_range: (f64, f64),
    /// Normalized sliding video signal
    pub video_signal: ScalarSignal,
    /// Normalized tracker over the matched window, original timestamps
    pub uncalibrated_tracker_signal: ScalarSignal,
    /// Same values shifted by the lag
    pub calibrated_tracker_signal: ScalarSignal,
    /// Score vs offset of the selected sign convention
    pub correlation_signal: ScalarSignal,
}

/// Slack absorbed before truncating `max_lag / resolution`, so that
/// e.g. 0.3 / 0.1 = 2.9999999999999996 still reaches the +-0.3 endpoints.
const LAG_STEP_EPSILON: f64 = 1e-9;

/// Number of offsets swept on each side of zero: `floor(max_lag / resolution)`.
pub fn lag_steps(max_lag_sec: f64, resolution_sec: f64) -> i64 {
    (max_lag_sec / resolution_sec + LAG_STEP_EPSILON).floor() as i64
}

/// Lag search between a video and a tracker position signal
#[derive(Debug, Clone)]
pub struct SignalAligner<'a> {
    config: &'a AlignmentConfig,
    resolution_sec: f64,
    max_lag_sec: f64,
}

impl<'a> SignalAligner<'a> {
    pub fn new(config: &'a AlignmentConfig, resolution_sec: f64, max_lag_sec: f64) -> Self {
        Self {
            config,
            resolution_sec,
            max_lag_sec,
        }
    }

    #[instrument(
        name = "signal_align",
        skip(self, video, tracker),
        fields(video = video.len(), tracker = tracker.len(), metric = self.config.metric.as_str())
    )]
    pub fn align(
        &self,
        video: &ScalarSignal,
        tracker: &ScalarSignal,
    ) -> Result<Alignment, CalibrationError> {
        let max_lag = self.max_lag_sec;
        if !max_lag.is_finite() || max_lag < 0.0 {
            return Err(CalibrationError::CorrelationResultEmpty);
        }
        if self.resolution_sec.is_nan() || self.resolution_sec < MINIMUM_SAMPLING_RESOLUTION_SEC {
            return Err(CalibrationError::ResolutionTooSmall {
                requested: self.resolution_sec,
                minimum: MINIMUM_SAMPLING_RESOLUTION_SEC,
            });
        }
        let minimum = self.config.minimum_peak_to_peak;

        let (video_min, video_max) = video
            .time_range()
            .ok_or_else(|| CalibrationError::too_few_samples("video_position", 0, 2))?;
        let (tracker_min, tracker_max) = tracker
            .time_range()
            .ok_or_else(|| CalibrationError::too_few_samples("tracker_position", 0, 2))?;
        let common_min = video_min.max(tracker_min);
        let common_max = video_max.min(tracker_max);
        if common_min >= common_max {
            return Err(CalibrationError::InsufficientOverlap {
                common_min,
                common_max,
                max_lag,
            });
        }

        for (name, signal) in [("video_position", video), ("tracker_position", tracker)] {
            let p2p = signal.peak_to_peak();
            if p2p.is_nan() || p2p < minimum {
                return Err(CalibrationError::insufficient_variation(name, p2p, minimum));
            }
        }

        let sliding = self.sliding_signal(video, common_min, common_max)?;
        let sliding_p2p = sliding.peak_to_peak();
        let sliding_norm = normalize(sliding.values(), self.config.normalization, minimum)
            .ok_or_else(|| {
                CalibrationError::insufficient_variation("sliding_video", sliding_p2p, minimum)
            })?;

        let direct = self
            .sweep(&sliding, &sliding_norm.values, tracker, SignConvention::Direct)
            .ok_or(CalibrationError::CorrelationResultEmpty)?;
        let inverted = self
            .sweep(&sliding, &sliding_norm.values, &tracker.negated(), SignConvention::Inverted)
            .ok_or(CalibrationError::CorrelationResultEmpty)?;
        debug!(
            direct_lag = direct.offset,
            direct_score = direct.score,
            inverted_lag = inverted.offset,
            inverted_score = inverted.score,
            "sign candidates"
        );

        let candidates = [direct.candidate(), inverted.candidate()];
        let selected = select(direct, inverted);
        let lag = selected.offset;

        let sum_squares: f64 = selected.residuals.iter().map(|d| d * d).sum();
        let max_abs = selected.residuals.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        let calibration_error = sum_squares.sqrt() / selected.factor;
        let max_calibration_error = max_abs / selected.factor;

        let (uncalibrated, calibrated) = self.tracker_report_signals(&sliding, tracker, lag);
        let video_signal = sliding
            .with_values(sliding_norm.values)
            .unwrap_or_else(|_| sliding.clone());

        info!(
            lag_sec = lag,
            score = selected.score,
            sign = ?selected.sign,
            calibration_error,
            "signals aligned"
        );

        Ok(Alignment {
            tracker_lag_sec: lag,
            best_score: selected.score,
            normalization_factor: selected.factor,
            calibration_error,
            max_calibration_error,
            selected_sign: selected.sign,
            candidates,
            common_range: (common_min, common_max),
            video_signal,
            uncalibrated_tracker_signal: uncalibrated,
            calibrated_tracker_signal: calibrated,
            correlation_signal: selected.curve,
        })
    }

    /// Video samples strictly inside the lag-narrowed common range, or the
    /// whole common range when the narrowed one holds fewer than two samples.
    fn sliding_signal(
        &self,
        video: &ScalarSignal,
        common_min: f64,
        common_max: f64,
    ) -> Result<ScalarSignal, CalibrationError> {
        let narrowed = video.crop_open(common_min + self.max_lag_sec, common_max - self.max_lag_sec);
        if narrowed.len() >= 2 {
            return Ok(narrowed);
        }

        warn!(
            samples = narrowed.len(),
            common_min,
            common_max,
            max_lag = self.max_lag_sec,
            "lag window leaves too few video samples, using the whole common range"
        );
        let closed = video.crop_closed(common_min, common_max);
        if closed.len() < 2 {
            return Err(CalibrationError::too_few_samples("sliding_video", closed.len(), 2));
        }
        Ok(closed)
    }

    fn sweep(
        &self,
        sliding: &ScalarSignal,
        sliding_values: &[f64],
        tracker: &ScalarSignal,
        sign: SignConvention,
    ) -> Option<Sweep> {
        let resampler = Resampler::new(tracker, self.config.interpolation)?;
        let steps = lag_steps(self.max_lag_sec, self.resolution_sec);
        let metric = self.config.metric;

        let mut curve = ScalarSignal::default();
        let mut best: Option<Sweep> = None;
        let mut skipped = 0usize;

        for k in -steps..=steps {
            let offset = k as f64 * self.resolution_sec;
            let resampled = resampler.sample_all(sliding.timestamps().iter().map(|t| t + offset));
            let Some(normalized) = normalize(
                &resampled,
                self.config.normalization,
                self.config.minimum_peak_to_peak,
            ) else {
                skipped += 1;
                continue;
            };

            let score = metric.score(sliding_values, &normalized.values);
            if curve.push(offset, score).is_err() {
                skipped += 1;
                continue;
            }

            let improved = match &best {
                Some(b) => score > b.score,
                None => true,
            };
            if improved {
                best = Some(Sweep {
                    sign,
                    offset,
                    score,
                    factor: normalized.factor,
                    residuals: sliding_values
                        .iter()
                        .zip(&normalized.values)
                        .map(|(a, b)| a - b)
                        .collect(),
                    curve: ScalarSignal::default(),
                });
            }
        }

        if skipped > 0 {
            debug!(?sign, skipped, "degenerate offsets skipped");
        }
        best.map(|b| Sweep { curve, ..b })
    }

    /// Tracker samples matched to the sliding window, normalized; the second
    /// signal is the first with timestamps moved back by the lag.
    fn tracker_report_signals(
        &self,
        sliding: &ScalarSignal,
        tracker: &ScalarSignal,
        lag: f64,
    ) -> (ScalarSignal, ScalarSignal) {
        let Some((first, last)) = sliding.time_range() else {
            return (ScalarSignal::default(), ScalarSignal::default());
        };
        let cropped = tracker.crop_closed(first + lag, last + lag);
        let uncalibrated = match normalize(cropped.values(), self.config.normalization, 0.0) {
            Some(n) => cropped.with_values(n.values).unwrap_or_else(|_| cropped.clone()),
            None => cropped,
        };
        let calibrated = uncalibrated.shifted(-lag);
        (uncalibrated, calibrated)
    }
}

/// Smaller |lag| wins; on a tie the higher score, then the direct convention.
fn select(direct: Sweep, inverted: Sweep) -> Sweep {
    let take_inverted = match inverted.offset.abs().total_cmp(&direct.offset.abs()) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => inverted.score > direct.score,
    };
    if take_inverted {
        inverted
    } else {
        direct
    }
}

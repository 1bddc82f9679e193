//! Scalar time signals
//!
//! Every derived signal of a calibration run (video position metric, tracker
//! position metric, sliding video signal, score-vs-offset curve) is a
//! `ScalarSignal`: parallel timestamp/value columns with strictly increasing
//! timestamps.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signal invariant violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("timestamp/value length mismatch: {timestamps} timestamps, {values} values")]
    LengthMismatch { timestamps: usize, values: usize },

    #[error("timestamps must be strictly increasing: t[{index}] = {current} after {previous}")]
    NotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("non-finite sample at index {index}")]
    NonFinite { index: usize },
}

/// Ordered (timestamp, value) samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSignal", into = "RawSignal")]
pub struct ScalarSignal {
    timestamps: Vec<f64>,
    values: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawSignal {
    timestamps: Vec<f64>,
    values: Vec<f64>,
}

impl TryFrom<RawSignal> for ScalarSignal {
    type Error = SignalError;

    fn try_from(raw: RawSignal) -> Result<Self, Self::Error> {
        Self::new(raw.timestamps, raw.values)
    }
}

impl From<ScalarSignal> for RawSignal {
    fn from(signal: ScalarSignal) -> Self {
        Self {
            timestamps: signal.timestamps,
            values: signal.values,
        }
    }
}

impl ScalarSignal {
    /// Build a signal, checking the length and ordering invariants.
    pub fn new(timestamps: Vec<f64>, values: Vec<f64>) -> Result<Self, SignalError> {
        if timestamps.len() != values.len() {
            return Err(SignalError::LengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        for (index, (t, v)) in timestamps.iter().zip(&values).enumerate() {
            if !t.is_finite() || !v.is_finite() {
                return Err(SignalError::NonFinite { index });
            }
        }
        for (index, pair) in timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(SignalError::NotIncreasing {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }
        Ok(Self { timestamps, values })
    }

    /// Build from (timestamp, value) pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, SignalError> {
        let (timestamps, values) = pairs.into_iter().unzip();
        Self::new(timestamps, values)
    }

    /// Append one sample; the timestamp must exceed the last one.
    pub fn push(&mut self, timestamp: f64, value: f64) -> Result<(), SignalError> {
        let index = self.timestamps.len();
        if !timestamp.is_finite() || !value.is_finite() {
            return Err(SignalError::NonFinite { index });
        }
        if let Some(&previous) = self.timestamps.last() {
            if timestamp <= previous {
                return Err(SignalError::NotIncreasing {
                    index,
                    previous,
                    current: timestamp,
                });
            }
        }
        self.timestamps.push(timestamp);
        self.values.push(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// First and last timestamp
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// max - min of the values (0 for an empty signal)
    pub fn peak_to_peak(&self) -> f64 {
        peak_to_peak(&self.values)
    }

    /// Samples with `min < t < max`
    pub fn crop_open(&self, min: f64, max: f64) -> Self {
        self.filter(|t| t > min && t < max)
    }

    /// Samples with `min <= t <= max`
    pub fn crop_closed(&self, min: f64, max: f64) -> Self {
        self.filter(|t| t >= min && t <= max)
    }

    /// Same values, timestamps moved by `dt`
    pub fn shifted(&self, dt: f64) -> Self {
        Self {
            timestamps: self.timestamps.iter().map(|t| t + dt).collect(),
            values: self.values.clone(),
        }
    }

    pub fn negated(&self) -> Self {
        Self {
            timestamps: self.timestamps.clone(),
            values: self.values.iter().map(|v| -v).collect(),
        }
    }

    /// Same timestamps, replaced values. The length must match.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, SignalError> {
        Self::new(self.timestamps.clone(), values)
    }

    fn filter(&self, keep: impl Fn(f64) -> bool) -> Self {
        let (timestamps, values) = self.iter().filter(|(t, _)| keep(*t)).unzip();
        Self { timestamps, values }
    }
}

/// max - min of a slice (0 for an empty slice)
pub fn peak_to_peak(values: &[f64]) -> f64 {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if values.is_empty() {
        0.0
    } else {
        max - min
    }
}

/// A signal with axis labels for plotting and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSignal {
    pub time_label: String,
    pub value_label: String,
    pub signal: ScalarSignal,
}

impl LabeledSignal {
    pub fn new(
        time_label: impl Into<String>,
        value_label: impl Into<String>,
        signal: ScalarSignal,
    ) -> Self {
        Self {
            time_label: time_label.into(),
            value_label: value_label.into(),
            signal,
        }
    }

    /// Replace both axis labels
    pub fn with_labels(mut self, time_label: impl Into<String>, value_label: impl Into<String>) -> Self {
        self.time_label = time_label.into();
        self.value_label = value_label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScalarSignal {
        ScalarSignal::from_pairs([(0.0, 1.0), (0.1, 3.0), (0.2, 2.0), (0.3, -1.0)]).unwrap()
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = ScalarSignal::new(vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, SignalError::LengthMismatch { .. }));
    }

    #[test]
    fn test_rejects_non_increasing_timestamps() {
        let err = ScalarSignal::new(vec![0.0, 1.0, 1.0], vec![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            SignalError::NotIncreasing {
                index: 2,
                previous: 1.0,
                current: 1.0
            }
        );

        let mut signal = sample();
        assert!(signal.push(0.3, 5.0).is_err());
        assert!(signal.push(0.4, 5.0).is_ok());
        assert_eq!(signal.len(), 5);
    }

    #[test]
    fn test_stats() {
        let signal = sample();
        assert!((signal.peak_to_peak() - 4.0).abs() < 1e-12);
        assert!((signal.mean().unwrap() - 1.25).abs() < 1e-12);
        assert_eq!(signal.time_range(), Some((0.0, 0.3)));
        assert_eq!(ScalarSignal::default().peak_to_peak(), 0.0);
    }

    #[test]
    fn test_crop_open_and_closed() {
        let signal = sample();
        assert_eq!(signal.crop_open(0.0, 0.3).timestamps(), &[0.1, 0.2]);
        assert_eq!(signal.crop_closed(0.0, 0.2).len(), 3);
    }

    #[test]
    fn test_shift_and_negate() {
        let signal = sample();
        let shifted = signal.shifted(1.0);
        assert!((shifted.timestamps()[0] - 1.0).abs() < 1e-12);
        assert_eq!(shifted.values(), signal.values());
        assert_eq!(signal.negated().values()[1], -3.0);
    }

    #[test]
    fn test_deserialize_checks_invariants() {
        let bad = r#"{"timestamps":[1.0,0.5],"values":[0.0,0.0]}"#;
        assert!(serde_json::from_str::<ScalarSignal>(bad).is_err());

        let json = serde_json::to_string(&sample()).unwrap();
        let back: ScalarSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }
}

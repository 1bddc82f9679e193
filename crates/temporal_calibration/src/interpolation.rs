//! Signal resampling
//!
//! Both methods pass exactly through the samples and hold the end values
//! outside the sampled range.

use contracts::{Interpolation, ScalarSignal};

/// Evaluates a signal at arbitrary times
#[derive(Debug, Clone)]
pub struct Resampler<'a> {
    timestamps: &'a [f64],
    values: &'a [f64],
    /// Hermite tangents, present for `MonotoneCubic`
    slopes: Option<Vec<f64>>,
}

impl<'a> Resampler<'a> {
    /// `None` for an empty signal
    pub fn new(signal: &'a ScalarSignal, method: Interpolation) -> Option<Self> {
        if signal.is_empty() {
            return None;
        }
        let timestamps = signal.timestamps();
        let values = signal.values();
        let slopes = match method {
            Interpolation::Linear => None,
            Interpolation::MonotoneCubic => Some(monotone_slopes(timestamps, values)),
        };
        Some(Self {
            timestamps,
            values,
            slopes,
        })
    }

    pub fn sample(&self, t: f64) -> f64 {
        let n = self.timestamps.len();
        let last = n - 1;
        if n == 1 || t <= self.timestamps[0] {
            return self.values[0];
        }
        if t >= self.timestamps[last] {
            return self.values[last];
        }

        // first index with timestamp > t, in 1..n
        let hi = self.timestamps.partition_point(|&x| x <= t);
        let lo = hi - 1;
        let (t0, t1) = (self.timestamps[lo], self.timestamps[hi]);
        let (y0, y1) = (self.values[lo], self.values[hi]);
        let h = t1 - t0;
        let s = (t - t0) / h;

        match &self.slopes {
            None => y0 + (y1 - y0) * s,
            Some(m) => {
                let s2 = s * s;
                let s3 = s2 * s;
                let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
                let h10 = s3 - 2.0 * s2 + s;
                let h01 = -2.0 * s3 + 3.0 * s2;
                let h11 = s3 - s2;
                h00 * y0 + h10 * h * m[lo] + h01 * y1 + h11 * h * m[hi]
            }
        }
    }

    pub fn sample_all(&self, times: impl IntoIterator<Item = f64>) -> Vec<f64> {
        times.into_iter().map(|t| self.sample(t)).collect()
    }
}

/// Fritsch-Carlson tangents (shape preserving, no overshoot)
fn monotone_slopes(t: &[f64], y: &[f64]) -> Vec<f64> {
    let n = t.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let h: Vec<f64> = t.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = y
        .windows(2)
        .zip(&h)
        .map(|(w, h)| (w[1] - w[0]) / h)
        .collect();

    if n == 2 {
        return vec![delta[0]; 2];
    }

    let mut m = vec![0.0; n];
    for k in 1..n - 1 {
        let (d0, d1) = (delta[k - 1], delta[k]);
        if d0 * d1 <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        m[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
    }
    m[0] = end_slope(h[0], h[1], delta[0], delta[1]);
    m[n - 1] = end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    m
}

/// One-sided three-point end tangent, clipped to keep the end interval monotone
fn end_slope(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let m = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if m.signum() != d0.signum() || d0 == 0.0 {
        0.0
    } else if d0.signum() != d1.signum() && m.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        m
    }
}

//! Tracker position metric extraction
//!
//! Probe positions are projected onto their principal axis of motion, which
//! turns a 3-D trajectory into a scalar position-vs-time signal.

use contracts::{CalibrationError, ScalarSignal, TrackerSequence, TransformName, TIMESTAMP_EPSILON_SEC};
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use tracing::{debug, instrument};

use crate::transform_repository::TransformRepository;

/// Probe position at one tracker timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerPosition {
    pub timestamp: f64,
    pub position: Vector3<f64>,
}

/// Output of the tracker stage
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerExtraction {
    pub signal: ScalarSignal,
    /// Unit direction of largest positional variance
    pub principal_axis: Vector3<f64>,
    pub mean_position: Vector3<f64>,
}

/// Resolve `name` in every tracker frame.
///
/// Frames where the transform cannot be resolved are skipped. The output is
/// sorted by timestamp with near-duplicate timestamps removed.
pub fn resolve_positions(sequence: &TrackerSequence, name: &TransformName) -> Vec<TrackerPosition> {
    let mut positions: Vec<TrackerPosition> = sequence
        .frames
        .iter()
        .filter(|frame| frame.timestamp.is_finite())
        .filter_map(|frame| {
            let t = TransformRepository::from_frame(frame).resolve_translation(name)?;
            Some(TrackerPosition {
                timestamp: frame.timestamp,
                position: Vector3::new(t[0], t[1], t[2]),
            })
        })
        .collect();

    positions.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    let before = positions.len();
    positions.dedup_by(|next, kept| next.timestamp <= kept.timestamp + TIMESTAMP_EPSILON_SEC);
    if positions.len() < before {
        debug!(
            removed = before - positions.len(),
            "duplicate tracker timestamps removed"
        );
    }
    positions
}

/// Principal axis of a point cloud.
///
/// Eigenvector of the largest covariance eigenvalue, unit length, signed so
/// that its largest-magnitude component is positive. `None` below two points.
pub fn principal_axis(points: &[Vector3<f64>]) -> Option<(Vector3<f64>, Vector3<f64>)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / n;
    let covariance = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - mean;
        acc + d * d.transpose()
    }) / n;

    let eigen = SymmetricEigen::new(covariance);
    let largest = eigen.eigenvalues.imax();
    let mut axis: Vector3<f64> = eigen.eigenvectors.column(largest).into_owned();
    let norm = axis.norm();
    if !norm.is_finite() || norm < f64::EPSILON {
        return None;
    }
    axis /= norm;
    if axis[axis.iamax()] < 0.0 {
        axis = -axis;
    }
    Some((axis, mean))
}

/// Reduces probe positions to a position-vs-time signal
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerPositionExtractor;

impl TrackerPositionExtractor {
    /// Project the positions with `lo < t < hi` onto their principal axis.
    #[instrument(name = "tracker_metric_extract", skip(self, positions), fields(positions = positions.len()))]
    pub fn extract(
        &self,
        positions: &[TrackerPosition],
        window: (f64, f64),
    ) -> Result<TrackerExtraction, CalibrationError> {
        let (lo, hi) = window;
        let kept: Vec<&TrackerPosition> = positions
            .iter()
            .filter(|p| p.timestamp > lo && p.timestamp < hi)
            .collect();
        if kept.len() < 2 {
            return Err(CalibrationError::too_few_samples("tracker_position", kept.len(), 2));
        }

        let points: Vec<Vector3<f64>> = kept.iter().map(|p| p.position).collect();
        let (axis, mean) = principal_axis(&points)
            .ok_or_else(|| CalibrationError::too_few_samples("tracker_position", kept.len(), 2))?;

        let mut signal = ScalarSignal::default();
        for p in kept {
            // input is sorted and deduplicated; anything else is skipped
            if signal.push(p.timestamp, p.position.dot(&axis)).is_err() {
                debug!(timestamp = p.timestamp, "tracker sample out of order, skipped");
            }
        }
        if signal.len() < 2 {
            return Err(CalibrationError::too_few_samples("tracker_position", signal.len(), 2));
        }

        debug!(
            samples = signal.len(),
            axis_x = axis.x,
            axis_y = axis.y,
            axis_z = axis.z,
            "tracker principal axis"
        );
        Ok(TrackerExtraction {
            signal,
            principal_axis: axis,
            mean_position: mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{NamedTransform, RigidTransform, TrackerFrame, TransformStatus};

    fn positions_along(direction: Vector3<f64>, count: usize) -> Vec<TrackerPosition> {
        (0..count)
            .map(|i| {
                let t = i as f64 * 0.05;
                let s = (t * 3.0).sin() * 10.0;
                // small off-axis wobble
                let wobble = Vector3::new(0.0, 0.0, 0.01 * (i % 3) as f64);
                TrackerPosition {
                    timestamp: t,
                    position: Vector3::new(5.0, -2.0, 1.0) + direction * s + wobble,
                }
            })
            .collect()
    }

    #[test]
    fn test_principal_axis_is_unit_and_aligned() {
        let direction = Vector3::new(1.0, 2.0, 2.0) / 3.0;
        let positions = positions_along(direction, 60);
        let points: Vec<_> = positions.iter().map(|p| p.position).collect();
        let (axis, _) = principal_axis(&points).unwrap();
        assert!((axis.norm() - 1.0).abs() < 1e-9);
        assert!(axis.dot(&direction) > 0.999, "axis = {axis:?}");
    }

    #[test]
    fn test_axis_sign_is_deterministic() {
        let direction = Vector3::new(0.0, -1.0, 0.0);
        let positions = positions_along(direction, 40);
        let points: Vec<_> = positions.iter().map(|p| p.position).collect();
        let (axis, _) = principal_axis(&points).unwrap();
        // largest component is y, forced positive
        assert!(axis.y > 0.99, "axis = {axis:?}");
    }

    #[test]
    fn test_extract_window_is_open() {
        let positions = positions_along(Vector3::x(), 21);
        let extraction = TrackerPositionExtractor
            .extract(&positions, (0.0, 1.0))
            .unwrap();
        // t = 0.0 and t = 1.0 excluded
        assert_eq!(extraction.signal.len(), 19);
        assert!((extraction.principal_axis.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_too_few_samples() {
        let positions = positions_along(Vector3::x(), 5);
        let err = TrackerPositionExtractor
            .extract(&positions, (0.06, 0.09))
            .unwrap_err();
        assert!(matches!(err, CalibrationError::TooFewSamples { found: 0, .. }));
    }

    #[test]
    fn test_resolve_positions_skips_and_dedups() {
        let name: TransformName = "ProbeToReference".parse().unwrap();
        let make = |t: f64, x: f64, status| TrackerFrame {
            timestamp: t,
            transforms: vec![NamedTransform {
                name: name.clone(),
                transform: RigidTransform::from_translation([x, 0.0, 0.0]),
                status,
            }],
        };
        let sequence = TrackerSequence::new(vec![
            make(0.2, 2.0, TransformStatus::Ok),
            make(0.0, 0.0, TransformStatus::Ok),
            make(0.1, 1.0, TransformStatus::Missing),
            make(0.00001, 9.0, TransformStatus::Ok),
        ]);

        let positions = resolve_positions(&sequence, &name);
        let times: Vec<f64> = positions.iter().map(|p| p.timestamp).collect();
        assert_eq!(times, vec![0.0, 0.2]);
        assert_eq!(positions[0].position.x, 0.0);
    }
}

//! Robust 2-D line fitting.
//!
//! The extractor only needs "points in, line out". [`LineFitter`] is that
//! seam; [`RansacLineFitter`] is the default implementation: a closed-form
//! total-least-squares estimate seeds a seeded RANSAC search, and the winning
//! consensus set is refit with total least squares.

use contracts::LineFitConfig;
use nalgebra::{Matrix2, Point2, SymmetricEigen, Vector2};
use rand::seq::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};

/// Minimal number of points defining a line
pub const LINE_MIN_SAMPLES: usize = 2;

/// Line in normal form: all `p` with `(p - point) · normal == 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineModel {
    /// Unit normal, oriented so that the direction has a non-negative x component
    pub normal: Vector2<f64>,
    /// A point on the line
    pub point: Point2<f64>,
}

impl LineModel {
    fn new(normal: Vector2<f64>, point: Point2<f64>) -> Option<Self> {
        let norm = normal.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return None;
        }
        let mut normal = normal / norm;
        if normal.y > 0.0 || (normal.y == 0.0 && normal.x < 0.0) {
            normal = -normal;
        }
        Some(Self { normal, point })
    }

    /// Line through two points
    pub fn through(a: &Point2<f64>, b: &Point2<f64>) -> Option<Self> {
        let d = b - a;
        Self::new(Vector2::new(-d.y, d.x), *a)
    }

    /// Unit direction `(-n_y, n_x)`
    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(-self.normal.y, self.normal.x)
    }

    /// Perpendicular distance of `p` to the line
    pub fn distance(&self, p: &Point2<f64>) -> f64 {
        (p - self.point).dot(&self.normal).abs()
    }

    /// y where the line crosses the vertical `x`.
    ///
    /// `None` when the direction's x component is below `min_x_component`.
    pub fn y_at(&self, x: f64, min_x_component: f64) -> Option<f64> {
        let direction = self.direction();
        if direction.x.abs() < min_x_component || direction.x == 0.0 {
            return None;
        }
        let t = (x - self.point.x) / direction.x;
        Some(self.point.y + t * direction.y)
    }
}

/// Result of a line fit
#[derive(Debug, Clone, PartialEq)]
pub struct LineFit {
    pub model: LineModel,
    /// Indices of the points within the inlier distance
    pub inliers: Vec<usize>,
}

/// Given a 2-D point cloud, return line parameters or nothing.
pub trait LineFitter: Send + Sync {
    fn fit_line(&self, points: &[Point2<f64>]) -> Option<LineFit>;
}

/// Closed-form total least squares over the selected points.
///
/// The normal is the eigenvector of the smallest eigenvalue of the scatter
/// matrix. Returns `None` for fewer than two points or coincident points.
pub fn fit_total_least_squares(points: &[Point2<f64>], indices: &[usize]) -> Option<LineModel> {
    if indices.len() < LINE_MIN_SAMPLES {
        return None;
    }
    let n = indices.len() as f64;
    let centroid = indices
        .iter()
        .filter_map(|&i| points.get(i))
        .fold(Vector2::zeros(), |acc, p| acc + p.coords)
        / n;

    let scatter = indices
        .iter()
        .filter_map(|&i| points.get(i))
        .fold(Matrix2::zeros(), |acc, p| {
            let d = p.coords - centroid;
            acc + d * d.transpose()
        });
    if scatter.trace() <= f64::EPSILON {
        return None;
    }

    let eigen = SymmetricEigen::new(scatter);
    let smallest = if eigen.eigenvalues[0] <= eigen.eigenvalues[1] { 0 } else { 1 };
    let normal = eigen.eigenvectors.column(smallest).into_owned();
    LineModel::new(normal, Point2::from(centroid))
}

/// RANSAC line fitter
#[derive(Debug, Clone)]
pub struct RansacLineFitter {
    config: LineFitConfig,
}

impl RansacLineFitter {
    pub fn new(config: LineFitConfig) -> Self {
        Self { config }
    }

    fn inliers_of(&self, model: &LineModel, points: &[Point2<f64>]) -> (Vec<usize>, f64) {
        let mut inliers = Vec::with_capacity(points.len());
        let mut squared = 0.0;
        for (i, p) in points.iter().enumerate() {
            let r = model.distance(p);
            if r <= self.config.max_inlier_distance_px {
                inliers.push(i);
                squared += r * r;
            }
        }
        let rms = if inliers.is_empty() {
            f64::INFINITY
        } else {
            (squared / inliers.len() as f64).sqrt()
        };
        (inliers, rms)
    }

    /// Refit on the consensus set and re-score; keeps the hypothesis when the refit degenerates.
    fn refine(&self, model: LineModel, points: &[Point2<f64>]) -> Option<Candidate> {
        let (inliers, rms) = self.inliers_of(&model, points);
        if inliers.len() < LINE_MIN_SAMPLES {
            return None;
        }
        let candidate = match fit_total_least_squares(points, &inliers) {
            Some(refit) => {
                let (refit_inliers, refit_rms) = self.inliers_of(&refit, points);
                if refit_inliers.len() >= inliers.len() {
                    Candidate {
                        model: refit,
                        inliers: refit_inliers,
                        rms: refit_rms,
                    }
                } else {
                    Candidate { model, inliers, rms }
                }
            }
            None => Candidate { model, inliers, rms },
        };
        Some(candidate)
    }
}

struct Candidate {
    model: LineModel,
    inliers: Vec<usize>,
    rms: f64,
}

impl Candidate {
    fn is_better_than(&self, other: &Candidate) -> bool {
        self.inliers.len() > other.inliers.len()
            || (self.inliers.len() == other.inliers.len() && self.rms < other.rms)
    }
}

/// Dynamic iteration bound from the current inlier ratio
fn required_iterations(confidence: f64, inlier_ratio: f64, iterations_so_far: usize, max_iterations: usize) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iterations;
    }
    let denom = (1.0 - inlier_ratio.powi(LINE_MIN_SAMPLES as i32)).max(1e-12).ln();
    if denom >= 0.0 {
        return max_iterations;
    }
    let n = ((1.0 - confidence).ln() / denom).ceil() as usize;
    n.clamp(iterations_so_far, max_iterations)
}

impl LineFitter for RansacLineFitter {
    fn fit_line(&self, points: &[Point2<f64>]) -> Option<LineFit> {
        if points.len() < LINE_MIN_SAMPLES {
            return None;
        }

        let all: Vec<usize> = (0..points.len()).collect();
        let mut best = fit_total_least_squares(points, &all).and_then(|m| self.refine(m, points));

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut budget = match &best {
            Some(b) => required_iterations(
                self.config.desired_probability,
                b.inliers.len() as f64 / points.len() as f64,
                0,
                self.config.max_iterations,
            ),
            None => self.config.max_iterations,
        };

        let mut iterations = 0;
        while iterations < budget {
            iterations += 1;
            let sample: Vec<usize> = all
                .choose_multiple(&mut rng, LINE_MIN_SAMPLES)
                .copied()
                .collect();
            let (a, b) = (&points[sample[0]], &points[sample[1]]);
            if (b - a).norm() < f64::EPSILON {
                continue;
            }
            let Some(hypothesis) = LineModel::through(a, b) else {
                continue;
            };
            let Some(candidate) = self.refine(hypothesis, points) else {
                continue;
            };

            let improved = match &best {
                Some(current) => candidate.is_better_than(current),
                None => true,
            };
            if improved {
                budget = required_iterations(
                    self.config.desired_probability,
                    candidate.inliers.len() as f64 / points.len() as f64,
                    iterations,
                    self.config.max_iterations,
                );
                best = Some(candidate);
            }
        }

        best.map(|c| LineFit {
            model: c.model,
            inliers: c.inliers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitter() -> RansacLineFitter {
        RansacLineFitter::new(LineFitConfig::default())
    }

    #[test]
    fn test_total_least_squares_horizontal() {
        let points: Vec<_> = (0..10).map(|x| Point2::new(x as f64 * 10.0, 42.0)).collect();
        let all: Vec<usize> = (0..points.len()).collect();
        let model = fit_total_least_squares(&points, &all).unwrap();
        assert!((model.normal.y.abs() - 1.0).abs() < 1e-9);
        assert!(model.direction().x > 0.0);
        let y = model.y_at(250.0, 0.01).unwrap();
        assert!((y - 42.0).abs() < 1e-9, "y = {y}");
    }

    #[test]
    fn test_total_least_squares_degenerate() {
        let points = vec![Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)];
        assert!(fit_total_least_squares(&points, &[0, 1]).is_none());
        assert!(fit_total_least_squares(&points, &[0]).is_none());
    }

    #[test]
    fn test_ransac_rejects_outliers() {
        // y = 0.1 x + 20 with two gross outliers
        let mut points: Vec<_> = (0..20)
            .map(|i| {
                let x = i as f64 * 15.0;
                Point2::new(x, 0.1 * x + 20.0)
            })
            .collect();
        points[3].y += 80.0;
        points[11].y -= 60.0;

        let fit = fitter().fit_line(&points).unwrap();
        assert_eq!(fit.inliers.len(), 18);
        assert!(!fit.inliers.contains(&3));
        assert!(!fit.inliers.contains(&11));
        let y = fit.model.y_at(100.0, 0.01).unwrap();
        assert!((y - 30.0).abs() < 1e-6, "y = {y}");
    }

    #[test]
    fn test_ransac_is_deterministic() {
        let points: Vec<_> = (0..15)
            .map(|i| Point2::new(i as f64, ((i * 7919) % 13) as f64 * 0.3))
            .collect();
        let a = fitter().fit_line(&points);
        let b = fitter().fit_line(&points);
        assert_eq!(a, b);
    }

    #[test]
    fn test_vertical_line_has_no_crossing() {
        let model = LineModel::through(&Point2::new(5.0, 0.0), &Point2::new(5.0, 10.0)).unwrap();
        assert!(model.y_at(2.0, 0.01).is_none());
    }

    #[test]
    fn test_too_few_points() {
        assert!(fitter().fit_line(&[Point2::new(0.0, 0.0)]).is_none());
    }
}

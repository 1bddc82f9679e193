//! Per-frame transform lookup
//!
//! A tracker frame carries a handful of named transforms. The repository
//! answers `A -> B` queries from them: directly, through the inverse of
//! `B -> A`, or by chaining through one intermediate coordinate frame.

use contracts::{RigidTransform, TrackerFrame, TransformName};
use nalgebra::Matrix4;
use std::collections::{BTreeSet, HashMap};

/// Valid transforms of one tracker frame, keyed by name
#[derive(Debug, Clone, Default)]
pub struct TransformRepository {
    transforms: HashMap<TransformName, Matrix4<f64>>,
    frames: BTreeSet<String>,
}

impl TransformRepository {
    /// Collect the valid transforms of `frame`; invalid or missing ones are ignored.
    pub fn from_frame(frame: &TrackerFrame) -> Self {
        let mut repository = Self::default();
        for named in frame.transforms.iter().filter(|t| t.is_valid()) {
            repository.insert(named.name.clone(), &named.transform);
        }
        repository
    }

    pub fn insert(&mut self, name: TransformName, transform: &RigidTransform) {
        self.frames.insert(name.from_frame().to_string());
        self.frames.insert(name.to_frame().to_string());
        self.transforms.insert(name, to_matrix(transform));
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Resolve `name`, or `None` when no chain of at most two stored transforms reaches it.
    pub fn resolve(&self, name: &TransformName) -> Option<Matrix4<f64>> {
        if name.from_frame() == name.to_frame() {
            return Some(Matrix4::identity());
        }
        if let Some(m) = self.direct(name.from_frame(), name.to_frame()) {
            return Some(m);
        }

        self.frames
            .iter()
            .filter(|x| x.as_str() != name.from_frame() && x.as_str() != name.to_frame())
            .find_map(|x| {
                let from_to_x = self.direct(name.from_frame(), x)?;
                let x_to_to = self.direct(x, name.to_frame())?;
                Some(x_to_to * from_to_x)
            })
    }

    /// Translation part of the resolved transform
    pub fn resolve_translation(&self, name: &TransformName) -> Option<[f64; 3]> {
        let m = self.resolve(name)?;
        let t = [m[(0, 3)], m[(1, 3)], m[(2, 3)]];
        t.iter().all(|v| v.is_finite()).then_some(t)
    }

    fn direct(&self, from: &str, to: &str) -> Option<Matrix4<f64>> {
        let name = TransformName::new(from, to).ok()?;
        if let Some(m) = self.transforms.get(&name) {
            return Some(*m);
        }
        self.transforms.get(&name.inverted())?.try_inverse()
    }
}

fn to_matrix(transform: &RigidTransform) -> Matrix4<f64> {
    Matrix4::from_fn(|r, c| transform.matrix[r][c])
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{NamedTransform, TransformStatus};

    fn name(s: &str) -> TransformName {
        s.parse().unwrap()
    }

    fn frame(transforms: Vec<NamedTransform>) -> TrackerFrame {
        TrackerFrame {
            timestamp: 0.0,
            transforms,
        }
    }

    #[test]
    fn test_direct_and_inverse() {
        let repo = TransformRepository::from_frame(&frame(vec![NamedTransform::new(
            name("ProbeToReference"),
            RigidTransform::from_translation([1.0, 2.0, 3.0]),
        )]));

        let t = repo.resolve_translation(&name("ProbeToReference")).unwrap();
        assert_eq!(t, [1.0, 2.0, 3.0]);

        let inv = repo.resolve_translation(&name("ReferenceToProbe")).unwrap();
        for (a, b) in inv.iter().zip([-1.0, -2.0, -3.0]) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_chain_through_tracker() {
        // probe at (10, 0, 0) and reference at (4, 1, 0), both in tracker coordinates
        let repo = TransformRepository::from_frame(&frame(vec![
            NamedTransform::new(
                name("ProbeToTracker"),
                RigidTransform::from_translation([10.0, 0.0, 0.0]),
            ),
            NamedTransform::new(
                name("ReferenceToTracker"),
                RigidTransform::from_translation([4.0, 1.0, 0.0]),
            ),
        ]));

        let t = repo.resolve_translation(&name("ProbeToReference")).unwrap();
        assert!((t[0] - 6.0).abs() < 1e-12, "t = {t:?}");
        assert!((t[1] + 1.0).abs() < 1e-12, "t = {t:?}");
        assert!(t[2].abs() < 1e-12, "t = {t:?}");
    }

    #[test]
    fn test_invalid_transforms_are_ignored() {
        let mut probe = NamedTransform::new(
            name("ProbeToReference"),
            RigidTransform::from_translation([1.0, 0.0, 0.0]),
        );
        probe.status = TransformStatus::Invalid;
        let repo = TransformRepository::from_frame(&frame(vec![probe]));
        assert!(repo.is_empty());
        assert!(repo.resolve(&name("ProbeToReference")).is_none());
    }

    #[test]
    fn test_singular_inverse_fails() {
        let mut singular = RigidTransform::IDENTITY;
        singular.matrix[0][0] = 0.0;
        let repo = TransformRepository::from_frame(&frame(vec![NamedTransform::new(
            name("ProbeToReference"),
            singular,
        )]));
        assert!(repo.resolve(&name("ProbeToReference")).is_some());
        assert!(repo.resolve(&name("ReferenceToProbe")).is_none());
    }

    #[test]
    fn test_unknown_frame() {
        let repo = TransformRepository::from_frame(&frame(vec![NamedTransform::new(
            name("ProbeToReference"),
            RigidTransform::IDENTITY,
        )]));
        assert!(repo.resolve(&name("StylusToReference")).is_none());
    }
}

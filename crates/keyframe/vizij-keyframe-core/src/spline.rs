//! Cached cubic coefficients for the segment selected by the [`SegmentWindow`](crate::segment::SegmentWindow).

use nalgebra::{UnitQuaternion, Vector3};

use crate::interp::{hermite_coefficients, hermite_position, squad};
use crate::keyframe::KeyFrame;
use crate::pose::Pose;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplineCache {
    v1: Vector3<f64>,
    v2: Vector3<f64>,
    valid: bool,
}

impl Default for SplineCache {
    fn default() -> Self {
        Self {
            v1: Vector3::zeros(),
            v2: Vector3::zeros(),
            valid: false,
        }
    }
}

impl SplineCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Recompute the cubic terms of the segment `from -> to`.
    pub fn refresh(&mut self, from: &KeyFrame, to: &KeyFrame) {
        let (v1, v2) = hermite_coefficients(
            &from.position,
            &from.tangent_position,
            &to.position,
            &to.tangent_position,
        );
        self.v1 = v1;
        self.v2 = v2;
        self.valid = true;
    }

    #[inline]
    pub fn coefficients(&self) -> (Vector3<f64>, Vector3<f64>) {
        (self.v1, self.v2)
    }

    /// Position on the cached segment starting at `from`, at normalized parameter `alpha`.
    #[inline]
    pub fn position(&self, from: &KeyFrame, alpha: f64) -> Vector3<f64> {
        hermite_position(&from.position, &from.tangent_position, &self.v1, &self.v2, alpha)
    }

    /// Full pose on the segment `from -> to`: cubic position, squad orientation.
    pub fn pose(&self, from: &KeyFrame, to: &KeyFrame, alpha: f64) -> Pose {
        let orientation = squad(
            &from.orientation,
            &from.tangent_orientation,
            &to.tangent_orientation,
            &to.orientation,
            alpha,
        );
        // Segment end is pinned to the keyframe; the cubic only reaches it up to rounding.
        let position = if alpha >= 1.0 {
            to.position
        } else {
            self.position(from, alpha)
        };
        Pose::new(position, UnitQuaternion::new_normalize(orientation))
    }
}

/// Normalized position of `time` inside `[from.time, to.time]`; 0 for a degenerate segment.
#[inline]
pub fn segment_alpha(from: &KeyFrame, to: &KeyFrame, time: f64) -> f64 {
    let dt = to.time() - from.time();
    if dt == 0.0 {
        0.0
    } else {
        (time - from.time()) / dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver;
    use approx::assert_relative_eq;

    #[test]
    fn cached_segment_matches_endpoints() {
        let mut frames = vec![
            KeyFrame::new(Pose::from_position(Vector3::new(0.0, 0.0, 0.0)), 0.0),
            KeyFrame::new(Pose::from_position(Vector3::new(2.0, 0.0, 0.0)), 1.0),
            KeyFrame::new(Pose::from_position(Vector3::new(2.0, 2.0, 0.0)), 3.0),
        ];
        resolver::refresh(&mut frames);

        let mut cache = SplineCache::new();
        assert!(!cache.is_valid());
        cache.refresh(&frames[1], &frames[2]);
        assert!(cache.is_valid());

        assert_relative_eq!(cache.position(&frames[1], 0.0), frames[1].position());
        assert_relative_eq!(
            cache.position(&frames[1], 1.0),
            frames[2].position(),
            epsilon = 1e-12
        );
        assert_relative_eq!(segment_alpha(&frames[1], &frames[2], 2.0), 0.5);
        assert_eq!(segment_alpha(&frames[1], &frames[1], 2.0), 0.0);
    }
}

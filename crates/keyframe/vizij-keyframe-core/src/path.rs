//! Path discretization for previews, and the renderer contract that consumes it.

use log::debug;
use nalgebra::Vector3;

use crate::config::{PathDrawConfig, PathMask};
use crate::interpolator::Interpolator;
use crate::keyframe::KeyFrame;
use crate::pose::Pose;
use crate::spline::SplineCache;

/// Drawing primitives supplied by the host renderer.
pub trait PathRenderer {
    /// Line strip through the sampled positions.
    fn draw_polyline(&mut self, points: &[Vector3<f64>]);
    /// Camera glyph placed at `pose`.
    fn draw_camera(&mut self, pose: &Pose, scale: f64);
    /// Axis triad placed at `pose`.
    fn draw_axis(&mut self, pose: &Pose, length: f64);
}

/// Cached samples of the whole path.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathCache {
    samples: Vec<Pose>,
    steps: usize,
    valid: bool,
}

impl PathCache {
    #[inline]
    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    #[inline]
    pub(crate) fn is_valid_for(&self, steps: usize) -> bool {
        self.valid && self.steps == steps
    }
}

/// Sample `steps` poses per segment (alpha = step / steps) and close with the exact
/// last keyframe. Expects refreshed keyframe values.
///
/// Yields `steps * (n - 1) + 1` poses for `n >= 2` keyframes, one for a single
/// keyframe and none for an empty slice.
pub fn sample_keyframes(frames: &[KeyFrame], steps: usize) -> Vec<Pose> {
    let steps = steps.max(1);
    let Some(last) = frames.last() else {
        return Vec::new();
    };

    let mut samples = Vec::with_capacity(steps * (frames.len() - 1) + 1);
    for pair in frames.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let mut spline = SplineCache::new();
        spline.refresh(from, to);
        for step in 0..steps {
            let alpha = step as f64 / steps as f64;
            samples.push(spline.pose(from, to, alpha));
        }
    }
    samples.push(last.pose());
    samples
}

/// Every `steps / density`-th sample, with `density` clamped to `[1, steps]`.
pub fn strided<'a>(
    samples: &'a [Pose],
    steps: usize,
    density: usize,
) -> impl Iterator<Item = &'a Pose> + 'a {
    let steps = steps.max(1);
    let stride = steps / density.clamp(1, steps);
    samples.iter().step_by(stride.max(1))
}

impl Interpolator {
    /// Samples per segment used by [`sample_path`](Self::sample_path) and `draw_path`.
    #[inline]
    pub fn path_steps(&self) -> usize {
        self.path_steps
    }

    pub fn set_path_steps(&mut self, steps: usize) {
        self.path_steps = steps.max(1);
    }

    #[inline]
    pub fn path_is_valid(&self) -> bool {
        self.path.is_valid_for(self.path_steps) && !self.sources_modified.get()
    }

    /// Sampled path with the configured step count.
    pub fn sample_path(&mut self) -> &[Pose] {
        let steps = self.path_steps;
        self.sample_path_with_steps(steps)
    }

    /// Sampled path with `steps` samples per segment. Cached until keyframes, their
    /// values, or the step count change.
    pub fn sample_path_with_steps(&mut self, steps: usize) -> &[Pose] {
        let steps = steps.max(1);
        self.sync_source_changes();
        if !self.path.is_valid_for(steps) {
            if self.keyframes.is_empty() {
                self.path.samples.clear();
            } else {
                if !self.values_valid {
                    self.refresh_values();
                }
                self.path.samples = sample_keyframes(self.keyframes.as_slice(), steps);
                debug!(
                    "path resampled: {} poses ({} per segment)",
                    self.path.samples.len(),
                    steps
                );
            }
            self.path.steps = steps;
            self.path.valid = true;
        }
        &self.path.samples
    }

    /// Poses for glyph placement: `density` glyphs per segment (see [`strided`]).
    pub fn path_glyph_poses(&mut self, density: usize) -> Vec<Pose> {
        let steps = self.path_steps;
        let samples = self.sample_path_with_steps(steps);
        strided(samples, steps, density).copied().collect()
    }

    /// Hand the sampled path to `renderer` according to `cfg.mask`.
    pub fn draw_path(&mut self, renderer: &mut dyn PathRenderer, cfg: &PathDrawConfig) {
        if cfg.mask.is_empty() {
            return;
        }

        if cfg.mask.contains(PathMask::POSITION) {
            let points: Vec<Vector3<f64>> =
                self.sample_path().iter().map(|p| p.position).collect();
            if !points.is_empty() {
                renderer.draw_polyline(&points);
            }
        }

        if cfg.mask.intersects(PathMask::CAMERA | PathMask::AXIS) {
            for pose in self.path_glyph_poses(cfg.density) {
                if cfg.mask.contains(PathMask::CAMERA) {
                    renderer.draw_camera(&pose, cfg.scale);
                }
                if cfg.mask.contains(PathMask::AXIS) {
                    renderer.draw_axis(&pose, cfg.scale / 10.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver;

    #[test]
    fn stride_follows_density() {
        let samples: Vec<Pose> = (0..61)
            .map(|i| Pose::from_position(Vector3::new(i as f64, 0.0, 0.0)))
            .collect();
        let picked: Vec<f64> = strided(&samples, 30, 6).map(|p| p.position.x).collect();
        assert_eq!(picked.len(), 13);
        assert_eq!(picked[1], 5.0);
        assert_eq!(*picked.last().unwrap(), 60.0);

        assert_eq!(strided(&samples, 30, 0).count(), 3);
        assert_eq!(strided(&samples, 30, 100).count(), 61);
    }

    #[test]
    fn sample_counts() {
        let mut frames: Vec<KeyFrame> = (0..4)
            .map(|i| KeyFrame::new(Pose::identity(), i as f64))
            .collect();
        resolver::refresh(&mut frames);
        assert_eq!(sample_keyframes(&frames, 10).len(), 31);
        assert_eq!(sample_keyframes(&frames[..1], 10).len(), 1);
        assert!(sample_keyframes(&[], 10).is_empty());
    }
}

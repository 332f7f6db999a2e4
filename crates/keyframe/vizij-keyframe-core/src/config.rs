//! Interpolator configuration.

use serde::{Deserialize, Serialize};

/// Default tick period of the playback driver, in milliseconds.
pub const DEFAULT_PERIOD_MS: u32 = 40;
/// Default number of samples generated per keyframe segment by the path sampler.
pub const DEFAULT_PATH_STEPS: usize = 30;

/// Playback and sampling defaults applied when an interpolator is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolatorConfig {
    /// Tick period of the playback driver (ms).
    pub period_ms: u32,
    /// Playback speed multiplier; negative values play backwards.
    pub speed: f64,
    /// Wrap around at path ends instead of stopping.
    pub loop_interpolation: bool,
    /// Reserved: persisted and toggled, not used by segment math.
    pub closed_path: bool,
    /// Samples per segment used by `sample_path` when no explicit count is given.
    pub path_steps: usize,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            speed: 1.0,
            loop_interpolation: false,
            closed_path: false,
            path_steps: DEFAULT_PATH_STEPS,
        }
    }
}

/// Bit mask selecting what `draw_path` hands to the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMask(pub u8);

impl PathMask {
    pub const NONE: PathMask = PathMask(0);
    /// Position polyline.
    pub const POSITION: PathMask = PathMask(1);
    /// Camera glyph at sampled poses.
    pub const CAMERA: PathMask = PathMask(2);
    /// Axis glyph at sampled poses.
    pub const AXIS: PathMask = PathMask(4);

    #[inline]
    pub fn contains(self, other: PathMask) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[inline]
    pub fn intersects(self, other: PathMask) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for PathMask {
    type Output = PathMask;

    fn bitor(self, rhs: PathMask) -> PathMask {
        PathMask(self.0 | rhs.0)
    }
}

/// Renderer-facing options for `draw_path`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathDrawConfig {
    pub mask: PathMask,
    /// Glyphs drawn per segment; clamped to `[1, path_steps]`. Should divide the step count.
    pub density: usize,
    /// Size of camera glyphs; axis glyphs use a tenth of it.
    pub scale: f64,
}

impl Default for PathDrawConfig {
    fn default() -> Self {
        Self {
            mask: PathMask::POSITION,
            density: 6,
            scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: InterpolatorConfig = serde_json::from_str(r#"{"speed": 2.0}"#).unwrap();
        assert_eq!(cfg.speed, 2.0);
        assert_eq!(cfg.period_ms, DEFAULT_PERIOD_MS);
        assert_eq!(cfg.path_steps, DEFAULT_PATH_STEPS);
        assert!(!cfg.loop_interpolation);
    }

    #[test]
    fn mask_bits_combine() {
        let mask = PathMask::POSITION | PathMask::AXIS;
        assert!(mask.contains(PathMask::POSITION));
        assert!(!mask.contains(PathMask::CAMERA));
        assert!(mask.intersects(PathMask::CAMERA | PathMask::AXIS));
        assert!(PathMask::NONE.is_empty());
    }
}

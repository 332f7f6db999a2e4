//! Sliding four-keyframe window bracketing the current query time.

use crate::keyframe::KeyFrame;

/// Cursor slots: `[prev2, prev, next, next2]`.
pub const PREV2: usize = 0;
pub const PREV: usize = 1;
pub const NEXT: usize = 2;
pub const NEXT2: usize = 3;

/// Indices of the keyframes around the query time, plus one extra neighbour on
/// each side. Cursors are clamped to the store bounds at the path ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmentWindow {
    cursors: [usize; 4],
    valid: bool,
}

impl SegmentWindow {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Force a full re-scan on the next `locate`.
    #[inline]
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    #[inline]
    pub fn cursors(&self) -> [usize; 4] {
        self.cursors
    }

    #[inline]
    pub fn prev(&self) -> usize {
        self.cursors[PREV]
    }

    #[inline]
    pub fn next(&self) -> usize {
        self.cursors[NEXT]
    }

    /// Move the window so that `frames[prev].time <= time <= frames[next].time`
    /// (clamped at the ends).
    ///
    /// Walks from the previous position, so monotonically advancing queries cost
    /// amortized O(1). Returns true when the window moved, meaning any spline
    /// coefficients derived from it are stale. `frames` must be non-empty.
    pub fn locate(&mut self, frames: &[KeyFrame], time: f64) -> bool {
        debug_assert!(!frames.is_empty());
        let last = frames.len() - 1;

        if !self.valid || self.cursors.iter().any(|&c| c > last) {
            self.valid = false;
            self.cursors[PREV] = 0;
        }

        while frames[self.cursors[PREV]].time() > time {
            self.valid = false;
            if self.cursors[PREV] == 0 {
                break;
            }
            self.cursors[PREV] -= 1;
        }

        if !self.valid {
            self.cursors[NEXT] = self.cursors[PREV];
        }

        while frames[self.cursors[NEXT]].time() < time {
            self.valid = false;
            if self.cursors[NEXT] == last {
                break;
            }
            self.cursors[NEXT] += 1;
        }

        if self.valid {
            return false;
        }

        let next = self.cursors[NEXT];
        let mut prev = next;
        if prev > 0 && time < frames[next].time() {
            prev -= 1;
        }
        self.cursors = [prev.saturating_sub(1), prev, next, (next + 1).min(last)];
        self.valid = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    fn frames(times: &[f64]) -> Vec<KeyFrame> {
        times
            .iter()
            .map(|&t| KeyFrame::new(Pose::identity(), t))
            .collect()
    }

    #[test]
    fn brackets_interior_time() {
        let kfs = frames(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let mut w = SegmentWindow::new();
        assert!(w.locate(&kfs, 2.5));
        assert_eq!(w.cursors(), [1, 2, 3, 4]);
    }

    #[test]
    fn clamps_at_path_ends() {
        let kfs = frames(&[0.0, 1.0, 2.0]);
        let mut w = SegmentWindow::new();
        w.locate(&kfs, -1.0);
        assert_eq!(w.cursors(), [0, 0, 0, 1]);
        w.locate(&kfs, 5.0);
        assert_eq!(w.cursors(), [1, 2, 2, 2]);
        w.locate(&kfs, 0.5);
        assert_eq!(w.cursors(), [0, 0, 1, 2]);
    }

    #[test]
    fn stays_put_while_time_is_inside_segment() {
        let kfs = frames(&[0.0, 1.0, 2.0]);
        let mut w = SegmentWindow::new();
        assert!(w.locate(&kfs, 0.2));
        assert!(!w.locate(&kfs, 0.4));
        assert!(!w.locate(&kfs, 1.0));
        assert!(w.locate(&kfs, 1.5));
        assert_eq!((w.prev(), w.next()), (1, 2));
    }

    #[test]
    fn seeking_backwards_rescans() {
        let kfs = frames(&[0.0, 1.0, 2.0, 3.0]);
        let mut w = SegmentWindow::new();
        w.locate(&kfs, 2.5);
        assert!(w.locate(&kfs, 0.5));
        assert_eq!((w.prev(), w.next()), (0, 1));
    }

    #[test]
    fn exact_keyframe_time_selects_degenerate_segment() {
        let kfs = frames(&[0.0, 1.0, 2.0]);
        let mut w = SegmentWindow::new();
        w.locate(&kfs, 1.0);
        assert_eq!((w.prev(), w.next()), (1, 1));
    }
}

//! Pose resolver: refresh keyframe values from live sources, enforce orientation
//! continuity, and recompute tangents.

use log::{debug, warn};

use crate::interp::squad_tangent;
use crate::keyframe::KeyFrame;

/// Bring every keyframe's derived values up to date.
///
/// 1. Live keyframes copy their source's current pose.
/// 2. Each orientation is negated if it lies in the opposite hemisphere of the
///    previous (already fixed) one, so interpolation takes the shorter arc.
/// 3. Tangents use the neighbouring keyframes; the path ends duplicate themselves
///    as the missing neighbour.
pub fn refresh(frames: &mut [KeyFrame]) {
    if frames.is_empty() {
        return;
    }

    for kf in frames.iter_mut() {
        if kf.is_live() && !kf.snapshot_source() {
            warn!(
                "live source for keyframe at t={} was dropped; keeping last snapshot",
                kf.time()
            );
        }
    }

    for i in 1..frames.len() {
        let prev_q = frames[i - 1].orientation;
        if prev_q.dot(&frames[i].orientation) < 0.0 {
            frames[i].orientation = -frames[i].orientation;
        }
    }

    let n = frames.len();
    for i in 0..n {
        let prev = i.saturating_sub(1);
        let next = (i + 1).min(n - 1);
        let tangent_position = (frames[next].position - frames[prev].position) * 0.5;
        let tangent_orientation = squad_tangent(
            &frames[prev].orientation,
            &frames[i].orientation,
            &frames[next].orientation,
        );
        frames[i].tangent_position = tangent_position;
        frames[i].tangent_orientation = tangent_orientation;
    }

    debug!("keyframe values refreshed ({n} keyframes)");
}

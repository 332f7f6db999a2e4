//! Interpolator: keyframe ownership, cache bookkeeping and per-time evaluation.
//!
//! Playback lives in `playback.rs`, path sampling in `path.rs` and persistence in
//! `persist.rs`; all of them extend [`Interpolator`].
//!
//! Cache flags and what clears them:
//! - values (live snapshots, continuity, tangents): any store edit, any live source change
//! - segment window: any store edit
//! - spline coefficients: window moved, values refreshed
//! - sampled path: any store edit, values refreshed

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::debug;

use crate::config::InterpolatorConfig;
use crate::error::KeyframeError;
use crate::events::{EventListeners, InterpolatorEvent, ListenerId};
use crate::keyframe::{weak_source, KeyFrame, KeyFrameStore};
use crate::path::PathCache;
use crate::playback::{PlaybackState, PlaybackTimer};
use crate::pose::{ChangeListener, Pose, PoseSink, PoseSource};
use crate::resolver;
use crate::segment::SegmentWindow;
use crate::spline::{segment_alpha, SplineCache};

/// Drives a target pose along a smooth path through timed keyframes.
pub struct Interpolator {
    pub(crate) keyframes: KeyFrameStore,
    pub(crate) target: Option<Weak<RefCell<dyn PoseSink>>>,

    pub(crate) interpolation_time: f64,
    pub(crate) speed: f64,
    pub(crate) period_ms: u32,
    pub(crate) loop_interpolation: bool,
    pub(crate) closed_path: bool,
    pub(crate) path_steps: usize,

    pub(crate) values_valid: bool,
    /// Set by live sources through their `ChangeListener`s.
    pub(crate) sources_modified: Rc<Cell<bool>>,
    pub(crate) window: SegmentWindow,
    pub(crate) spline: SplineCache,
    pub(crate) path: PathCache,

    pub(crate) state: PlaybackState,
    pub(crate) tick_accumulator_ms: f64,
    pub(crate) timer: Option<Box<dyn PlaybackTimer>>,
    pub(crate) listeners: EventListeners,
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpolator")
            .field("keyframes", &self.keyframes.len())
            .field("has_target", &self.has_target())
            .field("interpolation_time", &self.interpolation_time)
            .field("speed", &self.speed)
            .field("period_ms", &self.period_ms)
            .field("loop_interpolation", &self.loop_interpolation)
            .field("closed_path", &self.closed_path)
            .field("state", &self.state)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new(InterpolatorConfig::default())
    }
}

impl Interpolator {
    /// Create an interpolator with no keyframes and no target.
    pub fn new(cfg: InterpolatorConfig) -> Self {
        Self {
            keyframes: KeyFrameStore::new(),
            target: None,
            interpolation_time: 0.0,
            speed: cfg.speed,
            period_ms: cfg.period_ms,
            loop_interpolation: cfg.loop_interpolation,
            closed_path: cfg.closed_path,
            path_steps: cfg.path_steps.max(1),
            values_valid: true,
            sources_modified: Rc::new(Cell::new(false)),
            window: SegmentWindow::new(),
            spline: SplineCache::new(),
            path: PathCache::default(),
            state: PlaybackState::Stopped,
            tick_accumulator_ms: 0.0,
            timer: None,
            listeners: EventListeners::default(),
        }
    }

    /// Create an interpolator already driving `target`.
    pub fn with_target<S: PoseSink + 'static>(target: &Rc<RefCell<S>>) -> Self {
        let mut this = Self::default();
        this.set_target(target);
        this
    }

    // ----- target association -----

    /// Associate the pose driven by evaluation. Only a weak reference is kept.
    pub fn set_target<S: PoseSink + 'static>(&mut self, target: &Rc<RefCell<S>>) {
        let erased: Rc<RefCell<dyn PoseSink>> = target.clone();
        self.target = Some(Rc::downgrade(&erased));
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// True when a target is associated and still alive.
    pub fn has_target(&self) -> bool {
        self.target.as_ref().is_some_and(|t| t.strong_count() > 0)
    }

    // ----- keyframe store -----

    /// Append a keyframe holding a copy of `pose`.
    pub fn add_keyframe(&mut self, pose: Pose, time: f64) -> Result<(), KeyframeError> {
        self.push_keyframe(KeyFrame::new(pose, time))
    }

    /// Append a keyframe one second after the last one (or at 0.0 on an empty path).
    pub fn add_keyframe_auto(&mut self, pose: Pose) -> Result<(), KeyframeError> {
        let time = self.keyframes.next_auto_time();
        self.add_keyframe(pose, time)
    }

    /// Append a keyframe that follows `source`: whenever the source reports a change,
    /// the path is recomputed before the next evaluation.
    pub fn add_keyframe_source<S: PoseSource + 'static>(
        &mut self,
        source: &Rc<RefCell<S>>,
        time: f64,
    ) -> Result<(), KeyframeError> {
        self.push_keyframe(KeyFrame::from_source(weak_source(source), time))?;
        source
            .borrow_mut()
            .subscribe(ChangeListener::new(&self.sources_modified));
        Ok(())
    }

    /// Live-source variant of [`add_keyframe_auto`](Self::add_keyframe_auto).
    pub fn add_keyframe_source_auto<S: PoseSource + 'static>(
        &mut self,
        source: &Rc<RefCell<S>>,
    ) -> Result<(), KeyframeError> {
        let time = self.keyframes.next_auto_time();
        self.add_keyframe_source(source, time)
    }

    fn push_keyframe(&mut self, keyframe: KeyFrame) -> Result<(), KeyframeError> {
        let was_empty = self.keyframes.is_empty();
        let time = keyframe.time();
        self.keyframes.push(keyframe)?;
        if was_empty {
            self.interpolation_time = time;
        }
        self.invalidate_all();
        self.reset_interpolation();
        Ok(())
    }

    /// Remove every keyframe and stop playback.
    ///
    /// The source dirty flag is replaced, so listeners handed to earlier live sources
    /// go dead and are pruned by those sources.
    pub fn delete_path(&mut self) {
        self.stop_interpolation();
        self.keyframes.clear();
        self.sources_modified = Rc::new(Cell::new(false));
        self.invalidate_all();
    }

    pub(crate) fn invalidate_all(&mut self) {
        self.values_valid = false;
        self.path.invalidate();
        self.window.invalidate();
        self.spline.invalidate();
    }

    #[inline]
    pub fn keyframes(&self) -> &KeyFrameStore {
        &self.keyframes
    }

    #[inline]
    pub fn number_of_keyframes(&self) -> usize {
        self.keyframes.len()
    }

    /// Pose of keyframe `index`; live keyframes report their source's current pose.
    ///
    /// Once values have been refreshed the orientation may be the negated quaternion
    /// of what was stored (hemisphere continuity). It is the same rotation.
    pub fn keyframe(&self, index: usize) -> Result<Pose, KeyframeError> {
        self.keyframes
            .get(index)
            .map(KeyFrame::current_pose)
            .ok_or(KeyframeError::IndexOutOfRange {
                index,
                len: self.keyframes.len(),
            })
    }

    pub fn keyframe_time(&self, index: usize) -> Result<f64, KeyframeError> {
        self.keyframes
            .get(index)
            .map(KeyFrame::time)
            .ok_or(KeyframeError::IndexOutOfRange {
                index,
                len: self.keyframes.len(),
            })
    }

    /// Time of the first keyframe, 0.0 when the path is empty.
    #[inline]
    pub fn first_time(&self) -> f64 {
        self.keyframes.first_time()
    }

    /// Time of the last keyframe, 0.0 when the path is empty.
    #[inline]
    pub fn last_time(&self) -> f64 {
        self.keyframes.last_time()
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.last_time() - self.first_time()
    }

    // ----- resolver -----

    /// Mark keyframe values stale; they are recomputed lazily before the next use.
    pub fn invalidate_values(&mut self) {
        self.values_valid = false;
        self.path.invalidate();
        self.spline.invalidate();
    }

    #[inline]
    pub fn values_valid(&self) -> bool {
        self.values_valid && !self.sources_modified.get()
    }

    pub(crate) fn sync_source_changes(&mut self) {
        if self.sources_modified.replace(false) {
            debug!("live keyframe source modified; invalidating values");
            self.invalidate_values();
        }
    }

    /// Re-snapshot live sources, fix orientation continuity and recompute tangents.
    pub fn refresh_values(&mut self) {
        self.sources_modified.set(false);
        resolver::refresh(self.keyframes.as_mut_slice());
        self.values_valid = true;
        self.spline.invalidate();
        self.path.invalidate();
    }

    pub(crate) fn ensure_values(&mut self) {
        self.sync_source_changes();
        if !self.values_valid {
            self.refresh_values();
        }
    }

    // ----- evaluation -----

    #[inline]
    pub fn interpolation_time(&self) -> f64 {
        self.interpolation_time
    }

    /// Change the current time without moving the target.
    #[inline]
    pub fn set_interpolation_time(&mut self, time: f64) {
        self.interpolation_time = time;
    }

    /// Pose of the path at `time`, without touching the target or emitting events.
    /// Times outside the path clamp to the end keyframes. None on an empty path.
    pub fn pose_at(&mut self, time: f64) -> Option<Pose> {
        if self.keyframes.is_empty() {
            return None;
        }
        self.ensure_values();

        let frames = self.keyframes.as_slice();
        if self.window.locate(frames, time) {
            self.spline.invalidate();
        }
        let from = &frames[self.window.prev()];
        let to = &frames[self.window.next()];
        if !self.spline.is_valid() {
            self.spline.refresh(from, to);
        }
        let alpha = segment_alpha(from, to, time);
        Some(self.spline.pose(from, to, alpha))
    }

    /// Set the current time to `time` and move the target to the path pose there.
    ///
    /// Does nothing beyond updating the time when the path is empty or no live
    /// target is associated. Emits [`InterpolatorEvent::Interpolated`] otherwise.
    pub fn evaluate_at(&mut self, time: f64) {
        self.interpolation_time = time;

        let Some(target) = self.target.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let Some(pose) = self.pose_at(time) else {
            return;
        };

        target
            .borrow_mut()
            .set_position_and_orientation_with_constraint(pose.position, pose.orientation);
        self.listeners.emit(InterpolatorEvent::Interpolated { time });
    }

    // ----- events -----

    /// Register a listener for [`InterpolatorEvent`]s.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&InterpolatorEvent) + 'static,
    {
        self.listeners.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn emit(&mut self, event: InterpolatorEvent) {
        self.listeners.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Frame;
    use nalgebra::Vector3;

    #[test]
    fn store_edit_resets_time_to_first_keyframe() {
        let mut kfi = Interpolator::default();
        kfi.add_keyframe(Pose::identity(), 2.0).unwrap();
        assert_eq!(kfi.interpolation_time(), 2.0);
        kfi.set_interpolation_time(3.5);
        kfi.add_keyframe(Pose::identity(), 4.0).unwrap();
        assert_eq!(kfi.interpolation_time(), 2.0);
        assert!(!kfi.values_valid());
    }

    #[test]
    fn rejected_keyframe_leaves_state_untouched() {
        let mut kfi = Interpolator::default();
        kfi.add_keyframe(Pose::identity(), 0.0).unwrap();
        kfi.add_keyframe(Pose::identity(), 1.0).unwrap();
        kfi.refresh_values();
        kfi.set_interpolation_time(0.7);

        assert!(kfi.add_keyframe(Pose::identity(), 0.5).is_err());
        assert_eq!(kfi.number_of_keyframes(), 2);
        assert_eq!(kfi.interpolation_time(), 0.7);
        assert!(kfi.values_valid());
    }

    #[test]
    fn source_change_only_marks_values_stale() {
        let source = Rc::new(RefCell::new(Frame::default()));
        let mut kfi = Interpolator::default();
        kfi.add_keyframe_source(&source, 0.0).unwrap();
        kfi.refresh_values();
        assert!(kfi.values_valid());

        source
            .borrow_mut()
            .set_position(Vector3::new(1.0, 2.0, 3.0));
        assert!(!kfi.values_valid());
        assert_eq!(
            kfi.keyframes().first().unwrap().position(),
            Vector3::zeros()
        );

        let pose = kfi.pose_at(0.0).unwrap();
        assert_eq!(pose.position, Vector3::new(1.0, 2.0, 3.0));
        assert!(kfi.values_valid());
    }

    #[test]
    fn live_source_is_subscribed_once() {
        let source = Rc::new(RefCell::new(Frame::default()));
        let mut kfi = Interpolator::default();
        kfi.add_keyframe_source(&source, 0.0).unwrap();
        kfi.add_keyframe_source(&source, 1.0).unwrap();
        assert_eq!(source.borrow().listener_count(), 1);

        for _ in 0..5 {
            kfi.delete_path();
            kfi.add_keyframe_source(&source, 0.0).unwrap();
        }
        assert_eq!(source.borrow().listener_count(), 1);

        kfi.refresh_values();
        source
            .borrow_mut()
            .set_position(Vector3::new(0.0, 0.0, 2.0));
        assert!(!kfi.values_valid());
    }

    #[test]
    fn refreshed_keyframe_keeps_rotation_after_sign_flip() {
        use nalgebra::UnitQuaternion;

        let stored = UnitQuaternion::new_unchecked(
            -UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.4).into_inner(),
        );
        let mut kfi = Interpolator::default();
        kfi.add_keyframe(Pose::identity(), 0.0).unwrap();
        kfi.add_keyframe(Pose::new(Vector3::zeros(), stored), 1.0).unwrap();
        kfi.refresh_values();

        let reported = kfi.keyframe(1).unwrap().orientation;
        assert!((reported.w + stored.w).abs() < 1e-12);
        assert!(reported.angle_to(&stored) < 1e-9);
    }

    #[test]
    fn keyframe_accessors_report_out_of_range() {
        let kfi = Interpolator::default();
        assert_eq!(
            kfi.keyframe(0).unwrap_err(),
            KeyframeError::IndexOutOfRange { index: 0, len: 0 }
        );
        assert!(kfi.keyframe_time(1).is_err());
        assert_eq!(kfi.duration(), 0.0);
    }
}

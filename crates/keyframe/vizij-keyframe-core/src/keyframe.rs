//! Keyframes and their time-ordered store.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use log::warn;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::KeyframeError;
use crate::pose::{Pose, PoseSource};

/// A timed pose the path passes through, plus its derived tangents.
#[derive(Clone)]
pub struct KeyFrame {
    time: f64,
    pub(crate) position: Vector3<f64>,
    /// Raw quaternion: the resolver may negate it for hemisphere continuity.
    pub(crate) orientation: Quaternion<f64>,
    pub(crate) tangent_position: Vector3<f64>,
    pub(crate) tangent_orientation: Quaternion<f64>,
    source: Option<Weak<RefCell<dyn PoseSource>>>,
}

impl fmt::Debug for KeyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFrame")
            .field("time", &self.time)
            .field("position", &self.position)
            .field("orientation", &self.orientation)
            .field("tangent_position", &self.tangent_position)
            .field("tangent_orientation", &self.tangent_orientation)
            .field("live", &self.source.is_some())
            .finish()
    }
}

impl KeyFrame {
    pub fn new(pose: Pose, time: f64) -> Self {
        let orientation = pose.orientation.into_inner();
        Self {
            time,
            position: pose.position,
            orientation,
            tangent_position: Vector3::zeros(),
            tangent_orientation: orientation,
            source: None,
        }
    }

    /// Keyframe tracking a live source; its current pose is snapshotted immediately.
    pub fn from_source(source: Weak<RefCell<dyn PoseSource>>, time: f64) -> Self {
        let mut kf = Self::new(Pose::identity(), time);
        kf.source = Some(source);
        kf.snapshot_source();
        kf.tangent_orientation = kf.orientation;
        kf
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Orientation as stored, including any continuity sign flip.
    #[inline]
    pub fn orientation(&self) -> Quaternion<f64> {
        self.orientation
    }

    #[inline]
    pub fn tangent_position(&self) -> Vector3<f64> {
        self.tangent_position
    }

    #[inline]
    pub fn tangent_orientation(&self) -> Quaternion<f64> {
        self.tangent_orientation
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.source.is_some()
    }

    /// Cached pose of this keyframe (as of the last snapshot).
    pub fn pose(&self) -> Pose {
        Pose::new(
            self.position,
            UnitQuaternion::new_normalize(self.orientation),
        )
    }

    /// Current pose, read through the live source when one is attached and alive.
    pub fn current_pose(&self) -> Pose {
        match self.source.as_ref().and_then(Weak::upgrade) {
            Some(src) => {
                let src = src.borrow();
                Pose::new(src.position(), src.orientation())
            }
            None => self.pose(),
        }
    }

    /// Copy the live source's pose into this keyframe. Returns false when the
    /// keyframe has no source or the source was dropped; the last snapshot is kept.
    pub(crate) fn snapshot_source(&mut self) -> bool {
        let Some(weak) = &self.source else {
            return false;
        };
        match weak.upgrade() {
            Some(src) => {
                let src = src.borrow();
                self.position = src.position();
                self.orientation = src.orientation().into_inner();
                true
            }
            None => false,
        }
    }
}

/// Time-ordered keyframe storage. Times are non-decreasing in sequence order.
#[derive(Clone, Debug, Default)]
pub struct KeyFrameStore {
    frames: Vec<KeyFrame>,
}

impl KeyFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a keyframe, rejecting non-finite times and times earlier than the last keyframe.
    pub fn push(&mut self, keyframe: KeyFrame) -> Result<(), KeyframeError> {
        let time = keyframe.time();
        if !time.is_finite() {
            warn!("keyframe rejected: invalid time {time}");
            return Err(KeyframeError::InvalidTime { time });
        }
        if let Some(last) = self.frames.last() {
            if last.time() > time {
                warn!(
                    "keyframe rejected: time {time} is not monotone (last keyframe at {})",
                    last.time()
                );
                return Err(KeyframeError::NonMonotonicTime {
                    time,
                    last_time: last.time(),
                });
            }
        }
        self.frames.push(keyframe);
        Ok(())
    }

    /// Time used by the auto-timed append: one second after the last keyframe, or 0.
    pub fn next_auto_time(&self) -> f64 {
        self.frames.last().map_or(0.0, |kf| kf.time() + 1.0)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&KeyFrame> {
        self.frames.get(index)
    }

    #[inline]
    pub fn first(&self) -> Option<&KeyFrame> {
        self.frames.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&KeyFrame> {
        self.frames.last()
    }

    /// Time of the first keyframe, 0.0 when empty.
    pub fn first_time(&self) -> f64 {
        self.first().map_or(0.0, KeyFrame::time)
    }

    /// Time of the last keyframe, 0.0 when empty.
    pub fn last_time(&self) -> f64 {
        self.last().map_or(0.0, KeyFrame::time)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyFrame> {
        self.frames.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[KeyFrame] {
        &self.frames
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [KeyFrame] {
        &mut self.frames
    }
}

/// Downgrade a shared source into the weak, type-erased handle a keyframe keeps.
pub(crate) fn weak_source<S: PoseSource + 'static>(
    source: &Rc<RefCell<S>>,
) -> Weak<RefCell<dyn PoseSource>> {
    let erased: Rc<RefCell<dyn PoseSource>> = source.clone();
    Rc::downgrade(&erased)
}

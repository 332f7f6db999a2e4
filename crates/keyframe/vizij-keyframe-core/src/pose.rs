//! Poses and the host-facing pose contracts.
//!
//! - [`PoseSink`]: the object driven by the interpolator (camera, node, ...).
//! - [`PoseSource`]: a live object whose current pose a keyframe tracks.
//! - [`Frame`]: a ready-made pose object implementing both.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use nalgebra::{UnitQuaternion, Vector3};

/// Position + orientation in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn from_position(position: Vector3<f64>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Receives interpolated poses.
pub trait PoseSink {
    /// Apply a proposed pose. Implementations may clamp or otherwise constrain it.
    fn set_position_and_orientation_with_constraint(
        &mut self,
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    );
}

/// Provides the current pose of a live keyframe.
pub trait PoseSource {
    fn position(&self) -> Vector3<f64>;
    fn orientation(&self) -> UnitQuaternion<f64>;

    /// Register a listener to be notified whenever this source's pose changes.
    /// Sources that never change may keep the default no-op.
    fn subscribe(&mut self, _listener: ChangeListener) {}
}

/// Filters a proposed pose before a [`Frame`] adopts it.
pub trait PoseConstraint {
    fn constrain(&self, current: &Pose, proposed: Pose) -> Pose;
}

/// Weak handle to a dirty flag owned by a subscriber.
///
/// Notifying only flips the flag; the subscriber decides when to recompute.
#[derive(Clone, Debug)]
pub struct ChangeListener {
    flag: Weak<Cell<bool>>,
}

impl ChangeListener {
    pub fn new(flag: &Rc<Cell<bool>>) -> Self {
        Self {
            flag: Rc::downgrade(flag),
        }
    }

    /// Set the subscriber's flag. Returns false once the subscriber is gone.
    pub fn notify(&self) -> bool {
        match self.flag.upgrade() {
            Some(flag) => {
                flag.set(true);
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.flag.strong_count() > 0
    }

    /// True when both listeners set the same flag.
    pub fn same_subscriber(&self, other: &ChangeListener) -> bool {
        Weak::ptr_eq(&self.flag, &other.flag)
    }
}

/// Listener list for pose sources; prunes listeners whose subscriber was dropped.
#[derive(Clone, Debug, Default)]
pub struct ChangeNotifier {
    listeners: Vec<ChangeListener>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `listener` unless its subscriber is already registered. Dead listeners are
    /// dropped first.
    pub fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.retain(ChangeListener::is_alive);
        if !self.listeners.iter().any(|l| l.same_subscriber(&listener)) {
            self.listeners.push(listener);
        }
    }

    pub fn notify(&mut self) {
        self.listeners.retain(|l| l.notify());
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// A movable pose that can both drive keyframes and be driven by an interpolator.
#[derive(Default)]
pub struct Frame {
    pose: Pose,
    constraint: Option<Box<dyn PoseConstraint>>,
    notifier: ChangeNotifier,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("pose", &self.pose)
            .field("constrained", &self.constraint.is_some())
            .field("listeners", &self.notifier.len())
            .finish()
    }
}

impl Frame {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            pose: Pose::new(position, orientation),
            constraint: None,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn from_pose(pose: Pose) -> Self {
        Self::new(pose.position, pose.orientation)
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.pose.position = position;
        self.notifier.notify();
    }

    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        self.pose.orientation = orientation;
        self.notifier.notify();
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.notifier.notify();
    }

    pub fn set_constraint(&mut self, constraint: Option<Box<dyn PoseConstraint>>) {
        self.constraint = constraint;
    }

    pub fn listener_count(&self) -> usize {
        self.notifier.len()
    }
}

impl PoseSource for Frame {
    fn position(&self) -> Vector3<f64> {
        self.pose.position
    }

    fn orientation(&self) -> UnitQuaternion<f64> {
        self.pose.orientation
    }

    fn subscribe(&mut self, listener: ChangeListener) {
        self.notifier.subscribe(listener);
    }
}

impl PoseSink for Frame {
    fn set_position_and_orientation_with_constraint(
        &mut self,
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
    ) {
        let proposed = Pose::new(position, orientation);
        let pose = match &self.constraint {
            Some(c) => c.constrain(&self.pose, proposed),
            None => proposed,
        };
        self.set_pose(pose);
    }
}

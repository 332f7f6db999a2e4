//! Vizij Keyframe Core (engine-agnostic)
//!
//! Smooth pose animation through timed keyframes: cubic Hermite positions,
//! squad orientations, a fixed-period playback driver and path sampling for
//! previews. Hosts supply the target ([`PoseSink`]), optional live keyframe
//! sources ([`PoseSource`]), a timer ([`PlaybackTimer`]) and a renderer
//! ([`PathRenderer`]).
//!
//! Everything runs on one thread; shared objects are passed as `Rc<RefCell<_>>`
//! and held weakly.

pub mod config;
pub mod error;
pub mod events;
pub mod interp;
pub mod interpolator;
pub mod keyframe;
pub mod path;
pub mod persist;
pub mod playback;
pub mod pose;
pub mod resolver;
pub mod segment;
pub mod spline;

// Re-exports for consumers (adapters)
pub use config::{InterpolatorConfig, PathDrawConfig, PathMask};
pub use error::KeyframeError;
pub use events::{InterpolatorEvent, ListenerId};
pub use interpolator::Interpolator;
pub use keyframe::{KeyFrame, KeyFrameStore};
pub use path::{sample_keyframes, PathRenderer};
pub use persist::{StoredKeyFrame, StoredPath, StoredQuat, StoredVec3};
pub use playback::{PlaybackState, PlaybackTimer};
pub use pose::{ChangeListener, ChangeNotifier, Frame, Pose, PoseConstraint, PoseSink, PoseSource};
pub use segment::SegmentWindow;
pub use spline::SplineCache;

pub use nalgebra::{UnitQuaternion, Vector3};

/// Keyframe result type
pub type Result<T> = core::result::Result<T, KeyframeError>;

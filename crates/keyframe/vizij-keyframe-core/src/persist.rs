//! Saving and restoring keyframe paths.
//!
//! Format (JSON):
//! ```json
//! {
//!   "keyframes": [
//!     { "index": 0, "time": 0.0,
//!       "position": { "x": 0, "y": 0, "z": 0 },
//!       "orientation": { "x": 0, "y": 0, "z": 0, "w": 1 } }
//!   ],
//!   "time": 0.0, "speed": 1.0, "period": 40, "closedPath": false, "loop": false
//! }
//! ```
//! Import is fail-soft: any missing or unreadable field takes its default. The
//! target association is never stored.

use log::warn;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::config::DEFAULT_PERIOD_MS;
use crate::error::KeyframeError;
use crate::interpolator::Interpolator;
use crate::pose::Pose;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredVec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredQuat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for StoredQuat {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredKeyFrame {
    pub index: usize,
    pub position: StoredVec3,
    pub orientation: StoredQuat,
    pub time: f64,
}

/// Persisted interpolator state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredPath {
    pub keyframes: Vec<StoredKeyFrame>,
    pub time: f64,
    pub speed: f64,
    pub period: u32,
    #[serde(rename = "closedPath")]
    pub closed_path: bool,
    #[serde(rename = "loop")]
    pub loop_interpolation: bool,
}

impl Default for StoredPath {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
            time: 0.0,
            speed: 1.0,
            period: DEFAULT_PERIOD_MS,
            closed_path: false,
            loop_interpolation: false,
        }
    }
}

impl From<Vector3<f64>> for StoredVec3 {
    fn from(v: Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<StoredVec3> for Vector3<f64> {
    fn from(v: StoredVec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<UnitQuaternion<f64>> for StoredQuat {
    fn from(q: UnitQuaternion<f64>) -> Self {
        Self {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        }
    }
}

impl StoredQuat {
    /// Normalized orientation; degenerate or non-finite quaternions become identity.
    pub fn to_unit(self) -> UnitQuaternion<f64> {
        let q = Quaternion::new(self.w, self.x, self.y, self.z);
        let norm = q.norm();
        if norm.is_finite() && norm > 1e-12 {
            UnitQuaternion::new_normalize(q)
        } else {
            warn!("stored orientation {:?} is degenerate; using identity", self);
            UnitQuaternion::identity()
        }
    }
}

impl StoredPath {
    /// Parse JSON text. Only malformed JSON syntax is an error; every missing or
    /// unreadable field falls back to its default.
    pub fn from_json(s: &str) -> Result<Self, KeyframeError> {
        let value: JsonValue = serde_json::from_str(s)?;
        Ok(Self::from_value(&value))
    }

    /// Lenient conversion from an already parsed JSON value.
    pub fn from_value(value: &JsonValue) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            warn!("stored path is not a JSON object; using defaults");
            return defaults;
        };

        let keyframes = match obj.get("keyframes") {
            Some(JsonValue::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| keyframe_from_value(item, i))
                .collect(),
            Some(other) => {
                warn!("stored path 'keyframes' is not an array: {other}");
                Vec::new()
            }
            None => Vec::new(),
        };

        Self {
            keyframes,
            time: field_f64(obj, "time", defaults.time),
            speed: field_f64(obj, "speed", defaults.speed),
            period: field_u32(obj, "period", defaults.period),
            closed_path: field_bool(obj, "closedPath", defaults.closed_path),
            loop_interpolation: field_bool(obj, "loop", defaults.loop_interpolation),
        }
    }
}

fn component(m: Option<&Map<String, JsonValue>>, key: &str, default: f64) -> f64 {
    m.map_or(default, |m| field_f64(m, key, default))
}

fn keyframe_from_value(value: &JsonValue, position_in_list: usize) -> StoredKeyFrame {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    let vec3 = obj.get("position").and_then(JsonValue::as_object);
    let quat = obj.get("orientation").and_then(JsonValue::as_object);
    StoredKeyFrame {
        index: obj
            .get("index")
            .and_then(JsonValue::as_u64)
            .map_or(position_in_list, |i| i as usize),
        position: StoredVec3 {
            x: component(vec3, "x", 0.0),
            y: component(vec3, "y", 0.0),
            z: component(vec3, "z", 0.0),
        },
        orientation: StoredQuat {
            x: component(quat, "x", 0.0),
            y: component(quat, "y", 0.0),
            z: component(quat, "z", 0.0),
            w: component(quat, "w", 1.0),
        },
        time: field_f64(obj, "time", 0.0),
    }
}

/// Numbers may also arrive as strings.
/// Non-finite values (`"NaN"`, `"inf"`) count as unreadable.
fn field_f64(obj: &Map<String, JsonValue>, key: &str, default: f64) -> f64 {
    let parsed = match obj.get(key) {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        Some(v) => {
            warn!("stored field '{key}' is not finite ({v}); using {default}");
            default
        }
        None => default,
    }
}

fn field_u32(obj: &Map<String, JsonValue>, key: &str, default: u32) -> u32 {
    match obj.get(key) {
        Some(JsonValue::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

fn field_bool(obj: &Map<String, JsonValue>, key: &str, default: bool) -> bool {
    match obj.get(key) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => match s.trim() {
            "true" => true,
            "false" => false,
            _ => default,
        },
        _ => default,
    }
}

impl Interpolator {
    /// Snapshot of the path and playback parameters. Live keyframes store their
    /// source's current pose.
    pub fn to_stored(&self) -> StoredPath {
        let keyframes = self
            .keyframes
            .iter()
            .enumerate()
            .map(|(index, kf)| {
                let pose = kf.current_pose();
                StoredKeyFrame {
                    index,
                    position: pose.position.into(),
                    orientation: pose.orientation.into(),
                    time: kf.time(),
                }
            })
            .collect();

        StoredPath {
            keyframes,
            time: self.interpolation_time,
            speed: self.speed,
            period: self.period_ms,
            closed_path: self.closed_path,
            loop_interpolation: self.loop_interpolation,
        }
    }

    pub fn to_json(&self) -> Result<String, KeyframeError> {
        Ok(serde_json::to_string_pretty(&self.to_stored())?)
    }

    /// Replace the path and parameters with `stored`. Keyframes are appended in
    /// `index` order; ones that break time ordering are skipped. Playback is stopped
    /// and the target association is left untouched.
    pub fn load_stored(&mut self, stored: &StoredPath) {
        self.delete_path();

        let mut records: Vec<&StoredKeyFrame> = stored.keyframes.iter().collect();
        records.sort_by_key(|kf| kf.index);
        for record in records {
            let pose = Pose::new(record.position.into(), record.orientation.to_unit());
            if let Err(err) = self.add_keyframe(pose, record.time) {
                warn!("skipping stored keyframe {}: {err}", record.index);
            }
        }

        self.interpolation_time = stored.time;
        self.speed = stored.speed;
        self.period_ms = stored.period;
        self.closed_path = stored.closed_path;
        self.loop_interpolation = stored.loop_interpolation;

        self.invalidate_all();
        self.stop_interpolation();
    }

    /// Parse and load a JSON path; see [`StoredPath::from_json`].
    pub fn load_json(&mut self, s: &str) -> Result<(), KeyframeError> {
        let stored = StoredPath::from_json(s)?;
        self.load_stored(&stored);
        Ok(())
    }

    /// Build a fresh interpolator from JSON. Attach a target afterwards.
    pub fn from_json(s: &str) -> Result<Self, KeyframeError> {
        let mut kfi = Self::default();
        kfi.load_json(s)?;
        Ok(kfi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let stored = StoredPath::from_json(r#"{"keyframes": [{"time": 1.5}, {}]}"#).unwrap();
        assert_eq!(stored.speed, 1.0);
        assert_eq!(stored.period, 40);
        assert!(!stored.loop_interpolation);
        assert_eq!(stored.keyframes.len(), 2);
        assert_eq!(stored.keyframes[0].time, 1.5);
        assert_eq!(stored.keyframes[0].orientation, StoredQuat::default());
        assert_eq!(stored.keyframes[1].index, 1);
    }

    #[test]
    fn invalid_fields_take_defaults() {
        let stored = StoredPath::from_json(
            r#"{"speed": "fast", "period": -3, "loop": "true", "closedPath": 7, "time": "2.5"}"#,
        )
        .unwrap();
        assert_eq!(stored.speed, 1.0);
        assert_eq!(stored.period, 40);
        assert!(stored.loop_interpolation);
        assert!(!stored.closed_path);
        assert_eq!(stored.time, 2.5);
    }

    #[test]
    fn non_finite_numbers_take_defaults() {
        let stored = StoredPath::from_json(
            r#"{
                "time": "NaN", "speed": "inf",
                "keyframes": [{ "time": "-inf",
                    "position": { "x": "NaN", "y": "2" },
                    "orientation": { "z": "inf", "w": "1" } }]
            }"#,
        )
        .unwrap();
        assert_eq!(stored.time, 0.0);
        assert_eq!(stored.speed, 1.0);
        let kf = &stored.keyframes[0];
        assert_eq!(kf.time, 0.0);
        assert_eq!(kf.position, StoredVec3 { x: 0.0, y: 2.0, z: 0.0 });
        assert_eq!(kf.orientation, StoredQuat::default());
    }

    #[test]
    fn non_finite_import_still_plays_to_the_end() {
        use crate::pose::Frame;
        use std::cell::RefCell;
        use std::rc::Rc;

        let target = Rc::new(RefCell::new(Frame::default()));
        let mut kfi = Interpolator::with_target(&target);
        kfi.load_json(
            r#"{
                "time": "NaN", "speed": "inf",
                "keyframes": [
                    { "time": 0.0 },
                    { "time": 1.0, "position": { "x": "NaN" } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(kfi.interpolation_time(), 0.0);
        assert_eq!(kfi.interpolation_speed(), 1.0);

        kfi.start_interpolation(Some(100));
        for _ in 0..100 {
            kfi.tick();
        }
        assert!(!kfi.interpolation_is_started());
        assert_eq!(kfi.interpolation_time(), 1.0);
        assert!(target.borrow().pose().position.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(matches!(
            StoredPath::from_json("{ not json"),
            Err(KeyframeError::Serialization { .. })
        ));
        assert_eq!(StoredPath::from_json("[]").unwrap(), StoredPath::default());
    }

    #[test]
    fn degenerate_orientation_becomes_identity() {
        let q = StoredQuat {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        };
        assert_eq!(q.to_unit(), UnitQuaternion::identity());
    }
}

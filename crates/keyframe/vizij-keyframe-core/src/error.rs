//! Error types for keyframe path operations

use serde::{Deserialize, Serialize};

/// Errors surfaced by the keyframe interpolator.
///
/// None of these are fatal: the interpolator stays in a consistently evaluable
/// state after any of them is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum KeyframeError {
    /// Appended keyframe time is earlier than the current last keyframe.
    #[error("Keyframe time {time} is earlier than last keyframe time {last_time}")]
    NonMonotonicTime { time: f64, last_time: f64 },

    /// Keyframe time is NaN or infinite.
    #[error("Invalid keyframe time: {time}")]
    InvalidTime { time: f64 },

    /// Keyframe index outside the stored range.
    #[error("Keyframe index {index} out of range (count: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Persisted path could not be parsed or written.
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl KeyframeError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NonMonotonicTime { .. } | Self::InvalidTime { .. } => "validation",
            Self::IndexOutOfRange { .. } => "data",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for KeyframeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = KeyframeError::NonMonotonicTime {
            time: 0.5,
            last_time: 1.0,
        };
        assert_eq!(err.category(), "validation");
        assert_eq!(
            KeyframeError::IndexOutOfRange { index: 3, len: 2 }.category(),
            "data"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let err: KeyframeError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, KeyframeError::Serialization { .. }));
    }

    #[test]
    fn test_serialization() {
        let error = KeyframeError::InvalidTime { time: 2.0 };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: KeyframeError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}

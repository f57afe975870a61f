//! `egomap-types` – vocabulary shared by every egomap crate.
//!
//! Holds the frame identifier handed out by the pose ledger and the single
//! error taxonomy that all public operations report through.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an observed frame.
///
/// Ids are assigned by the pose ledger in strictly increasing order starting
/// at `0` and are never reused, so ordering by id is ordering by capture.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl FrameId {
    /// The raw integer value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FrameId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error type spanning pose validation, ledger lookups, watermark misuse and
/// configuration problems.
///
/// None of these are transient: each one signals a broken contract between
/// the engine and its caller, so there is nothing to retry.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpatialError {
    /// A matrix failed the SE(3) validity check.
    #[error("Invalid rigid transform: {0}")]
    InvalidTransform(String),

    /// An operation referenced a frame id the ledger never created.
    #[error("Unknown frame: {0}")]
    UnknownFrame(FrameId),

    /// The watermarker was handed a frame id absent from the color mapping.
    #[error("No color assigned to frame {0}")]
    UnknownColor(FrameId),

    /// `current_pose` / `generate_map` was called before any frame existed.
    #[error("Pose store is empty")]
    EmptyStore,

    /// A render or watermark configuration cannot produce an image.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_id_orders_by_value() {
        let mut ids = vec![FrameId(3), FrameId(0), FrameId(2)];
        ids.sort();
        assert_eq!(ids, vec![FrameId(0), FrameId(2), FrameId(3)]);
        assert_eq!(FrameId::from(7).get(), 7);
    }

    #[test]
    fn frame_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&FrameId(42)).unwrap();
        assert_eq!(json, "42");
        let back: FrameId = serde_json::from_str("42").unwrap();
        assert_eq!(back, FrameId(42));
    }

    #[test]
    fn spatial_error_serialization_roundtrip() {
        let err = SpatialError::UnknownFrame(FrameId(9));
        let json = serde_json::to_string(&err).unwrap();
        let back: SpatialError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn spatial_error_display() {
        let err = SpatialError::UnknownColor(FrameId(5));
        assert!(err.to_string().contains("frame 5"));

        let err2 = SpatialError::InvalidTransform("det(R) = -1".to_string());
        assert!(err2.to_string().contains("det(R) = -1"));

        assert_eq!(SpatialError::EmptyStore.to_string(), "Pose store is empty");
    }
}

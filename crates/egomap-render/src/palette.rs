//! Keyframe color assignment.
//!
//! Colors are picked by rank, never by raw frame id: the keyframe drawn first
//! gets `palette[0]`, the ninth wraps back to `palette[0]`. Removing and
//! re-adding keyframes therefore reshuffles colors predictably, and the map
//! and the watermarks agree because both read the same [`ColorAssignment`].

use std::collections::BTreeMap;

use egomap_types::{FrameId, SpatialError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Blend `color` toward white by `amount` (0 keeps it, 1 gives white).
pub fn lighten(color: [u8; 3], amount: f64) -> [u8; 3] {
    let amount = amount.clamp(0.0, 1.0);
    color.map(|c| {
        let c = f64::from(c);
        (c + (255.0 - c) * amount).round() as u8
    })
}

/// Color for the 1-based `rank`, lightened by `amount`.
///
/// `palette` must be non-empty; [`MapConfig::validate`] guarantees this for
/// renderer-owned palettes.
///
/// [`MapConfig::validate`]: crate::config::MapConfig::validate
pub(crate) fn rank_color(palette: &[[u8; 3]], rank: usize, amount: f64) -> [u8; 3] {
    let base = palette[rank.saturating_sub(1) % palette.len()];
    lighten(base, amount)
}

/// Color and label of one rendered keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeyframeColor {
    /// 1-based position in the render order; printed as the marker label.
    pub rank: usize,
    /// Lightened RGB fill.
    pub color: [u8; 3],
}

/// Mapping from rendered keyframe id to its color and rank.
///
/// Produced fresh by every map render; hand it to the watermarker to stamp
/// keyframe images consistently with that map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorAssignment {
    entries: BTreeMap<FrameId, KeyframeColor>,
}

impl ColorAssignment {
    /// An empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the color of `frame_id`, replacing any previous entry.
    pub fn insert(&mut self, frame_id: FrameId, color: KeyframeColor) {
        self.entries.insert(frame_id, color);
    }

    /// Color of `frame_id`, if it was rendered.
    pub fn get(&self, frame_id: FrameId) -> Option<&KeyframeColor> {
        self.entries.get(&frame_id)
    }

    /// Color of `frame_id`, or [`SpatialError::UnknownColor`].
    pub fn lookup(&self, frame_id: FrameId) -> Result<KeyframeColor, SpatialError> {
        self.get(frame_id)
            .copied()
            .ok_or(SpatialError::UnknownColor(frame_id))
    }

    /// `true` when `frame_id` has a color.
    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.entries.contains_key(&frame_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by ascending frame id.
    pub fn iter(&self) -> impl Iterator<Item = (FrameId, &KeyframeColor)> {
        self.entries.iter().map(|(id, c)| (*id, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PALETTE;

    #[test]
    fn lighten_blends_toward_white() {
        assert_eq!(lighten([0, 100, 255], 0.0), [0, 100, 255]);
        assert_eq!(lighten([0, 100, 255], 1.0), [255, 255, 255]);
        // 0 + 255 * 0.45 = 114.75 → 115; 100 + 155 * 0.45 = 169.75 → 170.
        assert_eq!(lighten([0, 100, 255], 0.45), [115, 170, 255]);
    }

    #[test]
    fn rank_cycles_through_palette() {
        let first = rank_color(&DEFAULT_PALETTE, 1, 0.0);
        let ninth = rank_color(&DEFAULT_PALETTE, 9, 0.0);
        let second = rank_color(&DEFAULT_PALETTE, 2, 0.0);
        assert_eq!(first, DEFAULT_PALETTE[0]);
        assert_eq!(ninth, first);
        assert_ne!(second, first);
    }

    #[test]
    fn default_palette_stays_distinct_after_lightening() {
        let colors: Vec<_> = (1..=8).map(|r| rank_color(&DEFAULT_PALETTE, r, 0.45)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn lookup_reports_unknown_color() {
        let mut colors = ColorAssignment::new();
        colors.insert(FrameId(2), KeyframeColor { rank: 1, color: [1, 2, 3] });
        assert_eq!(colors.lookup(FrameId(2)).unwrap().rank, 1);
        assert_eq!(colors.lookup(FrameId(3)), Err(SpatialError::UnknownColor(FrameId(3))));
        assert!(colors.contains(FrameId(2)));
        assert_eq!(colors.len(), 1);
    }
}

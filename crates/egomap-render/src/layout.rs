//! Egocentric layout.
//!
//! The geometric half of a map render, kept free of any raster so it can be
//! tested (and shipped to the agent as JSON) on its own. Given the current
//! camera pose `C` and the keyframe poses `Kᵢ`:
//!
//! 1. `relᵢ = C⁻¹·Kᵢ`, keep `(x, y)` of its translation. `+y` is drawn as
//!    "up" (forward) and `+x` as "right".
//! 2. With at least `min_outlier_samples` keyframes, any keyframe whose
//!    planar distance exceeds `mean + k·std` (population std) is dropped.
//!    When the distances are all equal (`std < 1e-6`) nothing is dropped.
//! 3. `scale = usable_radius / d_max` over the survivors, or
//!    `default_scale` when there are none or they all sit on the robot.
//! 4. `px = center + round(x·scale)`, `py = center − round(y·scale)`,
//!    clamped so the whole square stays on the canvas.
//! 5. In ascending id order, a marker that would overlap an already placed
//!    one walks an expanding spiral until it finds a free spot. If the canvas
//!    has none, it keeps its projected spot.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::{SQRT_2, TAU};

use egomap_geometry::RigidPose;
use egomap_types::{FrameId, SpatialError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::MapConfig;
use crate::palette::{ColorAssignment, KeyframeColor, rank_color};

/// Distances (and their spread) below this are treated as zero.
const DEGENERATE_EPS: f64 = 1e-6;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// One keyframe as it appears on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlacedMarker {
    /// Keyframe this marker stands for.
    pub frame_id: FrameId,
    /// 1-based label printed on the marker and on its watermark.
    pub rank: usize,
    /// Position relative to the robot in metres: `[right, forward]`.
    pub relative_position: [f64; 2],
    /// Resolved marker center in image pixels: `[column, row]`.
    pub pixel: [i32; 2],
    /// `true` when overlap resolution moved the marker off its projection.
    pub displaced: bool,
    /// RGB fill shared with the watermark.
    pub color: [u8; 3],
}

/// Geometric description of one rendered map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MapLayout {
    /// Side length of the square image in pixels.
    pub image_size: u32,
    /// Robot position in image pixels: `[column, row]`.
    pub center: [i32; 2],
    /// Pixels per metre.
    pub scale: f64,
    /// Drawn keyframes in rank order.
    pub markers: Vec<PlacedMarker>,
    /// Keyframes rejected as outliers; neither scaled against nor drawn.
    pub outliers: Vec<FrameId>,
}

impl MapLayout {
    /// Marker of `frame_id`, if it was drawn.
    pub fn marker(&self, frame_id: FrameId) -> Option<&PlacedMarker> {
        self.markers.iter().find(|m| m.frame_id == frame_id)
    }

    /// The color/rank mapping the watermarker needs.
    pub fn colors(&self) -> ColorAssignment {
        let mut colors = ColorAssignment::new();
        for m in &self.markers {
            colors.insert(
                m.frame_id,
                KeyframeColor {
                    rank: m.rank,
                    color: m.color,
                },
            );
        }
        colors
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Layout pass
// ────────────────────────────────────────────────────────────────────────────

/// Compute the map layout of `keyframes` as seen from `current`.
///
/// Fails only with [`SpatialError::InvalidConfig`] when `config` does not
/// validate. Degenerate inputs (no keyframes, all keyframes on the robot, a
/// canvas too crowded to separate markers) fall back to documented defaults
/// instead.
pub fn compute_layout(
    current: &RigidPose,
    keyframes: &BTreeMap<FrameId, RigidPose>,
    config: &MapConfig,
) -> Result<MapLayout, SpatialError> {
    config.validate()?;
    Ok(layout_unchecked(current, keyframes, config))
}

/// [`compute_layout`] for a configuration that has already been validated.
pub(crate) fn layout_unchecked(
    current: &RigidPose,
    keyframes: &BTreeMap<FrameId, RigidPose>,
    config: &MapConfig,
) -> MapLayout {
    let relative: Vec<(FrameId, [f64; 2])> = keyframes
        .iter()
        .map(|(id, pose)| {
            let t = current.relative(pose).translation();
            (*id, [t.x, t.y])
        })
        .collect();

    let distances: Vec<f64> = relative.iter().map(|(_, [x, y])| x.hypot(*y)).collect();
    let rejected = find_outliers(
        &distances,
        config.outlier_std_multiplier,
        config.min_outlier_samples,
    );
    let outliers: Vec<FrameId> = rejected.iter().map(|&i| relative[i].0).collect();
    if !outliers.is_empty() {
        warn!(?outliers, "keyframes rejected as outliers");
    }

    let d_max = distances
        .iter()
        .enumerate()
        .filter(|(i, _)| !rejected.contains(i))
        .map(|(_, d)| *d)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |m| m.max(d))));
    let scale = select_scale(d_max, config.usable_radius(), config.default_scale);

    let center = config.center();
    let bounds = config.marker_bounds();
    let pitch = config.marker_pitch();

    let mut markers: Vec<PlacedMarker> = Vec::with_capacity(relative.len() - rejected.len());
    for (i, (frame_id, position)) in relative.iter().enumerate() {
        if rejected.contains(&i) {
            continue;
        }
        let projected = project(*position, scale, center, bounds);
        let placed: Vec<[i32; 2]> = markers.iter().map(|m| m.pixel).collect();
        let (pixel, displaced) = resolve_overlap(projected, &placed, bounds, pitch);
        let rank = markers.len() + 1;
        markers.push(PlacedMarker {
            frame_id: *frame_id,
            rank,
            relative_position: *position,
            pixel,
            displaced,
            color: rank_color(&config.palette, rank, config.lighten),
        });
    }

    MapLayout {
        image_size: config.image_size,
        center: [center, center],
        scale,
        markers,
        outliers,
    }
}

/// Indices of distances above `mean + k·std`.
///
/// Returns nothing when there are fewer than `min_samples` distances, or
/// when they are (numerically) all the same.
pub fn find_outliers(distances: &[f64], k: f64, min_samples: usize) -> BTreeSet<usize> {
    if distances.len() < min_samples || distances.is_empty() {
        return BTreeSet::new();
    }
    let n = distances.len() as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std < DEGENERATE_EPS {
        return BTreeSet::new();
    }
    let threshold = mean + k * std;
    distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Pixels per metre that fit `d_max` into `usable_radius`.
pub fn select_scale(d_max: Option<f64>, usable_radius: f64, default_scale: f64) -> f64 {
    match d_max {
        Some(d) if d >= DEGENERATE_EPS => usable_radius / d,
        _ => default_scale,
    }
}

/// Pixel center of a marker at `[x, y]` metres, clamped to `bounds`.
pub fn project(position: [f64; 2], scale: f64, center: i32, bounds: (i32, i32)) -> [i32; 2] {
    let (lo, hi) = (f64::from(bounds.0), f64::from(bounds.1));
    let c = f64::from(center);
    let px = (c + (position[0] * scale).round()).clamp(lo, hi);
    let py = (c - (position[1] * scale).round()).clamp(lo, hi);
    [px as i32, py as i32]
}

/// `true` when two marker centers are closer than `pitch` on both axes.
pub fn collides(a: [i32; 2], b: [i32; 2], pitch: i32) -> bool {
    (a[0] - b[0]).abs() < pitch && (a[1] - b[1]).abs() < pitch
}

/// Move `candidate` off every marker in `placed`.
///
/// Ring `n` of the spiral has radius `n·pitch` and `8n` evenly spaced
/// positions, so neighbouring positions are less than one pitch apart. The ring
/// count is bounded by the canvas diagonal. Returns the chosen center and
/// whether it differs from `candidate`.
pub fn resolve_overlap(
    candidate: [i32; 2],
    placed: &[[i32; 2]],
    bounds: (i32, i32),
    pitch: i32,
) -> ([i32; 2], bool) {
    let is_free = |p: [i32; 2]| placed.iter().all(|q| !collides(p, *q, pitch));
    if is_free(candidate) {
        return (candidate, false);
    }

    let (lo, hi) = bounds;
    let span = f64::from(hi - lo);
    let max_ring = (span * SQRT_2 / f64::from(pitch)).ceil() as i32 + 1;

    for ring in 1..=max_ring {
        let radius = f64::from(ring * pitch);
        let steps = 8 * ring;
        for step in 0..steps {
            let angle = TAU * f64::from(step) / f64::from(steps);
            let p = [
                candidate[0] + (radius * angle.cos()).round() as i32,
                candidate[1] - (radius * angle.sin()).round() as i32,
            ];
            if p[0] < lo || p[0] > hi || p[1] < lo || p[1] > hi {
                continue;
            }
            if is_free(p) {
                return (p, true);
            }
        }
    }

    warn!(
        x = candidate[0],
        y = candidate[1],
        "no free spot for keyframe marker; drawing it overlapped"
    );
    (candidate, false)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

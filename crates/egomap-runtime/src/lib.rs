//! `egomap-runtime` – the spatial context as one control-loop object.
//!
//! Wires the pose ledger, the map renderer and the watermarker behind a
//! single owner that a policy loop drives once per tick:
//! `add_frame` → `generate_map` → `watermark` → `promote_to_keyframe` /
//! `remove_keyframe`.
//!
//! # Modules
//!
//! - [`context`] – [`SpatialContext`][context::SpatialContext]: the facade.
//!   [`SharedSpatialContext`][context::SharedSpatialContext] wraps it in a
//!   mutex for callers that must share one instance across threads.
//! - [`localization`] – [`Localizer`][localization::Localizer] and
//!   [`PoseEstimate`][localization::PoseEstimate]: the contract for pose
//!   producers that may not be ready yet, plus
//!   [`AnchoredLocalizer`][localization::AnchoredLocalizer], which adapts a
//!   raw odometry backend (warm-up, camera-to-world anchoring, trajectory).
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod context;
pub mod localization;
pub mod telemetry;

pub use context::{SharedSpatialContext, SpatialContext, SpatialContextConfig};
pub use localization::{AnchoredLocalizer, Localizer, OdometrySource, PoseEstimate};
pub use telemetry::{TracerProviderGuard, init_tracing};

//! `egomap-render` – the egocentric map and keyframe watermarks.
//!
//! Turns the pose ledger into the two visual products a decision-making
//! agent consumes: a bird's-eye raster centred on the robot, and keyframe
//! images stamped with the same color and number as their map marker.
//!
//! # Modules
//!
//! - [`config`] – [`MapConfig`][config::MapConfig] and
//!   [`WatermarkConfig`][config::WatermarkConfig]: every tunable with its
//!   documented default.
//! - [`layout`] – [`compute_layout`][layout::compute_layout]: the pure
//!   geometry pass (relative positions, outlier rejection, scale selection,
//!   projection and spiral overlap resolution) producing a serializable
//!   [`MapLayout`][layout::MapLayout].
//! - [`palette`] – [`ColorAssignment`][palette::ColorAssignment]: the
//!   rank-cycled, lightened palette shared by map and watermarks.
//! - [`map`] – [`MapRenderer`][map::MapRenderer]: rasterizes a layout.
//! - [`watermark`] – [`Watermarker`][watermark::Watermarker]: stamps
//!   keyframe images.
//! - [`glyph`] – a tiny built-in bitmap digit font for rank labels.

pub mod config;
pub mod glyph;
pub mod layout;
pub mod map;
pub mod palette;
pub mod watermark;

pub use config::{DEFAULT_PALETTE, MapConfig, WatermarkConfig};
pub use layout::{MapLayout, PlacedMarker, compute_layout};
pub use map::{MapRenderer, RenderedMap};
pub use palette::{ColorAssignment, KeyframeColor};
pub use watermark::Watermarker;

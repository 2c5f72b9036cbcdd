//! `roamer-perception` – turns raw lidar sweeps and camera frames into the
//! structured view of the world the navigator and planner reason about.
//!
//! # Modules
//!
//! - [`obstacle`] – [`ObstacleDetector`][obstacle::ObstacleDetector]: groups
//!   contiguous near-range scan indices into
//!   [`ObstacleRegion`][roamer_types::ObstacleRegion]s, wrapping across the
//!   0/359 seam.
//! - [`matcher`] – [`ObjectMatcher`][matcher::ObjectMatcher]: correlates the
//!   static object registry against a sweep and scores each hit, plus the
//!   deduplicated [`DetectionSet`][matcher::DetectionSet] accumulated across
//!   ticks.
//! - [`visual`] – [`RedTargetDetector`][visual::RedTargetDetector]: camera
//!   based target identification used only for bookkeeping, never for
//!   safety decisions.

pub mod matcher;
pub mod obstacle;
pub mod visual;

pub use matcher::{DetectionSet, MatcherConfig, ObjectMatcher};
pub use obstacle::{ObstacleConfig, ObstacleDetector};
pub use visual::{RedTargetDetector, VisualTargetDetector};

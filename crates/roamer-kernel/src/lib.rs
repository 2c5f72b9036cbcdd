//! `roamer-kernel` – motion safety.
//!
//! It does not plan; it decides whether a commanded move may run.
//!
//! # Modules
//!
//! - [`safety`] – [`SafetyValidator`][safety::SafetyValidator]: pure
//!   clearance predicate over an angular cone of the current lidar sweep.
//!   Called before every motion and again before every straight step.
//! - [`gate`] – [`MotionGate`][gate::MotionGate]: the single interception
//!   point the navigator passes through before any hardware call.  Runs the
//!   registered [`MotionRule`][gate::MotionRule]s (e.g. a distance cap) and
//!   then the clearance check.

pub mod gate;
pub mod safety;

pub use gate::{GateConfig, MaxDistanceRule, MotionGate, MotionRule};
pub use safety::{SafetyConfig, SafetyValidator, SafetyVerdict};

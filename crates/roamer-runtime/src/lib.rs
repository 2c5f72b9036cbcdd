//! `roamer-runtime` – the mission engine.
//!
//! Everything that turns perception and safety checks into robot motion
//! lives here, driven by one synchronous control loop per robot.
//!
//! # Modules
//!
//! - [`world_model`] – [`WorldModel`][world_model::WorldModel]: reads pose
//!   and scan from the hardware and keeps the running detection set,
//!   obstacle regions and visually identified targets up to date.
//! - [`navigator`] – [`GridNavigator`][navigator::GridNavigator]: the
//!   Idle → Turning → Straight state machine that executes one
//!   [`RobotAction`][roamer_types::RobotAction], re-sensing after every
//!   micro-step and aborting on an unsafe reading.
//! - [`mission`] – [`MissionTracker`][mission::MissionTracker]: marks targets
//!   reached and decides when the mission is complete or out of steps.
//! - [`planner`] – the [`Planner`][planner::Planner] seam, a scripted and a
//!   greedy reference planner, and the JSON Schema an external planner can be
//!   held to.
//! - [`mission_loop`] – [`MissionLoop`][mission_loop::MissionLoop]: the
//!   orchestrator tying the pieces above together.
//! - [`loop_guard`] – [`LoopGuard`][loop_guard::LoopGuard]: detects a planner
//!   re-issuing the same failing action.
//! - [`sink`] – [`MissionSink`][sink::MissionSink]: injected telemetry with
//!   an explicit open/close lifecycle.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: process-wide
//!   `tracing` subscriber with optional OTLP span export.
//!
//! # Motion gating
//!
//! Every action passes through [`MotionGate::authorize`] before the
//! navigator issues a single hardware command.  [`MotionGate`] is re-exported
//! so callers can configure it without depending on `roamer-kernel` directly.

pub mod loop_guard;
pub mod mission;
pub mod mission_loop;
pub mod navigator;
pub mod planner;
pub mod sink;
pub mod telemetry;
pub mod world_model;

pub use loop_guard::LoopGuard;
pub use mission::{MissionConfig, MissionStatus, MissionTracker};
pub use mission_loop::{MissionLoop, MissionLoopBuilder, MissionOutcome, MissionReport};
pub use navigator::{ActionError, ActionOutcome, ActionReport, GridNavigator, NavState, NavigatorConfig};
pub use planner::{GreedyPlanner, PlanContext, Planner, ScriptedPlanner, parse_plan, plan_schema};
pub use sink::{MemorySink, MissionLog, MissionSink, TickRecord, TracingSink};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use world_model::WorldModel;

pub use roamer_kernel::MotionGate;

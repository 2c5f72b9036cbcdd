//! [`MissionLoop`] – the search-mission orchestrator.
//!
//! Single-threaded and synchronous: every tick blocks at the hardware
//! boundary and nowhere else.  Each tick:
//!
//! 1. **Stop check** – an external stop flag (e.g. Ctrl-C) interrupts the
//!    mission.  It is only read between ticks; a micro-step already issued
//!    to the hardware always completes.
//!
//!    Until the first sensor refresh succeeds the robot's pose is unknown,
//!    so each tick retries the refresh instead of tracking and planning.  A
//!    timed-out refresh costs one step.
//! 2. **Track** – the [`MissionTracker`] folds the latest detections into
//!    the mission state.  All targets reached → `Completed`; budget spent →
//!    `TimedOut`.
//! 3. **Plan** – when the action queue is empty the [`Planner`] is asked
//!    for more.  An empty plan is a no-op tick; too many in a row interrupt
//!    the mission.
//! 4. **Act** – the next queued action runs through the [`GridNavigator`].
//!    Aborted and rejected actions flush the queue (the plan was made for a
//!    world that turned out different) and feed the [`LoopGuard`].
//! 5. **Publish** – the step counter advances and a [`TickRecord`] goes to
//!    the [`MissionSink`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use roamer_hal::{SimBody, SimRobot};
//! use roamer_runtime::mission::MissionConfig;
//! use roamer_runtime::mission_loop::{MissionLoop, MissionOutcome};
//! use roamer_runtime::planner::ScriptedPlanner;
//! use roamer_types::{Direction, ObjectKind, RobotAction, WorldObject};
//!
//! let world = Arc::new(vec![WorldObject::new(1, "Can", ObjectKind::Target, 400, 0)]);
//! let robot = SimRobot::new("s4").with_bodies(vec![SimBody::new(400, 0, 20)]);
//! let planner = ScriptedPlanner::once(vec![RobotAction::new(Direction::North, 250)]);
//!
//! let report = MissionLoop::builder(robot, world)
//!     .mission(MissionConfig { reach_radius: 150, ..MissionConfig::default() })
//!     .planner(Box::new(planner))
//!     .build()
//!     .run();
//! assert_eq!(report.outcome, MissionOutcome::Completed);
//! ```

use std::collections::VecDeque;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use roamer_hal::HardwareActuator;
use roamer_kernel::{GateConfig, MotionGate, SafetyConfig, SafetyValidator};
use roamer_perception::{MatcherConfig, ObjectMatcher, ObstacleConfig, ObstacleDetector, VisualTargetDetector};
use roamer_types::{DirectionTable, MissionState, RoamerError, RobotAction, ScanConvention, WorldObject};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::loop_guard::LoopGuard;
use crate::mission::{MissionConfig, MissionStatus, MissionTracker};
use crate::navigator::{ActionError, ActionOutcome, GridNavigator, NavigatorConfig};
use crate::planner::{PlanContext, Planner, ScriptedPlanner};
use crate::sink::{MissionSink, TickRecord, TracingSink};
use crate::world_model::WorldModel;

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// How a mission ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MissionOutcome {
    /// Every target was reached.
    Completed,
    /// The step budget ran out first.
    TimedOut,
    /// Stopped early: operator stop, hardware failure, planner exhaustion or
    /// a stalled action loop.
    Interrupted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub mission_id: Uuid,
    pub outcome: MissionOutcome,
    pub state: MissionState,
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Wiring for a [`MissionLoop`].  Every component not supplied falls back to
/// its default configuration.
pub struct MissionLoopBuilder<H> {
    hw: H,
    registry: Arc<Vec<WorldObject>>,
    self_id: Option<u32>,
    convention: ScanConvention,
    table: DirectionTable,
    matcher: MatcherConfig,
    obstacles: ObstacleConfig,
    safety: SafetyConfig,
    gate: GateConfig,
    navigator: NavigatorConfig,
    mission: MissionConfig,
    visual: Option<Box<dyn VisualTargetDetector>>,
    planner: Option<Box<dyn Planner>>,
    sink: Option<Box<dyn MissionSink>>,
    stop: Option<Arc<AtomicBool>>,
}

impl<H: HardwareActuator> MissionLoopBuilder<H> {
    pub fn self_id(mut self, id: u32) -> Self {
        self.self_id = Some(id);
        self
    }

    pub fn convention(mut self, convention: ScanConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn direction_table(mut self, table: DirectionTable) -> Self {
        self.table = table;
        self
    }

    pub fn matcher(mut self, config: MatcherConfig) -> Self {
        self.matcher = config;
        self
    }

    pub fn obstacles(mut self, config: ObstacleConfig) -> Self {
        self.obstacles = config;
        self
    }

    pub fn safety(mut self, config: SafetyConfig) -> Self {
        self.safety = config;
        self
    }

    pub fn gate(mut self, config: GateConfig) -> Self {
        self.gate = config;
        self
    }

    pub fn navigator(mut self, config: NavigatorConfig) -> Self {
        self.navigator = config;
        self
    }

    pub fn mission(mut self, config: MissionConfig) -> Self {
        self.mission = config;
        self
    }

    pub fn visual_detector(mut self, detector: Box<dyn VisualTargetDetector>) -> Self {
        self.visual = Some(detector);
        self
    }

    pub fn planner(mut self, planner: Box<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn sink(mut self, sink: Box<dyn MissionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Share a stop flag with whoever may want to end the mission early.
    pub fn stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn build(self) -> MissionLoop<H> {
        let mut world = WorldModel::new(
            Arc::clone(&self.registry),
            self.self_id,
            ObjectMatcher::new(self.matcher, self.convention),
            ObstacleDetector::new(self.obstacles),
        );
        if let Some(visual) = self.visual {
            world = world.with_visual_detector(visual);
        }

        let validator = SafetyValidator::new(self.safety, self.table, self.convention);
        let navigator = GridNavigator::new(self.navigator, MotionGate::from_config(&self.gate, validator));
        let tracker = MissionTracker::new(world.objects(), &self.mission);

        MissionLoop {
            hw: self.hw,
            world,
            navigator,
            tracker,
            planner: self
                .planner
                .unwrap_or_else(|| Box::new(ScriptedPlanner::default())),
            sink: self.sink.unwrap_or_else(|| Box::new(TracingSink::default())),
            loop_guard: LoopGuard::new(self.mission.loop_guard_threshold),
            stop: self.stop.unwrap_or_default(),
            config: self.mission,
            queue: VecDeque::new(),
            empty_plans: 0,
            sensed: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MissionLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct MissionLoop<H> {
    hw: H,
    world: WorldModel,
    navigator: GridNavigator,
    tracker: MissionTracker,
    planner: Box<dyn Planner>,
    sink: Box<dyn MissionSink>,
    loop_guard: LoopGuard,
    stop: Arc<AtomicBool>,
    config: MissionConfig,
    queue: VecDeque<RobotAction>,
    empty_plans: u32,
    /// Whether any refresh has succeeded, i.e. whether the world model's
    /// pose is real.
    sensed: bool,
}

/// What a single tick decided.
enum Tick {
    Continue,
    Finished(MissionOutcome),
}

impl<H: HardwareActuator> MissionLoop<H> {
    pub fn builder(hw: H, registry: Arc<Vec<WorldObject>>) -> MissionLoopBuilder<H> {
        MissionLoopBuilder {
            hw,
            registry,
            self_id: None,
            convention: ScanConvention::default(),
            table: DirectionTable::default(),
            matcher: MatcherConfig::default(),
            obstacles: ObstacleConfig::default(),
            safety: SafetyConfig::default(),
            gate: GateConfig::default(),
            navigator: NavigatorConfig::default(),
            mission: MissionConfig::default(),
            visual: None,
            planner: None,
            sink: None,
            stop: None,
        }
    }

    /// Handle that ends the mission at the next tick boundary when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    pub fn state(&self) -> &MissionState {
        self.tracker.state()
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Run the mission to a terminal outcome.
    ///
    /// The sink is opened first and closed exactly once, whatever the
    /// outcome.  Hardware failures end the mission as
    /// [`MissionOutcome::Interrupted`] instead of propagating.
    pub fn run(&mut self) -> MissionReport {
        let mission_id = Uuid::new_v4();
        let robot_id = self.hw.id().to_string();
        let span = info_span!("mission", %mission_id, robot = %robot_id);
        let _enter = span.enter();

        self.sink.open(mission_id, &robot_id);
        info!(
            targets = self.tracker.state().targets_total,
            budget = self.config.step_budget,
            "mission started"
        );

        let outcome = self.drive();

        self.sink.close(&outcome);
        let state = self.tracker.state().clone();
        info!(
            ?outcome,
            steps = state.step,
            reached = state.reached_target_ids.len(),
            remaining = state.targets_remaining,
            "mission finished"
        );
        MissionReport {
            mission_id,
            outcome,
            state,
        }
    }

    fn drive(&mut self) -> MissionOutcome {
        loop {
            match self.tick() {
                Tick::Continue => {}
                Tick::Finished(outcome) => return outcome,
            }
        }
    }

    fn tick(&mut self) -> Tick {
        if self.stop.load(Ordering::Acquire) {
            return Tick::Finished(MissionOutcome::Interrupted {
                reason: "stop requested".to_string(),
            });
        }

        // ── First sight ──────────────────────────────────────────────────────
        if !self.sensed {
            if self.tracker.status() == MissionStatus::TimedOut {
                return Tick::Finished(MissionOutcome::TimedOut);
            }
            match self.world.refresh(&mut self.hw) {
                Ok(()) => self.sensed = true,
                Err(e @ RoamerError::HardwareFailure { .. }) => {
                    return Tick::Finished(MissionOutcome::Interrupted {
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "no sensor reading yet; idling this tick");
                    self.tracker.advance_step();
                    self.publish_tick();
                    return Tick::Continue;
                }
            }
        }

        // ── Track ────────────────────────────────────────────────────────────
        let newly = self.tracker.update(
            self.world.pose(),
            self.world.detections(),
            self.world.identified(),
        );
        if !newly.is_empty() {
            info!(targets = ?newly, remaining = self.tracker.state().targets_remaining, "targets reached");
        }
        match self.tracker.status() {
            MissionStatus::Completed => return Tick::Finished(MissionOutcome::Completed),
            MissionStatus::TimedOut => return Tick::Finished(MissionOutcome::TimedOut),
            MissionStatus::Running => {}
        }

        // ── Plan ─────────────────────────────────────────────────────────────
        if self.queue.is_empty() {
            let ctx = PlanContext {
                state: self.tracker.state(),
                detections: self.world.detections(),
                regions: self.world.regions(),
                pose: self.world.pose(),
            };
            let plan = self.planner.plan(&ctx);
            if plan.is_empty() {
                self.empty_plans += 1;
                if self.empty_plans > self.config.max_empty_plans {
                    return Tick::Finished(MissionOutcome::Interrupted {
                        reason: format!("planner returned no actions {} times in a row", self.empty_plans),
                    });
                }
                warn!(consecutive = self.empty_plans, "planner returned no actions; idling this tick");
            } else {
                self.empty_plans = 0;
                info!(actions = plan.len(), "new plan queued");
                self.queue.extend(plan);
            }
        }

        // ── Act ──────────────────────────────────────────────────────────────
        if let Some(action) = self.queue.pop_front() {
            if let Some(outcome) = self.act(action) {
                return Tick::Finished(outcome);
            }
        }

        // ── Publish ──────────────────────────────────────────────────────────
        self.tracker.advance_step();
        self.publish_tick();
        Tick::Continue
    }

    /// Execute one action.  Returns an outcome when the mission must end.
    fn act(&mut self, action: RobotAction) -> Option<MissionOutcome> {
        let step = self.tracker.state().step;
        match self.navigator.execute(&mut self.hw, &mut self.world, action, step) {
            Ok(report) => {
                self.sink.record_action(&report.record);
                match &report.outcome {
                    ActionOutcome::Completed { .. } => {
                        self.loop_guard.reset();
                        None
                    }
                    ActionOutcome::Aborted { reason } | ActionOutcome::Rejected { reason } => {
                        info!(%action, reason = %reason, dropped = self.queue.len(), "action failed; clearing queue");
                        self.queue.clear();
                        if self.loop_guard.record(action) {
                            warn!(%action, streak = self.loop_guard.streak(), "same action keeps failing");
                            return Some(MissionOutcome::Interrupted {
                                reason: format!(
                                    "stalled: {action} failed {} times in a row ({reason})",
                                    self.loop_guard.streak()
                                ),
                            });
                        }
                        None
                    }
                }
            }
            Err(ActionError { error, record }) => {
                self.sink.record_action(&record);
                match error {
                    e if e.is_recoverable() => {
                        warn!(error = %e, %action, "hardware timeout; skipping this tick");
                        self.queue.clear();
                        None
                    }
                    e @ RoamerError::HardwareFailure { .. } => Some(MissionOutcome::Interrupted {
                        reason: e.to_string(),
                    }),
                    e => {
                        warn!(error = %e, %action, "action failed");
                        self.queue.clear();
                        None
                    }
                }
            }
        }
    }

    fn publish_tick(&mut self) {
        let tick = TickRecord {
            step: self.tracker.state().step,
            pose: self.world.pose(),
            detections: self.world.detections().iter().cloned().collect(),
            regions: self.world.regions().to_vec(),
            state: self.tracker.state().clone(),
            timestamp: Utc::now(),
        };
        self.sink.record_tick(&tick);
    }
}

//! [`GridNavigator`] – executes one [`RobotAction`] as a small state machine.
//!
//! ```text
//!            gate ok            heading within ±angle_deviation
//!   Idle ───────────▶ Turning ───────────────────────────────▶ Straight ──▶ Idle
//!     │                                                          │
//!     │ gate refuses / unsafe                  step unsafe /     │
//!     └──────────────────────────▶ Aborted ◀── malformed scan ───┘
//! ```
//!
//! - **Turning** issues `turn_step`-degree turns toward the commanded
//!   direction, refreshing the world model after each.  It gives up after
//!   `max_turn_iterations` with a warning and proceeds best-effort.
//! - **Straight** fixes a target point `distance` mm along the post-turn
//!   heading (not the ideal compass bearing, which may differ by up to
//!   `angle_deviation`, or by more after a best-effort turn) and drives
//!   `straight_step`-mm steps toward it.  Every clearance check on this leg
//!   looks along the heading the robot actually drives: once for the full
//!   distance before the first step, then for each step's length.  An unsafe
//!   verdict stops the action at once.  The leg is bounded by
//!   `ceil(distance / straight_step) + max_straight_overshoot` steps.
//!
//! Hardware errors are returned to the caller as an [`ActionError`] that
//! still carries the [`ActionRecord`] of whatever had moved.  A malformed
//! scan aborts the action, treating the unknown surroundings as unsafe.

use std::fmt;

use chrono::Utc;
use roamer_hal::HardwareActuator;
use roamer_kernel::MotionGate;
use roamer_types::{ActionRecord, Pose, RoamerError, RobotAction, geometry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::world_model::WorldModel;

/// Tuning for [`GridNavigator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Turning stops once the heading error is within this many degrees.
    pub angle_deviation: i32,
    pub turn_step: i32,
    pub turn_speed: u32,
    pub max_turn_iterations: u32,
    /// Straight driving stops once closer than this to the target point.
    pub pos_deviation: i32,
    pub straight_step: i32,
    pub straight_speed: u32,
    pub max_straight_overshoot: u32,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            angle_deviation: 5,
            turn_step: 5,
            turn_speed: 100,
            max_turn_iterations: 90,
            pos_deviation: 10,
            straight_step: 10,
            straight_speed: 100,
            max_straight_overshoot: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavState {
    Idle,
    Turning,
    Straight,
    Aborted,
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NavState::Idle => "idle",
            NavState::Turning => "turning",
            NavState::Straight => "straight",
            NavState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// How an action ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Ran to the end.  `note` is set when a bounded loop exited best-effort.
    Completed { note: Option<String> },
    /// A motion rule refused the action; nothing was sent to the hardware.
    Rejected { reason: String },
    /// Stopped for safety, before or during motion.
    Aborted { reason: String },
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport {
    pub outcome: ActionOutcome,
    pub record: ActionRecord,
}

/// A hardware error that cut an action short.
///
/// `record` describes the action up to the failure; `executed` is set when
/// a motion command had already been issued.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionError {
    pub error: RoamerError,
    pub record: ActionRecord,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} interrupted: {}", self.record.action, self.error)
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub struct GridNavigator {
    config: NavigatorConfig,
    gate: MotionGate,
    state: NavState,
}

/// Result of one world refresh inside a motion loop.
enum Sensed {
    Fresh,
    Malformed(String),
}

fn sense(world: &mut WorldModel, hw: &mut dyn HardwareActuator) -> Result<Sensed, RoamerError> {
    match world.refresh(hw) {
        Ok(()) => Ok(Sensed::Fresh),
        Err(RoamerError::InvalidScanData(details)) => Ok(Sensed::Malformed(details)),
        Err(e) => Err(e),
    }
}

impl GridNavigator {
    pub fn new(config: NavigatorConfig, gate: MotionGate) -> Self {
        Self {
            config,
            gate,
            state: NavState::Idle,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Run `action` to completion (or abort) and describe what happened.
    ///
    /// # Errors
    ///
    /// [`RoamerError::HardwareFailure`] and [`RoamerError::HardwareTimeout`]
    /// from the actuator, wrapped with the action's record.  The navigator is
    /// left in [`NavState::Aborted`].
    pub fn execute(
        &mut self,
        hw: &mut dyn HardwareActuator,
        world: &mut WorldModel,
        action: RobotAction,
        step: u32,
    ) -> Result<ActionReport, ActionError> {
        let span = info_span!("action", step, %action);
        let _enter = span.enter();

        self.state = NavState::Idle;
        let mut run = ActionRun::new(action, step, world.pose());

        let result = self.drive(hw, world, &mut run);
        match result {
            Ok(outcome) => {
                self.state = if outcome.is_completed() {
                    NavState::Idle
                } else {
                    NavState::Aborted
                };
                let record = run.finish(world.pose(), outcome.is_completed(), outcome_reason(&outcome));
                info!(outcome = ?outcome, after = %record.pos_after, "action finished");
                Ok(ActionReport { outcome, record })
            }
            Err(error) => {
                self.state = NavState::Aborted;
                let record = run.finish(world.pose(), false, Some(format!("hardware error: {error}")));
                warn!(%error, executed = record.executed, "action interrupted by hardware error");
                Err(ActionError { error, record })
            }
        }
    }

    fn drive(
        &mut self,
        hw: &mut dyn HardwareActuator,
        world: &mut WorldModel,
        run: &mut ActionRun,
    ) -> Result<ActionOutcome, RoamerError> {
        if let Sensed::Malformed(details) = sense(world, hw)? {
            return Ok(abort_malformed(&details));
        }
        run.pos_before = world.pose();

        let Some(scan) = world.scan() else {
            return Ok(no_scan());
        };

        let verdict = match self.gate.authorize(&run.action, scan, world.pose().heading()) {
            Ok(v) => v,
            Err(e) => {
                return Ok(ActionOutcome::Rejected {
                    reason: e.to_string(),
                });
            }
        };
        if !verdict.is_safe {
            debug!(reason = %verdict.reason, "pre-move clearance check failed");
            return Ok(ActionOutcome::Aborted {
                reason: verdict.reason,
            });
        }

        let target_heading = self.gate.validator().table().bearing(run.action.direction);
        let mut notes = Vec::new();

        // ── Turning ──────────────────────────────────────────────────────────
        self.state = NavState::Turning;
        match self.turn_toward(hw, world, run, target_heading)? {
            Leg::Done => {}
            Leg::BestEffort(note) => notes.push(note),
            Leg::Stopped(outcome) => return Ok(outcome),
        }

        // ── Straight ─────────────────────────────────────────────────────────
        if run.action.distance > 0 {
            self.state = NavState::Straight;
            match self.drive_straight(hw, world, run)? {
                Leg::Done => {}
                Leg::BestEffort(note) => notes.push(note),
                Leg::Stopped(outcome) => return Ok(outcome),
            }
            // Final full sensor update before returning to Idle.
            if let Sensed::Malformed(details) = sense(world, hw)? {
                return Ok(abort_malformed(&details));
            }
        }

        let note = (!notes.is_empty()).then(|| notes.join("; "));
        Ok(ActionOutcome::Completed { note })
    }

    fn turn_toward(
        &self,
        hw: &mut dyn HardwareActuator,
        world: &mut WorldModel,
        run: &mut ActionRun,
        target_heading: i32,
    ) -> Result<Leg, RoamerError> {
        let cfg = &self.config;
        for _ in 0..cfg.max_turn_iterations {
            let error = geometry::shortest_turn(world.pose().heading(), target_heading);
            if error.abs() <= cfg.angle_deviation {
                return Ok(Leg::Done);
            }
            let step = error.signum() * cfg.turn_step.max(1).min(error.abs());
            hw.turn(step, cfg.turn_speed)?;
            run.executed = true;
            hw.wait_for_motion()?;
            if let Sensed::Malformed(details) = sense(world, hw)? {
                return Ok(Leg::Stopped(abort_malformed(&details)));
            }
        }

        let error = geometry::shortest_turn(world.pose().heading(), target_heading);
        if error.abs() <= cfg.angle_deviation {
            return Ok(Leg::Done);
        }
        warn!(
            heading = world.pose().heading(),
            target_heading,
            iterations = cfg.max_turn_iterations,
            "turn did not converge; continuing best-effort"
        );
        Ok(Leg::BestEffort(format!(
            "turn stopped {error}° short of {target_heading}° after {} iterations",
            cfg.max_turn_iterations
        )))
    }

    fn drive_straight(
        &self,
        hw: &mut dyn HardwareActuator,
        world: &mut WorldModel,
        run: &mut ActionRun,
    ) -> Result<Leg, RoamerError> {
        let cfg = &self.config;
        let validator = self.gate.validator();
        let start = world.pose();
        let heading = start.heading();

        // The gate vetted the compass bearing; re-vet the heading the robot
        // will actually drive along.
        let Some(scan) = world.scan() else {
            return Ok(Leg::Stopped(no_scan()));
        };
        let leg = validator.check_bearing(scan, heading, heading, run.action.distance);
        if !leg.is_safe {
            info!(reason = %leg.reason, heading, "straight leg refused along actual heading");
            return Ok(Leg::Stopped(ActionOutcome::Aborted { reason: leg.reason }));
        }

        let (tx, ty) = geometry::project(start.x, start.y, heading, run.action.distance);
        let step_len = cfg.straight_step.max(1);
        let max_steps = (run.action.distance + step_len - 1) / step_len
            + cfg.max_straight_overshoot as i32;
        debug!(target_x = tx, target_y = ty, heading, max_steps, "straight leg planned");

        for _ in 0..max_steps {
            let pose = world.pose();
            let remaining = pose.distance_to(tx, ty);
            if remaining < cfg.pos_deviation {
                return Ok(Leg::Done);
            }
            let this_step = step_len.min(remaining);

            let Some(scan) = world.scan() else {
                return Ok(Leg::Stopped(no_scan()));
            };
            let verdict = validator.check_bearing(scan, pose.heading(), pose.heading(), this_step);
            if !verdict.is_safe {
                info!(reason = %verdict.reason, remaining, "straight leg aborted");
                return Ok(Leg::Stopped(ActionOutcome::Aborted {
                    reason: verdict.reason,
                }));
            }

            hw.move_straight(this_step, cfg.straight_speed)?;
            run.executed = true;
            hw.wait_for_motion()?;
            if let Sensed::Malformed(details) = sense(world, hw)? {
                return Ok(Leg::Stopped(abort_malformed(&details)));
            }
        }

        let remaining = world.pose().distance_to(tx, ty);
        if remaining < cfg.pos_deviation {
            return Ok(Leg::Done);
        }
        warn!(remaining, max_steps, "straight leg did not reach its target; continuing best-effort");
        Ok(Leg::BestEffort(format!(
            "straight leg stopped {remaining} mm short after {max_steps} steps"
        )))
    }
}

enum Leg {
    Done,
    BestEffort(String),
    Stopped(ActionOutcome),
}

fn no_scan() -> ActionOutcome {
    ActionOutcome::Aborted {
        reason: "no scan available".to_string(),
    }
}

fn outcome_reason(outcome: &ActionOutcome) -> Option<String> {
    match outcome {
        ActionOutcome::Completed { note } => note.clone(),
        ActionOutcome::Rejected { reason } | ActionOutcome::Aborted { reason } => Some(reason.clone()),
    }
}

fn abort_malformed(details: &str) -> ActionOutcome {
    warn!(details, "malformed scan; treating surroundings as unsafe");
    ActionOutcome::Aborted {
        reason: format!("invalid scan data: {details}"),
    }
}

/// Book-keeping for the action currently being executed.
struct ActionRun {
    action: RobotAction,
    step: u32,
    pos_before: Pose,
    executed: bool,
}

impl ActionRun {
    fn new(action: RobotAction, step: u32, pos_before: Pose) -> Self {
        Self {
            action,
            step,
            pos_before,
            executed: false,
        }
    }

    fn finish(&self, pos_after: Pose, safe: bool, reason: Option<String>) -> ActionRecord {
        ActionRecord {
            step: self.step,
            action: self.action,
            pos_before: self.pos_before,
            pos_after,
            executed: self.executed,
            safe,
            reason,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use roamer_hal::{SimBody, SimCommand, SimRobot};
    use roamer_kernel::{GateConfig, SafetyConfig, SafetyValidator};
    use roamer_perception::{ObjectMatcher, ObstacleDetector};
    use roamer_types::{
        Direction, DirectionTable, ObjectKind, ScanConvention, ScanFrame, WorldObject,
    };

    fn navigator(margin: i32) -> GridNavigator {
        let validator = SafetyValidator::new(
            SafetyConfig {
                angle_threshold: 15,
                safety_margin: margin,
            },
            DirectionTable::default(),
            ScanConvention::default(),
        );
        GridNavigator::new(
            NavigatorConfig::default(),
            MotionGate::from_config(&GateConfig::default(), validator),
        )
    }

    fn world(objects: Vec<WorldObject>) -> WorldModel {
        WorldModel::new(
            Arc::new(objects),
            None,
            ObjectMatcher::default(),
            ObstacleDetector::default(),
        )
    }

    fn turns(robot: &SimRobot) -> Vec<i32> {
        robot
            .commands()
            .iter()
            .filter_map(|c| match c {
                SimCommand::Turn { degrees, .. } => Some(*degrees),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn turns_then_drives_to_target_point() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s");
        let report = nav
            .execute(&mut robot, &mut w, RobotAction::new(Direction::East, 300), 0)
            .unwrap();

        assert!(report.outcome.is_completed());
        assert_eq!(nav.state(), NavState::Idle);
        // Counter-clockwise in 5° steps until within 5° of east.
        assert_eq!(turns(&robot), vec![5; 17]);
        let pose = robot.pose();
        assert_eq!(pose.heading(), 85);
        let (tx, ty) = geometry::project(0, 0, 85, 300);
        assert!(pose.distance_to(tx, ty) < 10, "ended at {pose}");
        assert_eq!(report.record.pos_before, Pose::new(0, 0, 0));
        assert!(report.record.executed);
        assert!(report.record.safe);
        assert!(report.record.reason.is_none());
    }

    #[test]
    fn turns_clockwise_when_shorter() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s");
        nav.execute(&mut robot, &mut w, RobotAction::new(Direction::West, 0), 0)
            .unwrap();
        assert_eq!(turns(&robot), vec![-5; 17]);
        assert_eq!(robot.pose().heading(), 275);
    }

    #[test]
    fn small_heading_error_skips_turning() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s").at(Pose::new(0, 0, 3));
        nav.execute(&mut robot, &mut w, RobotAction::new(Direction::North, 20), 0)
            .unwrap();
        assert!(turns(&robot).is_empty());
    }

    #[test]
    fn turn_loop_is_bounded() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s").with_turn_gain(0.0);
        let report = nav
            .execute(&mut robot, &mut w, RobotAction::new(Direction::South, 0), 0)
            .unwrap();
        assert_eq!(turns(&robot).len(), 90);
        match report.outcome {
            ActionOutcome::Completed { note: Some(note) } => assert!(note.contains("turn")),
            other => panic!("expected best-effort completion, got {other:?}"),
        }
    }

    #[test]
    fn straight_leg_is_bounded() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s").with_drive_gain(0.0);
        let report = nav
            .execute(&mut robot, &mut w, RobotAction::new(Direction::North, 100), 0)
            .unwrap();
        let straights = robot
            .commands()
            .iter()
            .filter(|c| matches!(c, SimCommand::Straight { .. }))
            .count();
        assert_eq!(straights, 10 + 50);
        assert!(matches!(report.outcome, ActionOutcome::Completed { note: Some(_) }));
    }

    #[test]
    fn blocked_direction_is_aborted_before_moving() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s").with_bodies(vec![SimBody::new(400, 0, 50)]);
        let report = nav
            .execute(&mut robot, &mut w, RobotAction::new(Direction::North, 300), 0)
            .unwrap();
        assert!(matches!(report.outcome, ActionOutcome::Aborted { ref reason } if reason.contains("350 mm")));
        assert!(robot.commands().is_empty());
        assert!(!report.record.executed);
        assert!(!report.record.safe);
        assert_eq!(nav.state(), NavState::Aborted);
    }

    #[test]
    fn obstacle_appearing_mid_move_aborts() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        // Clear at first; the sweep turns hostile after the robot starts.
        let mut robot = SimRobot::new("s").with_static_scan(ScanFrame::uniform(6000));
        let mut hw = Hostile {
            inner: &mut robot,
            reads_before_block: 3,
        };
        let report = nav
            .execute(&mut hw, &mut w, RobotAction::new(Direction::North, 500), 0)
            .unwrap();
        match &report.outcome {
            ActionOutcome::Aborted { reason } => assert!(reason.contains("blocked")),
            other => panic!("expected abort, got {other:?}"),
        }
        assert!(report.record.executed);
        assert!(!report.record.safe);
        let pose = robot.pose();
        assert!(pose.x > 0 && pose.x < 500, "stopped at {pose}");
    }

    #[test]
    fn oversized_action_is_rejected() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s");
        let report = nav
            .execute(&mut robot, &mut w, RobotAction::new(Direction::North, 5000), 0)
            .unwrap();
        assert!(matches!(report.outcome, ActionOutcome::Rejected { .. }));
        assert!(robot.commands().is_empty());
    }

    #[test]
    fn malformed_scan_aborts_safely() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s");
        let mut hw = Garbled {
            inner: &mut robot,
            good_reads: 2,
        };
        let report = nav
            .execute(&mut hw, &mut w, RobotAction::new(Direction::North, 200), 0)
            .unwrap();
        assert!(matches!(report.outcome, ActionOutcome::Aborted { ref reason } if reason.contains("invalid scan")));
    }

    #[test]
    fn hardware_failure_propagates() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s").failing_reads(1);
        let err = nav
            .execute(&mut robot, &mut w, RobotAction::new(Direction::North, 200), 0)
            .unwrap_err();
        assert!(matches!(err.error, RoamerError::HardwareFailure { .. }));
        assert!(!err.record.executed);
        assert_eq!(nav.state(), NavState::Aborted);
    }

    #[test]
    fn hardware_failure_mid_move_keeps_the_record() {
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s");
        let mut hw = Severed {
            inner: &mut robot,
            straights_before_failure: 2,
        };
        let err = nav
            .execute(&mut hw, &mut w, RobotAction::new(Direction::North, 200), 4)
            .unwrap_err();

        assert!(matches!(err.error, RoamerError::HardwareFailure { .. }));
        let record = &err.record;
        assert_eq!(record.step, 4);
        assert!(record.executed);
        assert!(!record.safe);
        assert_eq!(record.pos_before, Pose::new(0, 0, 0));
        assert_eq!(record.pos_after, Pose::new(20, 0, 0));
        assert!(record.reason.as_deref().is_some_and(|r| r.starts_with("hardware error")));
    }

    #[test]
    fn stalled_turn_is_refused_along_the_heading_actually_faced() {
        // The turn never takes effect, so the robot still faces the body at
        // (300, 0) when it would start driving "south".
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s")
            .with_turn_gain(0.0)
            .with_bodies(vec![SimBody::new(300, 0, 50)]);
        let report = nav
            .execute(&mut robot, &mut w, RobotAction::new(Direction::South, 500), 0)
            .unwrap();

        match &report.outcome {
            ActionOutcome::Aborted { reason } => assert!(reason.contains("250 mm"), "{reason}"),
            other => panic!("expected abort, got {other:?}"),
        }
        assert!(
            !robot
                .commands()
                .iter()
                .any(|c| matches!(c, SimCommand::Straight { .. }))
        );
        assert_eq!(robot.pose(), Pose::new(0, 0, 0));
        assert_eq!(robot.collisions(), 0);
    }

    #[test]
    fn straight_steps_watch_the_heading_actually_driven() {
        // Turning is stuck at 0°, so a "south" leg drives along +X.  A wall
        // that shows up ahead after a few steps must stop it even though it
        // is nowhere near the south bearing.
        let mut nav = navigator(100);
        let mut w = world(Vec::new());
        let mut robot = SimRobot::new("s")
            .with_turn_gain(0.0)
            .with_static_scan(ScanFrame::uniform(6000));
        let mut hw = Hostile {
            inner: &mut robot,
            // One initial read, one per turn iteration, then two steps.
            reads_before_block: 1 + 90 + 2,
        };
        let report = nav
            .execute(&mut hw, &mut w, RobotAction::new(Direction::South, 500), 0)
            .unwrap();

        match &report.outcome {
            ActionOutcome::Aborted { reason } => assert!(reason.contains("blocked")),
            other => panic!("expected abort, got {other:?}"),
        }
        let pose = robot.pose();
        assert!(pose.x > 0 && pose.x < 100, "stopped at {pose}");
        assert_eq!(pose.y, 0);
    }

    #[test]
    fn detections_accumulate_during_motion() {
        let mut nav = navigator(100);
        // A can off to the side is only in matching range once the robot
        // has moved closer to it.
        let can = WorldObject::new(5, "Can", ObjectKind::Target, 600, 400);
        let mut w = world(vec![can]);
        let mut robot = SimRobot::new("s")
            .with_max_range(450)
            .with_bodies(vec![SimBody::new(600, 400, 30)]);
        w.refresh(&mut robot).unwrap();
        assert!(!w.detections().contains(5));
        nav.execute(&mut robot, &mut w, RobotAction::new(Direction::North, 300), 0)
            .unwrap();
        assert!(w.detections().contains(5));
    }

    // ── Test doubles ─────────────────────────────────────────────────────────

    /// Serves the inner scan for a few reads, then a wall 50 mm ahead.
    struct Hostile<'a> {
        inner: &'a mut SimRobot,
        reads_before_block: u32,
    }

    impl HardwareActuator for Hostile<'_> {
        fn id(&self) -> &str {
            self.inner.id()
        }
        fn read_scan(&mut self) -> Result<ScanFrame, RoamerError> {
            if self.reads_before_block == 0 {
                return Ok(ScanFrame::uniform(6000).with_sector(160, 200, 50));
            }
            self.reads_before_block -= 1;
            self.inner.read_scan()
        }
        fn read_pose(&mut self) -> Result<Pose, RoamerError> {
            self.inner.read_pose()
        }
        fn turn(&mut self, degrees: i32, speed: u32) -> Result<(), RoamerError> {
            self.inner.turn(degrees, speed)
        }
        fn move_straight(&mut self, distance: i32, speed: u32) -> Result<(), RoamerError> {
            self.inner.move_straight(distance, speed)
        }
        fn wait_for_motion(&mut self) -> Result<(), RoamerError> {
            self.inner.wait_for_motion()
        }
    }

    /// Loses the motor bus after `straights_before_failure` forward steps.
    struct Severed<'a> {
        inner: &'a mut SimRobot,
        straights_before_failure: u32,
    }

    impl HardwareActuator for Severed<'_> {
        fn id(&self) -> &str {
            self.inner.id()
        }
        fn read_scan(&mut self) -> Result<ScanFrame, RoamerError> {
            self.inner.read_scan()
        }
        fn read_pose(&mut self) -> Result<Pose, RoamerError> {
            self.inner.read_pose()
        }
        fn turn(&mut self, degrees: i32, speed: u32) -> Result<(), RoamerError> {
            self.inner.turn(degrees, speed)
        }
        fn move_straight(&mut self, distance: i32, speed: u32) -> Result<(), RoamerError> {
            if self.straights_before_failure == 0 {
                return Err(RoamerError::HardwareFailure {
                    component: "motor".to_string(),
                    details: "bus lost".to_string(),
                });
            }
            self.straights_before_failure -= 1;
            self.inner.move_straight(distance, speed)
        }
        fn wait_for_motion(&mut self) -> Result<(), RoamerError> {
            self.inner.wait_for_motion()
        }
    }

    /// Returns a truncated sweep after `good_reads` scans.
    struct Garbled<'a> {
        inner: &'a mut SimRobot,
        good_reads: u32,
    }

    impl HardwareActuator for Garbled<'_> {
        fn id(&self) -> &str {
            self.inner.id()
        }
        fn read_scan(&mut self) -> Result<ScanFrame, RoamerError> {
            if self.good_reads == 0 {
                return ScanFrame::new(vec![6000; 180]);
            }
            self.good_reads -= 1;
            self.inner.read_scan()
        }
        fn read_pose(&mut self) -> Result<Pose, RoamerError> {
            self.inner.read_pose()
        }
        fn turn(&mut self, degrees: i32, speed: u32) -> Result<(), RoamerError> {
            self.inner.turn(degrees, speed)
        }
        fn move_straight(&mut self, distance: i32, speed: u32) -> Result<(), RoamerError> {
            self.inner.move_straight(distance, speed)
        }
        fn wait_for_motion(&mut self) -> Result<(), RoamerError> {
            self.inner.wait_for_motion()
        }
    }
}

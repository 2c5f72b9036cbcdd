//! Planning seam between the mission loop and whatever decides where to go.
//!
//! The mission loop calls [`Planner::plan`] whenever its action queue is
//! empty and executes the returned actions in order.  It never inspects the
//! planner's reasoning; each action is vetted at run time by the motion gate.
//!
//! An LLM-backed planner is expected to request output matching
//! [`plan_schema`] and hand the raw text to [`parse_plan`].

use std::collections::VecDeque;

use roamer_perception::DetectionSet;
use roamer_types::{
    Direction, DirectionTable, MissionState, ObstacleRegion, Pose, RoamerError, RobotAction,
    WorldObject, geometry,
};
use schemars::schema_for;
use serde::Deserialize;
use tracing::debug;

/// Everything a planner may look at when asked for the next actions.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub state: &'a MissionState,
    pub detections: &'a DetectionSet,
    pub regions: &'a [ObstacleRegion],
    pub pose: Pose,
}

pub trait Planner: Send {
    /// Next actions to run, first to last.  An empty list means "nothing to
    /// do this tick".
    fn plan(&mut self, ctx: &PlanContext<'_>) -> Vec<RobotAction>;
}

// ────────────────────────────────────────────────────────────────────────────
// ScriptedPlanner
// ────────────────────────────────────────────────────────────────────────────

/// Replays pre-recorded batches, one batch per call, then returns nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPlanner {
    batches: VecDeque<Vec<RobotAction>>,
    calls: u32,
}

impl ScriptedPlanner {
    pub fn new(batches: impl IntoIterator<Item = Vec<RobotAction>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
            calls: 0,
        }
    }

    /// A single batch holding every action.
    pub fn once(actions: Vec<RobotAction>) -> Self {
        Self::new([actions])
    }

    /// How many times [`Planner::plan`] has been called.
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl Planner for ScriptedPlanner {
    fn plan(&mut self, _ctx: &PlanContext<'_>) -> Vec<RobotAction> {
        self.calls += 1;
        self.batches.pop_front().unwrap_or_default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GreedyPlanner
// ────────────────────────────────────────────────────────────────────────────

/// Heads for the nearest target not yet reached, one compass leg at a time.
///
/// Each leg follows the compass label closest to the target's bearing and is
/// capped at `max_leg`.  It stops `standoff` mm short of the target so the
/// robot does not drive into it.
///
/// When the previous leg left the robot exactly where it was (the move was
/// refused or aborted before it started) the next-best compass label is
/// tried instead, for half a leg.
#[derive(Debug, Clone)]
pub struct GreedyPlanner {
    targets: Vec<WorldObject>,
    table: DirectionTable,
    max_leg: i32,
    standoff: i32,
    last: Option<(Pose, RobotAction)>,
    detour: usize,
}

impl GreedyPlanner {
    pub fn new(targets: impl IntoIterator<Item = WorldObject>, table: DirectionTable) -> Self {
        Self {
            targets: targets.into_iter().filter(|t| t.is_target()).collect(),
            table,
            max_leg: 600,
            standoff: 0,
            last: None,
            detour: 0,
        }
    }

    pub fn with_max_leg(mut self, max_leg: i32) -> Self {
        self.max_leg = max_leg.max(0);
        self
    }

    pub fn with_standoff(mut self, standoff: i32) -> Self {
        self.standoff = standoff.max(0);
        self
    }
}

impl Planner for GreedyPlanner {
    fn plan(&mut self, ctx: &PlanContext<'_>) -> Vec<RobotAction> {
        let pose = ctx.pose;
        let nearest = self
            .targets
            .iter()
            .filter(|t| !ctx.state.reached_target_ids.contains(&t.id))
            .min_by_key(|t| pose.distance_to(t.x, t.y));
        let Some(target) = nearest else {
            return Vec::new();
        };

        let stuck = matches!(self.last, Some((at, action)) if at == pose && action.distance > 0);
        self.detour = if stuck { self.detour + 1 } else { 0 };

        let bearing = geometry::bearing(pose.x, pose.y, target.x, target.y);
        let direct = (pose.distance_to(target.x, target.y) - self.standoff).clamp(0, self.max_leg);
        let action = if self.detour == 0 {
            RobotAction::new(Direction::nearest(bearing, &self.table), direct)
        } else {
            let mut ranked = Direction::ALL;
            ranked.sort_by_key(|d| geometry::shortest_turn(self.table.bearing(*d), bearing).abs());
            let direction = ranked[self.detour % ranked.len()];
            RobotAction::new(direction, (self.max_leg / 2).max(1))
        };
        debug!(target = target.id, bearing, detour = self.detour, %action, "greedy leg");
        self.last = Some((pose, action));
        vec![action]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured planner output
// ────────────────────────────────────────────────────────────────────────────

/// JSON Schema for a plan: an array of `{ "direction": "N", "distance": 400 }`.
pub fn plan_schema() -> serde_json::Value {
    serde_json::to_value(schema_for!(Vec<RobotAction>)).unwrap_or(serde_json::Value::Null)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanStep {
    Fields { direction: String, distance: i32 },
    Token(String),
}

/// Parse planner output into actions.
///
/// Accepts a JSON array whose elements are either objects with `direction`
/// and `distance` fields or `"<direction> <distance>"` strings.  Direction
/// tokens are matched case-insensitively in short or long form.
///
/// # Errors
///
/// - [`RoamerError::InvalidAction`] when the text is not such an array or a
///   distance is negative.
/// - [`RoamerError::InvalidDirection`] for an unknown direction token.
pub fn parse_plan(raw: &str) -> Result<Vec<RobotAction>, RoamerError> {
    let steps: Vec<PlanStep> = serde_json::from_str(raw.trim())
        .map_err(|e| RoamerError::InvalidAction(format!("plan is not an action array: {e}")))?;
    steps
        .into_iter()
        .map(|step| match step {
            PlanStep::Fields {
                direction,
                distance,
            } => RobotAction::from_tokens(&direction, distance),
            PlanStep::Token(token) => token.parse(),
        })
        .collect()
}

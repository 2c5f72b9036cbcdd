//! `roamer-types` – shared data model for the Roamer navigation stack.
//!
//! Every crate in the workspace speaks these types: robot [`Pose`]s, the
//! static [`WorldObject`] registry, per-tick [`Detection`]s and
//! [`ObstacleRegion`]s, planner-issued [`RobotAction`]s, and the
//! [`RoamerError`] that spans hardware and input failures.
//!
//! # Modules
//!
//! - [`geometry`] – angle normalisation, distance, shortest turn, bearings.
//! - [`scan`] – [`ScanFrame`][scan::ScanFrame] and the
//!   [`ScanConvention`][scan::ScanConvention] calibration constant.

pub mod geometry;
pub mod scan;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use scan::{SCAN_SIZE, ScanConvention, ScanFrame};

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Robot position (mm) and heading (degrees, world frame).
///
/// A pose is an immutable snapshot replaced wholesale on every sensor read.
/// The heading is always normalised to `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    #[serde(deserialize_with = "normalized_heading")]
    heading: i32,
}

impl Pose {
    pub fn new(x: i32, y: i32, heading: i32) -> Self {
        Self {
            x,
            y,
            heading: geometry::normalize_angle(heading),
        }
    }

    pub fn heading(&self) -> i32 {
        self.heading
    }

    /// Truncated Euclidean distance to `(x, y)`.
    pub fn distance_to(&self, x: i32, y: i32) -> i32 {
        geometry::distance(self.x, self.y, x, y)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) facing {}°", self.x, self.y, self.heading)
    }
}

fn normalized_heading<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    i32::deserialize(deserializer).map(geometry::normalize_angle)
}

// ────────────────────────────────────────────────────────────────────────────
// World registry entries
// ────────────────────────────────────────────────────────────────────────────

/// What a [`WorldObject`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Robot,
    Obstacle,
    Target,
}

/// Ground-truth registry entry, created once when the world is built and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Unique, non-zero identifier.
    pub id: u32,
    pub name: String,
    pub kind: ObjectKind,
    pub x: i32,
    pub y: i32,
    /// Orientation of the object itself (degrees); informational only.
    #[serde(default)]
    pub angle: i32,
}

impl WorldObject {
    pub fn new(id: u32, name: impl Into<String>, kind: ObjectKind, x: i32, y: i32) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            x,
            y,
            angle: 0,
        }
    }

    pub fn is_target(&self) -> bool {
        self.kind == ObjectKind::Target
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Perception outputs
// ────────────────────────────────────────────────────────────────────────────

/// A known object correlated against the current lidar sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub object_id: u32,
    pub name: String,
    pub kind: ObjectKind,
    /// True range from the robot to the object (mm).
    pub distance: i32,
    /// World bearing from the robot to the object (degrees).
    pub bearing: i32,
    /// Lidar reading at the object's scan index (mm).
    pub lidar_distance: u32,
    /// Match quality in `[0.0, 1.0]`, rounded to two decimals.
    pub confidence: f32,
    pub x: i32,
    pub y: i32,
}

/// A contiguous run of near-range scan indices.
///
/// `start_angle` and `end_angle` are inclusive scan indices; a region may
/// wrap past index 359, in which case `end_angle < start_angle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleRegion {
    pub start_angle: i32,
    pub end_angle: i32,
    pub min_distance: u32,
    pub angular_width: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// Planner actions
// ────────────────────────────────────────────────────────────────────────────

/// Eight-way compass label for a commanded move.
///
/// Serialised as the short token (`"N"`, `"NE"`, …); the long lowercase name
/// (`"north"`, `"northeast"`, …) is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Direction {
    #[serde(rename = "N", alias = "north")]
    North,
    #[serde(rename = "NE", alias = "northeast")]
    NorthEast,
    #[serde(rename = "E", alias = "east")]
    East,
    #[serde(rename = "SE", alias = "southeast")]
    SouthEast,
    #[serde(rename = "S", alias = "south")]
    South,
    #[serde(rename = "SW", alias = "southwest")]
    SouthWest,
    #[serde(rename = "W", alias = "west")]
    West,
    #[serde(rename = "NW", alias = "northwest")]
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::NorthEast => "NE",
            Direction::East => "E",
            Direction::SouthEast => "SE",
            Direction::South => "S",
            Direction::SouthWest => "SW",
            Direction::West => "W",
            Direction::NorthWest => "NW",
        }
    }

    /// Compass label whose table bearing is closest to `bearing`.  Ties
    /// resolve to the label that comes first in [`Direction::ALL`].
    pub fn nearest(bearing: i32, table: &DirectionTable) -> Direction {
        let mut best = Direction::North;
        let mut best_gap = i32::MAX;
        for dir in Direction::ALL {
            let gap = geometry::shortest_turn(table.bearing(dir), bearing).abs();
            if gap < best_gap {
                best = dir;
                best_gap = gap;
            }
        }
        best
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Direction {
    type Err = RoamerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dir = match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Direction::North,
            "ne" | "northeast" | "north-east" => Direction::NorthEast,
            "e" | "east" => Direction::East,
            "se" | "southeast" | "south-east" => Direction::SouthEast,
            "s" | "south" => Direction::South,
            "sw" | "southwest" | "south-west" => Direction::SouthWest,
            "w" | "west" => Direction::West,
            "nw" | "northwest" | "north-west" => Direction::NorthWest,
            _ => return Err(RoamerError::InvalidDirection(s.to_string())),
        };
        Ok(dir)
    }
}

/// Direction → world-bearing lookup.
///
/// The default table places N at 0° and proceeds in 45° steps (NE = 45°,
/// E = 90°, …, NW = 315°).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionTable {
    bearings: [i32; 8],
}

impl Default for DirectionTable {
    fn default() -> Self {
        Self {
            bearings: [0, 45, 90, 135, 180, 225, 270, 315],
        }
    }
}

impl DirectionTable {
    /// Build a table from bearings listed in [`Direction::ALL`] order.
    pub fn new(bearings: [i32; 8]) -> Self {
        Self {
            bearings: bearings.map(geometry::normalize_angle),
        }
    }

    pub fn bearing(&self, direction: Direction) -> i32 {
        self.bearings[direction as usize]
    }
}

/// A single commanded move: face `direction`, then drive `distance` mm.
/// A distance of zero only turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RobotAction {
    pub direction: Direction,
    pub distance: i32,
}

impl RobotAction {
    pub fn new(direction: Direction, distance: i32) -> Self {
        Self {
            direction,
            distance,
        }
    }

    /// Build an action from a direction token and a distance.
    ///
    /// # Errors
    ///
    /// - [`RoamerError::InvalidDirection`] for an unknown token.
    /// - [`RoamerError::InvalidAction`] for a negative distance.
    pub fn from_tokens(direction: &str, distance: i32) -> Result<Self, RoamerError> {
        let direction = direction.parse()?;
        if distance < 0 {
            return Err(RoamerError::InvalidAction(format!(
                "distance must be non-negative, got {distance}"
            )));
        }
        Ok(Self::new(direction, distance))
    }
}

impl fmt::Display for RobotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move {} by {}", self.direction, self.distance)
    }
}

impl FromStr for RobotAction {
    type Err = RoamerError;

    /// Parse `"<direction> <distance>"`, e.g. `"NE 300"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(dir), Some(dist), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RoamerError::InvalidAction(format!(
                "expected \"<direction> <distance>\", got {s:?}"
            )));
        };
        let distance = dist
            .parse::<i32>()
            .map_err(|e| RoamerError::InvalidAction(format!("bad distance {dist:?}: {e}")))?;
        Self::from_tokens(dir, distance)
    }
}

/// Per-action record handed to the mission sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub step: u32,
    pub action: RobotAction,
    pub pos_before: Pose,
    pub pos_after: Pose,
    /// `true` once the robot started moving for this action.
    pub executed: bool,
    /// `false` when a safety check stopped the action.
    pub safe: bool,
    /// Why the action stopped early, if it did.
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Mission state
// ────────────────────────────────────────────────────────────────────────────

/// Search-mission progress, owned and mutated only by the mission tracker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MissionState {
    pub targets_total: usize,
    pub targets_remaining: usize,
    pub reached_target_ids: BTreeSet<u32>,
    pub identified_target_ids: BTreeSet<u32>,
    pub step: u32,
    pub step_budget: u32,
}

impl MissionState {
    pub fn new(targets_total: usize, step_budget: u32) -> Self {
        Self {
            targets_total,
            targets_remaining: targets_total,
            step_budget,
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.targets_remaining == 0
    }

    pub fn is_out_of_steps(&self) -> bool {
        self.step >= self.step_budget
    }

    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.is_out_of_steps()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Global error type spanning malformed input, planner tokens and hardware
/// failures.
///
/// Unsafe motion is *not* an error; it is reported through the navigator's
/// outcome types.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoamerError {
    #[error("Invalid scan data: {0}")]
    InvalidScanData(String),

    #[error("Invalid direction: {0:?}")]
    InvalidDirection(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Hardware failure on {component}: {details}")]
    HardwareFailure { component: String, details: String },

    #[error("Hardware timeout in {operation} after {elapsed_ms} ms")]
    HardwareTimeout { operation: String, elapsed_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RoamerError {
    /// `true` for errors the mission loop may ride out with a no-op tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RoamerError::HardwareTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_heading_is_normalized() {
        assert_eq!(Pose::new(0, 0, -90).heading(), 270);
        assert_eq!(Pose::new(0, 0, 720).heading(), 0);

        let back: Pose = serde_json::from_str(r#"{"x":1,"y":2,"heading":-45}"#).unwrap();
        assert_eq!(back.heading(), 315);
    }

    #[test]
    fn direction_tokens_parse_case_insensitively() {
        assert_eq!("N".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("ne".parse::<Direction>().unwrap(), Direction::NorthEast);
        assert_eq!("SouthWest".parse::<Direction>().unwrap(), Direction::SouthWest);
        assert_eq!(" west ".parse::<Direction>().unwrap(), Direction::West);
    }

    #[test]
    fn unknown_direction_rejected() {
        assert!(matches!(
            "up".parse::<Direction>(),
            Err(RoamerError::InvalidDirection(ref t)) if t == "up"
        ));
    }

    #[test]
    fn default_table_matches_compass() {
        let table = DirectionTable::default();
        assert_eq!(table.bearing(Direction::North), 0);
        assert_eq!(table.bearing(Direction::East), 90);
        assert_eq!(table.bearing(Direction::South), 180);
        assert_eq!(table.bearing(Direction::West), 270);
        assert_eq!(table.bearing(Direction::NorthWest), 315);
    }

    #[test]
    fn nearest_direction_rounds_to_closest_label() {
        let table = DirectionTable::default();
        assert_eq!(Direction::nearest(10, &table), Direction::North);
        assert_eq!(Direction::nearest(350, &table), Direction::North);
        assert_eq!(Direction::nearest(100, &table), Direction::East);
        assert_eq!(Direction::nearest(210, &table), Direction::SouthWest);
    }

    #[test]
    fn action_from_tokens_validates() {
        let a = RobotAction::from_tokens("e", 300).unwrap();
        assert_eq!(a, RobotAction::new(Direction::East, 300));
        assert!(matches!(
            RobotAction::from_tokens("E", -1),
            Err(RoamerError::InvalidAction(_))
        ));
        assert!(matches!(
            RobotAction::from_tokens("X", 10),
            Err(RoamerError::InvalidDirection(_))
        ));
    }

    #[test]
    fn action_parses_from_string() {
        let a: RobotAction = "NW 250".parse().unwrap();
        assert_eq!(a, RobotAction::new(Direction::NorthWest, 250));
        assert!("NW".parse::<RobotAction>().is_err());
        assert!("NW ten".parse::<RobotAction>().is_err());
    }

    #[test]
    fn action_json_accepts_long_direction_names() {
        let a: RobotAction =
            serde_json::from_str(r#"{"direction":"northeast","distance":100}"#).unwrap();
        assert_eq!(a.direction, Direction::NorthEast);
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains(r#""NE""#));
    }

    #[test]
    fn mission_state_terminal_conditions() {
        let mut state = MissionState::new(2, 5);
        assert!(!state.is_terminal());
        state.step = 5;
        assert!(state.is_out_of_steps());
        let mut done = MissionState::new(1, 5);
        done.targets_remaining = 0;
        assert!(done.is_complete());
    }

    #[test]
    fn error_display_names_component() {
        let err = RoamerError::HardwareFailure {
            component: "lidar".to_string(),
            details: "no response".to_string(),
        };
        assert!(err.to_string().contains("lidar"));
        assert!(!err.is_recoverable());
        let t = RoamerError::HardwareTimeout {
            operation: "read_scan".to_string(),
            elapsed_ms: 2500,
        };
        assert!(t.is_recoverable());
    }
}

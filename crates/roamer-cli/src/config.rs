//! Configuration – reads/writes `~/.roamer/config.toml`.
//!
//! Every section is optional; anything missing falls back to the built-in
//! arena (one S4 robot, four cans, five balls in a 2 m × 2 m field).

use std::fs;
use std::path::{Path, PathBuf};

use roamer_hal::RetryConfig;
use roamer_kernel::{GateConfig, SafetyConfig};
use roamer_perception::{MatcherConfig, ObstacleConfig};
use roamer_runtime::{MissionConfig, NavigatorConfig};
use roamer_types::{ObjectKind, Pose, RoamerError, RobotAction, ScanConvention, WorldObject};
use serde::{Deserialize, Serialize};

/// The simulated robot running the mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    #[serde(default = "default_robot_id")]
    pub id: u32,
    #[serde(default = "default_robot_name")]
    pub name: String,
    #[serde(default = "default_robot_start")]
    pub start: Pose,
}

/// Simulated field and body sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: i32,
    pub height: i32,
    /// Radius (mm) of the simulated body of every target.
    pub target_radius: u32,
    /// Radius (mm) of the simulated body of every obstacle.
    pub obstacle_radius: u32,
}

/// Tuning for the built-in greedy planner used when no `plan` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub max_leg: i32,
    pub standoff: i32,
}

/// Persisted configuration stored in `~/.roamer/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scripted actions (`"N 400"`, `"southwest 250"`, …).  When empty the
    /// greedy planner drives the mission.
    #[serde(default)]
    pub plan: Vec<String>,

    #[serde(default = "default_robot")]
    pub robot: RobotSpec,

    #[serde(default)]
    pub arena: ArenaConfig,

    #[serde(default)]
    pub convention: ScanConvention,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub obstacle: ObstacleConfig,

    #[serde(default = "default_safety")]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub navigator: NavigatorConfig,

    #[serde(default = "default_mission")]
    pub mission: MissionConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Everything else in the world besides the robot itself.
    #[serde(default = "default_objects")]
    pub objects: Vec<WorldObject>,
}

fn default_robot_id() -> u32 {
    1
}
fn default_robot_name() -> String {
    "S4".to_string()
}
fn default_robot_start() -> Pose {
    Pose::new(999, 500, 90)
}
fn default_robot() -> RobotSpec {
    RobotSpec {
        id: default_robot_id(),
        name: default_robot_name(),
        start: default_robot_start(),
    }
}

// The lidar sees a body's near surface, so with the stock 100 mm margin
// and reach radius a target can be detected but never approached closely
// enough to count.  The demo arena loosens both.
fn default_safety() -> SafetyConfig {
    SafetyConfig {
        safety_margin: 40,
        ..SafetyConfig::default()
    }
}
fn default_mission() -> MissionConfig {
    MissionConfig {
        step_budget: 60,
        reach_radius: 150,
        ..MissionConfig::default()
    }
}

fn default_objects() -> Vec<WorldObject> {
    let cans = [(1716, 1784), (179, 1765), (273, 225), (1766, 129)];
    let balls = [(1362, 600), (509, 442), (1782, 663), (815, 1742), (1745, 1115)];
    let mut objects = Vec::new();
    let mut id = default_robot_id();
    for (x, y) in cans {
        id += 1;
        objects.push(WorldObject::new(id, "Can", ObjectKind::Target, x, y));
    }
    for (x, y) in balls {
        id += 1;
        objects.push(WorldObject::new(id, "Soccer", ObjectKind::Obstacle, x, y));
    }
    objects
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
            target_radius: 25,
            obstacle_radius: 60,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_leg: 600,
            standoff: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan: Vec::new(),
            robot: default_robot(),
            arena: ArenaConfig::default(),
            convention: ScanConvention::default(),
            matcher: MatcherConfig::default(),
            obstacle: ObstacleConfig::default(),
            safety: default_safety(),
            gate: GateConfig::default(),
            navigator: NavigatorConfig::default(),
            mission: default_mission(),
            planner: PlannerConfig::default(),
            retry: RetryConfig::default(),
            objects: default_objects(),
        }
    }
}

impl Config {
    /// The full registry: the robot's own entry followed by `objects`.
    pub fn world(&self) -> Vec<WorldObject> {
        let start = self.robot.start;
        let mut robot = WorldObject::new(self.robot.id, self.robot.name.clone(), ObjectKind::Robot, start.x, start.y);
        robot.angle = start.heading();
        std::iter::once(robot).chain(self.objects.iter().cloned()).collect()
    }

    /// Parse the scripted plan.
    ///
    /// # Errors
    ///
    /// The first entry that is not a valid `"<direction> <distance>"` pair.
    pub fn scripted_plan(&self) -> Result<Vec<RobotAction>, RoamerError> {
        self.plan.iter().map(|entry| entry.parse()).collect()
    }

    /// Reject registries the mission cannot run against.
    ///
    /// # Errors
    ///
    /// [`RoamerError::Config`] for a zero or duplicated object id.
    pub fn validate(&self) -> Result<(), RoamerError> {
        let mut seen = std::collections::BTreeSet::new();
        for obj in self.world() {
            if obj.id == 0 {
                return Err(RoamerError::Config(format!("object {:?} has id 0", obj.name)));
            }
            if !seen.insert(obj.id) {
                return Err(RoamerError::Config(format!("object id {} is used twice", obj.id)));
            }
        }
        Ok(())
    }
}

/// Return the path to `~/.roamer/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".roamer").join("config.toml")
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
///
/// # Errors
///
/// [`RoamerError::Config`] when the file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<Option<Config>, RoamerError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| RoamerError::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| RoamerError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROAMER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROAMER_STEP_BUDGET` | `mission.step_budget` |
/// | `ROAMER_SAFETY_MARGIN` | `safety.safety_margin` |
/// | `ROAMER_REACH_RADIUS` | `mission.reach_radius` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides_from(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ROAMER_STEP_BUDGET")
        && let Ok(budget) = v.parse::<u32>()
    {
        cfg.mission.step_budget = budget;
    }
    if let Some(v) = lookup("ROAMER_SAFETY_MARGIN")
        && let Ok(margin) = v.parse::<i32>()
    {
        cfg.safety.safety_margin = margin;
    }
    if let Some(v) = lookup("ROAMER_REACH_RADIUS")
        && let Ok(radius) = v.parse::<i32>()
    {
        cfg.mission.reach_radius = radius;
    }
}

/// Save the config to `path`, creating the parent directory if necessary.
///
/// # Errors
///
/// [`RoamerError::Config`] on any I/O or serialisation failure.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), RoamerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RoamerError::Config(format!("failed to create {}: {e}", parent.display())))?;
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| RoamerError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| RoamerError::Config(format!("failed to write {}: {e}", path.display())))
}

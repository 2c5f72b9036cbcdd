//! In-process kinematic robot for headless tests and demos.
//!
//! [`SimRobot`] implements [`HardwareActuator`] without any physical
//! hardware.  It integrates turn and straight commands into an internal pose,
//! ray-casts a 360-entry lidar sweep against circular [`SimBody`]s and an
//! optional rectangular arena, and records every motion command it receives
//! so tests can assert on what the navigator actually issued.
//!
//! # Example
//!
//! ```rust
//! use roamer_hal::{HardwareActuator, SimBody, SimRobot};
//! use roamer_types::Pose;
//!
//! let mut robot = SimRobot::new("s4-1")
//!     .at(Pose::new(0, 0, 0))
//!     .with_bodies(vec![SimBody::new(1000, 0, 100)]);
//!
//! let scan = robot.read_scan().unwrap();
//! // Index 180 looks straight ahead under the default convention.
//! assert_eq!(scan.at(180), 900);
//! ```

use roamer_types::{Pose, RoamerError, SCAN_SIZE, ScanConvention, ScanFrame, WorldObject};
use tracing::debug;

use crate::actuator::HardwareActuator;
use crate::camera::CameraFrame;

/// Default lidar range cap (mm) for rays that hit nothing.
pub const DEFAULT_MAX_RANGE: u32 = 6000;

// ────────────────────────────────────────────────────────────────────────────
// World bodies
// ────────────────────────────────────────────────────────────────────────────

/// A circular body the lidar can see and the robot can bump into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimBody {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl SimBody {
    pub fn new(x: i32, y: i32, radius: u32) -> Self {
        Self {
            x: f64::from(x),
            y: f64::from(y),
            radius: f64::from(radius),
        }
    }

    /// Place a body of `radius` mm at a registry object's position.
    pub fn from_object(object: &WorldObject, radius: u32) -> Self {
        Self::new(object.x, object.y, radius)
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy < self.radius * self.radius
    }

    /// Distance along the unit ray `(dx, dy)` from `(ox, oy)` to this body's
    /// boundary, if the ray hits it.
    fn ray_hit(&self, ox: f64, oy: f64, dx: f64, dy: f64) -> Option<f64> {
        let fx = ox - self.x;
        let fy = oy - self.y;
        let b = fx * dx + fy * dy;
        let c = fx * fx + fy * fy - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        // Origin inside the body: the far intersection is still ahead.
        let far = -b + root;
        (far >= 0.0).then_some(0.0)
    }
}

/// A motion command received by the simulator, in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCommand {
    Turn { degrees: i32, speed: u32 },
    Straight { distance: i32, speed: u32 },
    Wait,
}

// ────────────────────────────────────────────────────────────────────────────
// SimRobot
// ────────────────────────────────────────────────────────────────────────────

/// Simulated differential-drive robot.
///
/// Construct with [`SimRobot::new`] and chain the `with_*` methods to shape
/// the world it perceives.
pub struct SimRobot {
    id: String,
    x: f64,
    y: f64,
    heading: f64,
    bodies: Vec<SimBody>,
    arena: Option<(f64, f64)>,
    convention: ScanConvention,
    max_range: u32,
    static_scan: Option<ScanFrame>,
    camera: Option<CameraFrame>,
    failing_reads: u32,
    turn_gain: f64,
    drive_gain: f64,
    commands: Vec<SimCommand>,
    collisions: u32,
}

impl SimRobot {
    /// A robot at the origin facing 0° in an empty, unbounded world.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            bodies: Vec::new(),
            arena: None,
            convention: ScanConvention::default(),
            max_range: DEFAULT_MAX_RANGE,
            static_scan: None,
            camera: None,
            failing_reads: 0,
            turn_gain: 1.0,
            drive_gain: 1.0,
            commands: Vec::new(),
            collisions: 0,
        }
    }

    /// Start at `pose`.
    pub fn at(mut self, pose: Pose) -> Self {
        self.x = f64::from(pose.x);
        self.y = f64::from(pose.y);
        self.heading = f64::from(pose.heading());
        self
    }

    /// Add circular bodies for ray-casting and collision.
    pub fn with_bodies(mut self, bodies: impl IntoIterator<Item = SimBody>) -> Self {
        self.bodies.extend(bodies);
        self
    }

    /// Enclose the world in the rectangle `[0, width] × [0, height]`.
    pub fn with_arena(mut self, width: i32, height: i32) -> Self {
        self.arena = Some((f64::from(width), f64::from(height)));
        self
    }

    pub fn with_convention(mut self, convention: ScanConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_max_range(mut self, max_range: u32) -> Self {
        self.max_range = max_range;
        self
    }

    /// Always return `scan` from [`read_scan`][HardwareActuator::read_scan],
    /// regardless of pose.
    pub fn with_static_scan(mut self, scan: ScanFrame) -> Self {
        self.static_scan = Some(scan);
        self
    }

    /// Return `frame` from [`capture`][HardwareActuator::capture].
    pub fn with_camera_frame(mut self, frame: CameraFrame) -> Self {
        self.camera = Some(frame);
        self
    }

    /// Fail the next `count` scan/pose reads with
    /// [`RoamerError::HardwareFailure`].
    pub fn failing_reads(mut self, count: u32) -> Self {
        self.failing_reads = count;
        self
    }

    /// Scale every commanded turn by `gain`.  A gain of `0.0` models a
    /// robot whose wheels spin without rotating it.
    pub fn with_turn_gain(mut self, gain: f64) -> Self {
        self.turn_gain = gain;
        self
    }

    /// Scale every commanded straight move by `gain`.
    pub fn with_drive_gain(mut self, gain: f64) -> Self {
        self.drive_gain = gain;
        self
    }

    /// Replace the fixed scan mid-run (e.g. to simulate an obstacle stepping
    /// into view).
    pub fn set_static_scan(&mut self, scan: Option<ScanFrame>) {
        self.static_scan = scan;
    }

    /// Rounded ground-truth pose.
    pub fn pose(&self) -> Pose {
        Pose::new(
            self.x.round() as i32,
            self.y.round() as i32,
            self.heading.round() as i32,
        )
    }

    pub fn commands(&self) -> &[SimCommand] {
        &self.commands
    }

    /// Number of straight moves cut short by a body or the arena wall.
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    fn take_read_failure(&mut self, what: &str) -> Result<(), RoamerError> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(RoamerError::HardwareFailure {
                component: self.id.clone(),
                details: format!("simulated {what} failure"),
            });
        }
        Ok(())
    }

    fn blocked(&self, x: f64, y: f64) -> bool {
        if let Some((w, h)) = self.arena {
            if x < 0.0 || y < 0.0 || x > w || y > h {
                return true;
            }
        }
        self.bodies.iter().any(|b| b.contains(x, y))
    }

    fn cast(&self, bearing: i32) -> u32 {
        let rad = f64::from(bearing).to_radians();
        let (dx, dy) = (rad.cos(), rad.sin());
        let mut nearest = f64::from(self.max_range);

        for body in &self.bodies {
            if let Some(t) = body.ray_hit(self.x, self.y, dx, dy) {
                nearest = nearest.min(t);
            }
        }

        if let Some((w, h)) = self.arena {
            let walls = [
                (dx > 0.0).then(|| (w - self.x) / dx),
                (dx < 0.0).then(|| -self.x / dx),
                (dy > 0.0).then(|| (h - self.y) / dy),
                (dy < 0.0).then(|| -self.y / dy),
            ];
            for t in walls.into_iter().flatten() {
                if t >= 0.0 {
                    nearest = nearest.min(t);
                }
            }
        }

        nearest.round() as u32
    }

    fn ray_cast_scan(&self) -> Result<ScanFrame, RoamerError> {
        let heading = self.heading.round() as i32;
        let readings = (0..SCAN_SIZE)
            .map(|i| self.cast(self.convention.bearing_for_index(i, heading)))
            .collect();
        ScanFrame::new(readings)
    }
}

impl HardwareActuator for SimRobot {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_scan(&mut self) -> Result<ScanFrame, RoamerError> {
        self.take_read_failure("scan")?;
        match &self.static_scan {
            Some(scan) => Ok(scan.clone()),
            None => self.ray_cast_scan(),
        }
    }

    fn read_pose(&mut self) -> Result<Pose, RoamerError> {
        self.take_read_failure("pose")?;
        Ok(self.pose())
    }

    fn turn(&mut self, degrees: i32, speed: u32) -> Result<(), RoamerError> {
        self.commands.push(SimCommand::Turn { degrees, speed });
        let turned = self.heading + f64::from(degrees) * self.turn_gain;
        self.heading = turned.rem_euclid(360.0);
        Ok(())
    }

    fn move_straight(&mut self, distance: i32, speed: u32) -> Result<(), RoamerError> {
        self.commands.push(SimCommand::Straight { distance, speed });
        let travel = f64::from(distance) * self.drive_gain;
        let rad = self.heading.to_radians();
        let (ux, uy) = (rad.cos(), rad.sin());
        let sign = travel.signum();
        let mut moved = 0.0;

        // Advance in 1 mm substeps so thin bodies are not tunnelled through.
        while moved < travel.abs() {
            let step = (travel.abs() - moved).min(1.0);
            let nx = self.x + sign * step * ux;
            let ny = self.y + sign * step * uy;
            if self.blocked(nx, ny) {
                self.collisions += 1;
                debug!(robot = %self.id, x = self.x, y = self.y, "sim robot bumped into something");
                break;
            }
            self.x = nx;
            self.y = ny;
            moved += step;
        }
        Ok(())
    }

    fn wait_for_motion(&mut self) -> Result<(), RoamerError> {
        self.commands.push(SimCommand::Wait);
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<CameraFrame>, RoamerError> {
        Ok(self.camera.clone())
    }
}

//! `HardwareActuator` – the narrow capability interface to a mobile base.
//!
//! A driver implements this trait once; the navigator, the mission loop and
//! [`RetryingActuator`][crate::retry::RetryingActuator] only ever talk to the
//! trait.  Every method blocks until the hardware has answered, so the
//! control loop suspends exactly at these calls.

use roamer_types::{Pose, RoamerError, ScanFrame};

use crate::camera::CameraFrame;

/// A differential-drive robot with a 360° lidar and an optional camera.
///
/// Turn angles are degrees, positive counter-clockwise (left).  Distances
/// are millimetres, positive forward.
///
/// # Error contract
///
/// A driver returns `Err` only when the request was *not* applied, so a
/// failed motion command may be re-issued without double-moving the robot.
/// Transport problems are [`RoamerError::HardwareFailure`]; a driver that
/// enforces its own deadline reports [`RoamerError::HardwareTimeout`].
pub trait HardwareActuator: Send {
    /// Stable identifier for this robot, e.g. `"s4-1"`.
    fn id(&self) -> &str;

    /// Take one full lidar sweep.
    fn read_scan(&mut self) -> Result<ScanFrame, RoamerError>;

    /// Read the current pose estimate.
    fn read_pose(&mut self) -> Result<Pose, RoamerError>;

    /// Start an in-place turn of `degrees` at `speed` (deg/s).
    fn turn(&mut self, degrees: i32, speed: u32) -> Result<(), RoamerError>;

    /// Start a straight drive of `distance` mm at `speed` (mm/s).
    fn move_straight(&mut self, distance: i32, speed: u32) -> Result<(), RoamerError>;

    /// Block until the last motion command has completed.
    fn wait_for_motion(&mut self) -> Result<(), RoamerError>;

    /// Grab a camera frame, if this robot has a camera.
    fn capture(&mut self) -> Result<Option<CameraFrame>, RoamerError> {
        Ok(None)
    }
}

impl<T: HardwareActuator + ?Sized> HardwareActuator for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn read_scan(&mut self) -> Result<ScanFrame, RoamerError> {
        (**self).read_scan()
    }

    fn read_pose(&mut self) -> Result<Pose, RoamerError> {
        (**self).read_pose()
    }

    fn turn(&mut self, degrees: i32, speed: u32) -> Result<(), RoamerError> {
        (**self).turn(degrees, speed)
    }

    fn move_straight(&mut self, distance: i32, speed: u32) -> Result<(), RoamerError> {
        (**self).move_straight(distance, speed)
    }

    fn wait_for_motion(&mut self) -> Result<(), RoamerError> {
        (**self).wait_for_motion()
    }

    fn capture(&mut self) -> Result<Option<CameraFrame>, RoamerError> {
        (**self).capture()
    }
}

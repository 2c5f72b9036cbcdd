//! `roamer-hal` – Hardware Abstraction Layer.
//!
//! The rest of the stack never calls a simulator or motor driver directly.
//! It talks to the [`HardwareActuator`][actuator::HardwareActuator]
//! capability trait, so a real robot binding, the in-process
//! [`SimRobot`][sim::SimRobot], or a test double can be swapped without
//! touching perception or navigation logic.
//!
//! # Modules
//!
//! - [`actuator`] – the blocking capability interface (`read_scan`,
//!   `read_pose`, `turn`, `move_straight`, `wait_for_motion`, `capture`).
//! - [`camera`] – [`CameraFrame`][camera::CameraFrame], the raw RGB image a
//!   binding may expose for visual target identification.
//! - [`retry`] – [`RetryingActuator`][retry::RetryingActuator]: bounded
//!   retries and per-call deadlines around any actuator.
//! - [`sim`] – [`SimRobot`][sim::SimRobot]: kinematic fake that ray-casts a
//!   lidar sweep from its pose, for headless tests and demos.

pub mod actuator;
pub mod camera;
pub mod retry;
pub mod sim;

pub use actuator::HardwareActuator;
pub use camera::CameraFrame;
pub use retry::{RetryConfig, RetryingActuator};
pub use sim::{SimBody, SimCommand, SimRobot};

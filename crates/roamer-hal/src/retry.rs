//! [`RetryingActuator`] – bounded retries and call deadlines.
//!
//! Wraps any [`HardwareActuator`] so transient transport failures are retried
//! a fixed number of times before they reach the mission loop, and so a
//! driver that hangs cannot hang the loop with it.
//!
//! The wrapped driver is moved onto its own thread.  Every call is handed
//! over with a one-shot reply channel and the caller waits at most
//! `call_timeout_ms` for the answer.  A call that misses the deadline is
//! abandoned: the caller gets [`RoamerError::HardwareTimeout`] while the
//! driver thread finishes (or stays stuck in) the call, and later calls
//! queue behind it.
//!
//! | Call kind | `Err` from driver | No answer within `call_timeout_ms` |
//! |---|---|---|
//! | reads (`read_scan`, `read_pose`, `capture`) | retried | retried |
//! | motion (`turn`, `move_straight`, `wait_for_motion`) | retried | `HardwareTimeout` at once |
//!
//! A motion command that missed its deadline is never re-issued: it may
//! still move the robot.
//!
//! When the attempts are used up a trailing `HardwareTimeout` is returned
//! unchanged (the caller may ride it out); any other hardware error becomes
//! [`RoamerError::HardwareFailure`].  Input errors such as
//! [`RoamerError::InvalidScanData`] are never retried.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use roamer_types::{Pose, RoamerError, ScanFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actuator::HardwareActuator;
use crate::camera::CameraFrame;

/// Retry policy for [`RetryingActuator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.  Zero is treated
    /// as one.
    pub max_attempts: u32,
    /// Deadline for a single call, in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            call_timeout_ms: 2000,
        }
    }
}

type Job<A> = Box<dyn FnOnce(&mut A) + Send>;

/// A [`HardwareActuator`] decorator that applies a [`RetryConfig`].
pub struct RetryingActuator<A> {
    id: String,
    driver: Arc<Mutex<A>>,
    jobs: Sender<Job<A>>,
    config: RetryConfig,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Motion,
}

impl<A: HardwareActuator + 'static> RetryingActuator<A> {
    /// Move `inner` onto a dedicated driver thread.
    ///
    /// # Errors
    ///
    /// [`RoamerError::HardwareFailure`] when the thread cannot be started.
    pub fn new(inner: A, config: RetryConfig) -> Result<Self, RoamerError> {
        let id = inner.id().to_string();
        let driver = Arc::new(Mutex::new(inner));
        let (jobs, queue) = mpsc::channel::<Job<A>>();

        let worker = Arc::clone(&driver);
        thread::Builder::new()
            .name(format!("hal-{id}"))
            .spawn(move || {
                // Ends once the actuator (and with it the sender) is dropped.
                while let Ok(job) = queue.recv() {
                    let mut hw = worker.lock().unwrap_or_else(PoisonError::into_inner);
                    job(&mut *hw);
                }
            })
            .map_err(|e| RoamerError::HardwareFailure {
                component: id.clone(),
                details: format!("cannot start driver thread: {e}"),
            })?;
        debug!(robot = %id, "driver thread started");

        Ok(Self {
            id,
            driver,
            jobs,
            config,
        })
    }

    /// The wrapped driver.  Blocks while a call is in flight.
    pub fn inner(&self) -> MutexGuard<'_, A> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn call<T, F>(&self, operation: &str, kind: CallKind, f: F) -> Result<T, RoamerError>
    where
        T: Send + 'static,
        F: Fn(&mut A) -> Result<T, RoamerError> + Clone + Send + 'static,
    {
        let attempts = self.config.max_attempts.max(1);
        let deadline = Duration::from_millis(self.config.call_timeout_ms);
        let mut last_err = None;

        for attempt in 1..=attempts {
            let err = match self.dispatch(f.clone(), deadline) {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(
                    e @ (RoamerError::HardwareFailure { .. } | RoamerError::HardwareTimeout { .. }),
                )) => e,
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {
                    let timeout = RoamerError::HardwareTimeout {
                        operation: operation.to_string(),
                        elapsed_ms: self.config.call_timeout_ms,
                    };
                    if kind == CallKind::Motion {
                        warn!(
                            robot = %self.id,
                            operation,
                            deadline_ms = self.config.call_timeout_ms,
                            "motion command missed its deadline; not re-issuing"
                        );
                        return Err(timeout);
                    }
                    timeout
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RoamerError::HardwareFailure {
                        component: self.id.clone(),
                        details: format!("{operation}: driver thread stopped"),
                    });
                }
            };

            warn!(
                robot = %self.id,
                operation,
                attempt,
                attempts,
                error = %err,
                "hardware call failed"
            );
            last_err = Some(err);
        }

        match last_err {
            Some(e @ RoamerError::HardwareTimeout { .. }) => Err(e),
            Some(e) => Err(RoamerError::HardwareFailure {
                component: self.id.clone(),
                details: format!("{operation} failed after {attempts} attempt(s): {e}"),
            }),
            None => Err(RoamerError::HardwareFailure {
                component: self.id.clone(),
                details: format!("{operation} was never attempted"),
            }),
        }
    }

    /// Queue one call on the driver thread and wait up to `deadline` for
    /// its answer.
    fn dispatch<T, F>(&self, f: F, deadline: Duration) -> Result<Result<T, RoamerError>, RecvTimeoutError>
    where
        T: Send + 'static,
        F: FnOnce(&mut A) -> Result<T, RoamerError> + Send + 'static,
    {
        let (reply, answer) = mpsc::channel();
        let job: Job<A> = Box::new(move |hw: &mut A| {
            // Nobody is listening any more if the caller gave up.
            let _ = reply.send(f(hw));
        });
        if self.jobs.send(job).is_err() {
            return Err(RecvTimeoutError::Disconnected);
        }
        answer.recv_timeout(deadline)
    }
}

impl<A: HardwareActuator + 'static> HardwareActuator for RetryingActuator<A> {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_scan(&mut self) -> Result<ScanFrame, RoamerError> {
        self.call("read_scan", CallKind::Read, |hw: &mut A| hw.read_scan())
    }

    fn read_pose(&mut self) -> Result<Pose, RoamerError> {
        self.call("read_pose", CallKind::Read, |hw: &mut A| hw.read_pose())
    }

    fn turn(&mut self, degrees: i32, speed: u32) -> Result<(), RoamerError> {
        self.call("turn", CallKind::Motion, move |hw: &mut A| hw.turn(degrees, speed))
    }

    fn move_straight(&mut self, distance: i32, speed: u32) -> Result<(), RoamerError> {
        self.call("move_straight", CallKind::Motion, move |hw: &mut A| {
            hw.move_straight(distance, speed)
        })
    }

    fn wait_for_motion(&mut self) -> Result<(), RoamerError> {
        self.call("wait_for_motion", CallKind::Motion, |hw: &mut A| hw.wait_for_motion())
    }

    fn capture(&mut self) -> Result<Option<CameraFrame>, RoamerError> {
        self.call("capture", CallKind::Read, |hw: &mut A| hw.capture())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Fails the first `failures` calls of every kind, optionally sleeping
    /// on each call.
    struct Flaky {
        failures: u32,
        calls: u32,
        delay: Duration,
        bad_scan: bool,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: 0,
                delay: Duration::ZERO,
                bad_scan: false,
            }
        }

        fn tick(&mut self) -> Result<(), RoamerError> {
            self.calls += 1;
            thread::sleep(self.delay);
            if self.calls <= self.failures {
                return Err(RoamerError::HardwareFailure {
                    component: "flaky".to_string(),
                    details: "bus error".to_string(),
                });
            }
            Ok(())
        }
    }

    impl HardwareActuator for Flaky {
        fn id(&self) -> &str {
            "flaky"
        }
        fn read_scan(&mut self) -> Result<ScanFrame, RoamerError> {
            self.tick()?;
            if self.bad_scan {
                return ScanFrame::new(vec![0; 12]);
            }
            Ok(ScanFrame::uniform(500))
        }
        fn read_pose(&mut self) -> Result<Pose, RoamerError> {
            self.tick()?;
            Ok(Pose::default())
        }
        fn turn(&mut self, _degrees: i32, _speed: u32) -> Result<(), RoamerError> {
            self.tick()
        }
        fn move_straight(&mut self, _distance: i32, _speed: u32) -> Result<(), RoamerError> {
            self.tick()
        }
        fn wait_for_motion(&mut self) -> Result<(), RoamerError> {
            self.tick()
        }
    }

    fn slow(delay_ms: u64) -> Flaky {
        let mut flaky = Flaky::new(0);
        flaky.delay = Duration::from_millis(delay_ms);
        flaky
    }

    #[test]
    fn transient_failures_are_retried() {
        let mut hw = RetryingActuator::new(Flaky::new(2), RetryConfig::default()).unwrap();
        assert!(hw.read_scan().is_ok());
        assert_eq!(hw.inner().calls, 3);
        assert_eq!(hw.id(), "flaky");
    }

    #[test]
    fn exhausted_retries_surface_hardware_failure() {
        let mut hw = RetryingActuator::new(Flaky::new(10), RetryConfig::default()).unwrap();
        let err = hw.read_pose().unwrap_err();
        assert!(matches!(
            err,
            RoamerError::HardwareFailure { ref component, ref details }
                if component == "flaky" && details.contains("read_pose")
        ));
        assert_eq!(hw.inner().calls, 3);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let config = RetryConfig {
            max_attempts: 0,
            call_timeout_ms: 2000,
        };
        let mut hw = RetryingActuator::new(Flaky::new(0), config).unwrap();
        assert!(hw.turn(5, 100).is_ok());
        assert_eq!(hw.inner().calls, 1);
    }

    #[test]
    fn hung_read_returns_at_the_deadline() {
        let config = RetryConfig {
            max_attempts: 2,
            call_timeout_ms: 20,
        };
        let mut hw = RetryingActuator::new(slow(1000), config).unwrap();

        let started = Instant::now();
        let err = hw.read_scan().unwrap_err();
        let waited = started.elapsed();

        assert!(waited < Duration::from_millis(500), "blocked for {waited:?}");
        assert!(matches!(err, RoamerError::HardwareTimeout { ref operation, .. } if operation == "read_scan"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn hung_motion_is_not_reissued() {
        let config = RetryConfig {
            max_attempts: 3,
            call_timeout_ms: 10,
        };
        let mut hw = RetryingActuator::new(slow(100), config).unwrap();

        let err = hw.move_straight(10, 100).unwrap_err();
        assert!(matches!(err, RoamerError::HardwareTimeout { ref operation, .. } if operation == "move_straight"));

        // Let the abandoned command finish; it must have been sent once.
        thread::sleep(Duration::from_millis(300));
        assert_eq!(hw.inner().calls, 1);
    }

    #[test]
    fn malformed_scan_is_not_retried() {
        let mut flaky = Flaky::new(0);
        flaky.bad_scan = true;
        let mut hw = RetryingActuator::new(flaky, RetryConfig::default()).unwrap();
        assert!(matches!(hw.read_scan(), Err(RoamerError::InvalidScanData(_))));
        assert_eq!(hw.inner().calls, 1);
    }
}

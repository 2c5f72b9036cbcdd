//! [`MotionGate`] – single interception point between the navigator and the
//! HAL.
//!
//! Every [`RobotAction`] must pass through [`MotionGate::authorize`] before a
//! turn or straight command is issued.  Two independent checks run in order:
//!
//! 1. **Action rules** ([`MotionRule`]): static invariants on the action
//!    itself (e.g. [`MaxDistanceRule`]).  The first violation returns
//!    [`RoamerError::InvalidAction`] and nothing reaches the hardware.
//! 2. **Clearance** ([`SafetyValidator`]): the cone check over the current
//!    sweep for the *full* commanded distance.  An unsafe verdict is a
//!    normal outcome, returned as a value.
//!
//! # Example
//!
//! ```
//! use roamer_kernel::{GateConfig, MotionGate, SafetyValidator};
//! use roamer_types::{Direction, RobotAction, ScanFrame};
//!
//! let gate = MotionGate::from_config(&GateConfig::default(), SafetyValidator::default());
//! let scan = ScanFrame::uniform(6000);
//!
//! let ok = gate.authorize(&RobotAction::new(Direction::North, 500), &scan, 0).unwrap();
//! assert!(ok.is_safe);
//!
//! // Longer than the configured cap → rejected before any clearance check.
//! assert!(gate.authorize(&RobotAction::new(Direction::North, 9000), &scan, 0).is_err());
//! ```

use roamer_types::{RoamerError, RobotAction, ScanFrame};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::safety::{SafetyValidator, SafetyVerdict};

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A static invariant every commanded action must satisfy.
pub trait MotionRule: Send + Sync {
    /// Human-readable name used in rejection messages.
    fn name(&self) -> &str;

    /// Return `Ok(())` when `action` satisfies the invariant, or
    /// [`RoamerError::InvalidAction`] when it does not.
    fn check(&self, action: &RobotAction) -> Result<(), RoamerError>;
}

/// Rejects negative distances and distances above `max_distance`.
pub struct MaxDistanceRule {
    pub max_distance: i32,
}

impl MotionRule for MaxDistanceRule {
    fn name(&self) -> &str {
        "max_distance"
    }

    fn check(&self, action: &RobotAction) -> Result<(), RoamerError> {
        if action.distance < 0 || action.distance > self.max_distance {
            return Err(RoamerError::InvalidAction(format!(
                "{action}: distance must be within [0, {}]",
                self.max_distance
            )));
        }
        Ok(())
    }
}

/// Tuning for the rules [`MotionGate::from_config`] installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub max_action_distance: i32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_action_distance: 3000,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MotionGate
// ────────────────────────────────────────────────────────────────────────────

pub struct MotionGate {
    rules: Vec<Box<dyn MotionRule>>,
    validator: SafetyValidator,
}

impl MotionGate {
    /// A gate with no action rules, only the clearance check.
    pub fn new(validator: SafetyValidator) -> Self {
        Self {
            rules: Vec::new(),
            validator,
        }
    }

    /// A gate with the built-in [`MaxDistanceRule`].
    pub fn from_config(config: &GateConfig, validator: SafetyValidator) -> Self {
        let mut gate = Self::new(validator);
        gate.add_rule(Box::new(MaxDistanceRule {
            max_distance: config.max_action_distance,
        }));
        gate
    }

    /// Register a rule.  Rules run in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn MotionRule>) {
        self.rules.push(rule);
    }

    pub fn validator(&self) -> &SafetyValidator {
        &self.validator
    }

    /// Vet `action` against every rule, then check clearance for the full
    /// distance while the robot faces `heading`.
    ///
    /// # Errors
    ///
    /// [`RoamerError::InvalidAction`] from the first rule that rejects the
    /// action.
    pub fn authorize(&self, action: &RobotAction, scan: &ScanFrame, heading: i32) -> Result<SafetyVerdict, RoamerError> {
        for rule in &self.rules {
            if let Err(e) = rule.check(action) {
                warn!(rule = rule.name(), %action, error = %e, "action rejected by motion rule");
                return Err(e);
            }
        }
        Ok(self
            .validator
            .check(scan, heading, action.direction, action.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roamer_types::Direction;

    struct NoSouthRule;

    impl MotionRule for NoSouthRule {
        fn name(&self) -> &str {
            "no_south"
        }

        fn check(&self, action: &RobotAction) -> Result<(), RoamerError> {
            if action.direction == Direction::South {
                return Err(RoamerError::InvalidAction("south is fenced off".into()));
            }
            Ok(())
        }
    }

    fn gate() -> MotionGate {
        MotionGate::from_config(&GateConfig::default(), SafetyValidator::default())
    }

    #[test]
    fn within_cap_and_clear_is_safe() {
        let verdict = gate()
            .authorize(&RobotAction::new(Direction::East, 3000), &ScanFrame::uniform(6000), 0)
            .unwrap();
        assert!(verdict.is_safe);
    }

    #[test]
    fn over_cap_is_rejected() {
        let err = gate()
            .authorize(&RobotAction::new(Direction::East, 3001), &ScanFrame::uniform(6000), 0)
            .unwrap_err();
        assert!(matches!(err, RoamerError::InvalidAction(ref m) if m.contains("3000")));
    }

    #[test]
    fn negative_distance_is_rejected() {
        let action = RobotAction {
            direction: Direction::North,
            distance: -5,
        };
        assert!(gate().authorize(&action, &ScanFrame::uniform(6000), 0).is_err());
    }

    #[test]
    fn clearance_uses_full_distance() {
        let scan = ScanFrame::uniform(1000);
        let g = gate();
        assert!(g.authorize(&RobotAction::new(Direction::North, 800), &scan, 0).unwrap().is_safe);
        assert!(!g.authorize(&RobotAction::new(Direction::North, 950), &scan, 0).unwrap().is_safe);
    }

    #[test]
    fn custom_rules_run_in_order() {
        let mut g = gate();
        g.add_rule(Box::new(NoSouthRule));
        let scan = ScanFrame::uniform(6000);
        assert!(g.authorize(&RobotAction::new(Direction::South, 10), &scan, 0).is_err());
        assert!(g.authorize(&RobotAction::new(Direction::North, 10), &scan, 0).is_ok());
    }
}

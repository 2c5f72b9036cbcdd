//! [`MissionTracker`] – search-mission progress and termination.
//!
//! The tracker is the only writer of [`MissionState`].  A target counts as
//! reached once it has been detected (by lidar matching or visually) and the
//! robot is within `reach_radius` of its registry position.  Reaching is
//! monotone: a reached target is never un-reached.

use std::collections::BTreeSet;

use roamer_perception::DetectionSet;
use roamer_types::{MissionState, Pose, WorldObject};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Mission-level tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Maximum number of mission ticks.
    pub step_budget: u32,
    /// A detected target closer than this (mm, inclusive) is reached.
    pub reach_radius: i32,
    /// Consecutive empty plans tolerated before the mission is interrupted.
    pub max_empty_plans: u32,
    /// Identical failed actions in a row that count as a stall.
    pub loop_guard_threshold: usize,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            step_budget: 20,
            reach_radius: 100,
            max_empty_plans: 3,
            loop_guard_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Running,
    Completed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct MissionTracker {
    targets: Vec<WorldObject>,
    reach_radius: i32,
    state: MissionState,
}

impl MissionTracker {
    /// Track every [`Target`][roamer_types::ObjectKind::Target] in `objects`.
    pub fn new(objects: &[WorldObject], config: &MissionConfig) -> Self {
        let targets: Vec<WorldObject> = objects.iter().filter(|o| o.is_target()).cloned().collect();
        let state = MissionState::new(targets.len(), config.step_budget);
        Self {
            targets,
            reach_radius: config.reach_radius,
            state,
        }
    }

    /// Mark newly reached targets and return their ids, ascending.
    ///
    /// Calling again with the same inputs changes nothing.
    pub fn update(
        &mut self,
        pose: Pose,
        detections: &DetectionSet,
        identified: &BTreeSet<u32>,
    ) -> Vec<u32> {
        for id in identified {
            if self.targets.iter().any(|t| t.id == *id) {
                self.state.identified_target_ids.insert(*id);
            }
        }

        let mut newly = Vec::new();
        for target in &self.targets {
            if self.state.reached_target_ids.contains(&target.id) {
                continue;
            }
            let seen = detections.contains(target.id) || identified.contains(&target.id);
            if !seen {
                continue;
            }
            let distance = pose.distance_to(target.x, target.y);
            if distance <= self.reach_radius {
                self.state.reached_target_ids.insert(target.id);
                info!(target = target.id, name = %target.name, distance, "target reached");
                newly.push(target.id);
            }
        }

        self.state.targets_remaining = self.targets.len() - self.state.reached_target_ids.len();
        newly
    }

    pub fn advance_step(&mut self) {
        self.state.step = self.state.step.saturating_add(1);
    }

    pub fn status(&self) -> MissionStatus {
        if self.state.is_complete() {
            MissionStatus::Completed
        } else if self.state.is_out_of_steps() {
            MissionStatus::TimedOut
        } else {
            MissionStatus::Running
        }
    }

    pub fn state(&self) -> &MissionState {
        &self.state
    }

    /// Targets not yet reached, in registry order.
    pub fn remaining_targets(&self) -> impl Iterator<Item = &WorldObject> {
        self.targets
            .iter()
            .filter(|t| !self.state.reached_target_ids.contains(&t.id))
    }
}

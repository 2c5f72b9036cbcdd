//! Mission telemetry sinks.
//!
//! A [`MissionSink`] is handed to the mission loop at construction.  The loop
//! drives its lifecycle explicitly: [`open`][MissionSink::open] once at
//! mission start, [`record_tick`][MissionSink::record_tick] and
//! [`record_action`][MissionSink::record_action] while running, and
//! [`close`][MissionSink::close] exactly once on every exit path.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use roamer_types::{ActionRecord, Detection, MissionState, ObstacleRegion, Pose};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::mission_loop::MissionOutcome;

/// Snapshot published once per mission tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub step: u32,
    pub pose: Pose,
    /// Contents of the running detection set, ascending by id.
    pub detections: Vec<Detection>,
    pub regions: Vec<ObstacleRegion>,
    pub state: MissionState,
    pub timestamp: DateTime<Utc>,
}

pub trait MissionSink: Send {
    fn open(&mut self, mission_id: Uuid, robot_id: &str);
    fn record_tick(&mut self, tick: &TickRecord);
    fn record_action(&mut self, record: &ActionRecord);
    fn close(&mut self, outcome: &MissionOutcome);
}

/// Writes every event as a structured `tracing` line.
#[derive(Debug, Default)]
pub struct TracingSink {
    mission_id: Option<Uuid>,
}

impl MissionSink for TracingSink {
    fn open(&mut self, mission_id: Uuid, robot_id: &str) {
        self.mission_id = Some(mission_id);
        info!(%mission_id, robot = robot_id, "mission opened");
    }

    fn record_tick(&mut self, tick: &TickRecord) {
        info!(
            step = tick.step,
            pose = %tick.pose,
            detections = tick.detections.len(),
            regions = tick.regions.len(),
            remaining = tick.state.targets_remaining,
            "tick"
        );
    }

    fn record_action(&mut self, record: &ActionRecord) {
        info!(
            step = record.step,
            action = %record.action,
            before = %record.pos_before,
            after = %record.pos_after,
            executed = record.executed,
            safe = record.safe,
            reason = record.reason.as_deref().unwrap_or(""),
            "action"
        );
    }

    fn close(&mut self, outcome: &MissionOutcome) {
        let mission_id = self.mission_id.take().unwrap_or_else(Uuid::nil);
        info!(%mission_id, ?outcome, "mission closed");
    }
}

/// Everything a [`MemorySink`] has collected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionLog {
    pub mission_id: Option<Uuid>,
    pub robot_id: String,
    pub ticks: Vec<TickRecord>,
    pub actions: Vec<ActionRecord>,
    pub outcome: Option<MissionOutcome>,
    pub opened: u32,
    pub closed: u32,
}

/// Collects events in memory.  Clones share the same log, so a test can keep
/// one handle while the mission loop owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<MissionLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MissionLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> MissionLog {
        self.lock().clone()
    }
}

impl MissionSink for MemorySink {
    fn open(&mut self, mission_id: Uuid, robot_id: &str) {
        let mut log = self.lock();
        log.mission_id = Some(mission_id);
        log.robot_id = robot_id.to_string();
        log.opened += 1;
    }

    fn record_tick(&mut self, tick: &TickRecord) {
        self.lock().ticks.push(tick.clone());
    }

    fn record_action(&mut self, record: &ActionRecord) {
        self.lock().actions.push(record.clone());
    }

    fn close(&mut self, outcome: &MissionOutcome) {
        let mut log = self.lock();
        log.outcome = Some(outcome.clone());
        log.closed += 1;
    }
}

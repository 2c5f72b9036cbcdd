//! Object Matcher and the running [`DetectionSet`].
//!
//! For each known object the matcher computes the true range and bearing
//! from the robot, looks up the reading at the corresponding scan index and,
//! if the two agree within `distance_threshold`, scores the agreement over a
//! window of `2 * scan_window + 1` neighbouring indices:
//!
//! ```text
//! match_ratio       = matching readings / window size
//! consecutive_ratio = longest run of matching readings / window size
//! confidence        = round((match_ratio + consecutive_ratio) / 2, 2)
//! ```
//!
//! A reading *matches* when `|reading - true_range| <= distance_threshold`.

use std::collections::BTreeMap;

use roamer_types::{Detection, Pose, ScanConvention, ScanFrame, WorldObject, geometry};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Tuning for [`ObjectMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Largest accepted difference (mm) between true range and reading.
    pub distance_threshold: u32,
    /// Half-width of the scoring window, in scan indices.
    pub scan_window: u32,
    /// Skip objects outside `±fov_half_angle` of the robot heading.
    pub fov_filter: bool,
    pub fov_half_angle: i32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 200,
            scan_window: 5,
            fov_filter: false,
            fov_half_angle: 90,
        }
    }
}

/// Correlates the object registry against a lidar sweep.
#[derive(Debug, Clone, Default)]
pub struct ObjectMatcher {
    config: MatcherConfig,
    convention: ScanConvention,
}

impl ObjectMatcher {
    pub fn new(config: MatcherConfig, convention: ScanConvention) -> Self {
        Self { config, convention }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Score every object in `objects` against `scan` as seen from `pose`.
    ///
    /// `objects` must not contain the observing robot.  The result is sorted
    /// by descending confidence; ties keep input order.
    pub fn match_objects(&self, pose: &Pose, objects: &[WorldObject], scan: &ScanFrame) -> Vec<Detection> {
        let threshold = i64::from(self.config.distance_threshold);
        let mut detections = Vec::new();

        for obj in objects {
            let bearing = geometry::bearing(pose.x, pose.y, obj.x, obj.y);
            if self.config.fov_filter
                && geometry::shortest_turn(pose.heading(), bearing).abs() > self.config.fov_half_angle
            {
                trace!(object = obj.id, bearing, "outside field of view");
                continue;
            }

            let distance = pose.distance_to(obj.x, obj.y);
            let index = self.convention.index_for_bearing(bearing, pose.heading()) as i32;
            let lidar_distance = scan.at(index);
            let matches = |reading: u32| (i64::from(reading) - i64::from(distance)).abs() <= threshold;

            if !matches(lidar_distance) {
                continue;
            }

            let window = self.config.scan_window as i32;
            let size = f64::from(2 * window + 1);
            let mut hits = 0u32;
            let mut run = 0u32;
            let mut longest = 0u32;
            for offset in -window..=window {
                if matches(scan.at(index + offset)) {
                    hits += 1;
                    run += 1;
                    longest = longest.max(run);
                } else {
                    run = 0;
                }
            }

            let raw = (f64::from(hits) / size + f64::from(longest) / size) / 2.0;
            let confidence = ((raw * 100.0).round() / 100.0) as f32;

            debug!(object = obj.id, name = %obj.name, distance, bearing, lidar_distance, confidence, "object matched");
            detections.push(Detection {
                object_id: obj.id,
                name: obj.name.clone(),
                kind: obj.kind,
                distance,
                bearing,
                lidar_distance,
                confidence,
                x: obj.x,
                y: obj.y,
            });
        }

        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detections
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DetectionSet
// ────────────────────────────────────────────────────────────────────────────

/// Most recent [`Detection`] per object id, accumulated across ticks.
///
/// Never holds two entries for the same id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
    by_id: BTreeMap<u32, Detection>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge fresh detections.
    ///
    /// Unknown ids are inserted.  A known id is replaced only when the
    /// detection's `x`/`y` differ from the stored entry; otherwise the
    /// update is a no-op.  Returns the number of entries inserted or
    /// replaced.
    pub fn update(&mut self, detections: &[Detection]) -> usize {
        let mut changed = 0;
        for det in detections {
            match self.by_id.get(&det.object_id) {
                Some(existing) if existing.x == det.x && existing.y == det.y => {}
                _ => {
                    self.by_id.insert(det.object_id, det.clone());
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn get(&self, object_id: u32) -> Option<&Detection> {
        self.by_id.get(&object_id)
    }

    pub fn contains(&self, object_id: u32) -> bool {
        self.by_id.contains_key(&object_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Detections in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.by_id.values()
    }
}

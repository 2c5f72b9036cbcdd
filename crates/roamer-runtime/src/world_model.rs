//! [`WorldModel`] – the robot's per-tick view of its surroundings.
//!
//! One [`refresh`][WorldModel::refresh] reads pose and scan from the
//! hardware, re-runs the object matcher and obstacle detector, merges the
//! matches into the running [`DetectionSet`], and (when a visual detector is
//! attached) records visually identified targets.  The navigator calls it
//! after every micro-step so detections accumulate during motion.

use std::collections::BTreeSet;
use std::sync::Arc;

use roamer_hal::HardwareActuator;
use roamer_perception::{DetectionSet, ObjectMatcher, ObstacleDetector, VisualTargetDetector};
use roamer_types::{Detection, ObstacleRegion, Pose, RoamerError, ScanFrame, WorldObject};
use tracing::debug;

pub struct WorldModel {
    /// Read-only registry shared with every robot in the world, minus this
    /// robot's own entry.
    objects: Vec<WorldObject>,
    matcher: ObjectMatcher,
    obstacles: ObstacleDetector,
    visual: Option<Box<dyn VisualTargetDetector>>,
    detections: DetectionSet,
    identified: BTreeSet<u32>,
    latest_matches: Vec<Detection>,
    regions: Vec<ObstacleRegion>,
    pose: Pose,
    scan: Option<ScanFrame>,
}

impl WorldModel {
    /// `self_id` is the registry id of the observing robot, if it has one.
    pub fn new(
        registry: Arc<Vec<WorldObject>>,
        self_id: Option<u32>,
        matcher: ObjectMatcher,
        obstacles: ObstacleDetector,
    ) -> Self {
        let objects = registry
            .iter()
            .filter(|o| Some(o.id) != self_id)
            .cloned()
            .collect();
        Self {
            objects,
            matcher,
            obstacles,
            visual: None,
            detections: DetectionSet::new(),
            identified: BTreeSet::new(),
            latest_matches: Vec::new(),
            regions: Vec::new(),
            pose: Pose::default(),
            scan: None,
        }
    }

    pub fn with_visual_detector(mut self, detector: Box<dyn VisualTargetDetector>) -> Self {
        self.visual = Some(detector);
        self
    }

    /// Read pose and scan, then recompute every derived view.
    ///
    /// # Errors
    ///
    /// Propagates hardware and malformed-scan errors.  On error the previous
    /// pose and scan are kept.
    pub fn refresh(&mut self, hw: &mut dyn HardwareActuator) -> Result<(), RoamerError> {
        let pose = hw.read_pose()?;
        let scan = hw.read_scan()?;

        let matches = self.matcher.match_objects(&pose, &self.objects, &scan);
        let changed = self.detections.update(&matches);
        self.regions = self.obstacles.detect(&scan);

        if let Some(visual) = &self.visual {
            if let Some(frame) = hw.capture()? {
                let targets: Vec<WorldObject> =
                    self.objects.iter().filter(|o| o.is_target()).cloned().collect();
                if let Some(id) = visual.detect_visual_target(&frame, &pose, &targets) {
                    if self.identified.insert(id) {
                        debug!(target = id, "target identified visually");
                    }
                }
            }
        }

        debug!(
            pose = %pose,
            matches = matches.len(),
            new_or_moved = changed,
            regions = self.regions.len(),
            "world model refreshed"
        );
        self.pose = pose;
        self.scan = Some(scan);
        self.latest_matches = matches;
        Ok(())
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Latest sweep, if any refresh has succeeded yet.
    pub fn scan(&self) -> Option<&ScanFrame> {
        self.scan.as_ref()
    }

    pub fn regions(&self) -> &[ObstacleRegion] {
        &self.regions
    }

    pub fn detections(&self) -> &DetectionSet {
        &self.detections
    }

    /// Matches from the most recent refresh only, best first.
    pub fn latest_matches(&self) -> &[Detection] {
        &self.latest_matches
    }

    pub fn identified(&self) -> &BTreeSet<u32> {
        &self.identified
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn targets(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.iter().filter(|o| o.is_target())
    }
}

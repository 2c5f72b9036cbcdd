//! Obstacle Region Detector.
//!
//! A sweep is treated as a circle of [`SCAN_SIZE`] samples.  Every reading
//! strictly below `distance_threshold` is *near*; maximal runs of near
//! samples become [`ObstacleRegion`]s.  A run touching both index 359 and
//! index 0 is a single region whose `end_angle` is smaller than its
//! `start_angle`.
//!
//! ```text
//!  index:  355 356 357 358 359 | 0 1 2 3 4 5
//!  near:    ·   ✓   ✓   ✓   ✓  | ✓ ✓ · · ✓ ✓
//!           └──── one region: 356 → 1 ───┘   └ 4 → 5
//! ```

use roamer_types::{ObstacleRegion, SCAN_SIZE, ScanFrame};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tuning for [`ObstacleDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Readings strictly below this (mm) count as near.
    pub distance_threshold: u32,
    /// Runs narrower than this many degrees are discarded as noise.
    pub min_width: i32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 300,
            min_width: 3,
        }
    }
}

/// Stateless region extractor; holds only its configuration.
#[derive(Debug, Clone, Default)]
pub struct ObstacleDetector {
    config: ObstacleConfig,
}

impl ObstacleDetector {
    pub fn new(config: ObstacleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ObstacleConfig {
        &self.config
    }

    /// Extract obstacle regions from `scan`, ordered by ascending
    /// `start_angle`.
    pub fn detect(&self, scan: &ScanFrame) -> Vec<ObstacleRegion> {
        let readings = scan.readings();
        let n = readings.len();
        let near: Vec<bool> = readings
            .iter()
            .map(|&r| r < self.config.distance_threshold)
            .collect();

        let mut regions = Vec::new();

        // Start walking just after a far sample so no run is split by the
        // 359 → 0 seam.  With no far sample the whole circle is one region.
        let Some(far) = near.iter().position(|&is_near| !is_near) else {
            if n > 0 {
                self.push_region(&mut regions, readings, 0, n);
            }
            return regions;
        };

        let mut run_start: Option<usize> = None;
        for step in 1..=n {
            let idx = (far + step) % n;
            match (near[idx], run_start) {
                (true, None) => run_start = Some(idx),
                (false, Some(start)) => {
                    let len = (idx + n - start) % n;
                    self.push_region(&mut regions, readings, start, len);
                    run_start = None;
                }
                _ => {}
            }
        }

        regions.sort_by_key(|r| r.start_angle);
        debug!(
            regions = regions.len(),
            threshold = self.config.distance_threshold,
            "obstacle regions detected"
        );
        regions
    }

    fn push_region(&self, out: &mut Vec<ObstacleRegion>, readings: &[u32], start: usize, len: usize) {
        let width = len as i32;
        if width < self.config.min_width {
            return;
        }
        let n = readings.len();
        let min_distance = (0..len)
            .map(|offset| readings[(start + offset) % n])
            .min()
            .unwrap_or(0);
        out.push(ObstacleRegion {
            start_angle: start as i32,
            end_angle: ((start + len - 1) % n) as i32,
            min_distance,
            angular_width: width,
        });
    }
}

/// Convenience wrapper: detect regions with an explicit threshold and
/// minimum width.
pub fn detect_obstacles(scan: &ScanFrame, distance_threshold: u32, min_width: i32) -> Vec<ObstacleRegion> {
    ObstacleDetector::new(ObstacleConfig {
        distance_threshold,
        min_width,
    })
    .detect(scan)
}

/// `true` when `index` falls inside `region`, honouring wrap-around.
pub fn region_contains(region: &ObstacleRegion, index: i32) -> bool {
    let idx = index.rem_euclid(SCAN_SIZE as i32);
    if region.start_angle <= region.end_angle {
        (region.start_angle..=region.end_angle).contains(&idx)
    } else {
        idx >= region.start_angle || idx <= region.end_angle
    }
}

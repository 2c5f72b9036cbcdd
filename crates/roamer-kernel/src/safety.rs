//! [`SafetyValidator`] – clearance check over an angular cone.
//!
//! The cone is centred on the world bearing of the commanded
//! [`Direction`] (looked up in a [`DirectionTable`]) and spans
//! `±angle_threshold` degrees, wrapping across 0°.  Each bearing in the cone
//! is mapped to a scan index through the configured [`ScanConvention`].
//!
//! **Decision rule:** the move is unsafe when
//! `min_distance <= distance + safety_margin`, i.e. the whole intended
//! travel plus the margin must be clear.
//!
//! The check is a pure function of its inputs and may be called every tick.

use std::fmt;

use roamer_types::{Direction, DirectionTable, ScanConvention, ScanFrame, geometry};
use serde::{Deserialize, Serialize};

/// Tuning for [`SafetyValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Half-width of the inspected cone, in degrees.
    pub angle_threshold: i32,
    /// Extra clearance (mm) required beyond the commanded distance.
    pub safety_margin: i32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            angle_threshold: 15,
            safety_margin: 100,
        }
    }
}

/// Result of a clearance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    /// Names the closest bearing in the cone and what was measured there.
    pub reason: String,
    /// Smallest reading in the cone (mm).
    pub min_distance: u32,
    /// World bearing of that smallest reading.
    pub offending_bearing: i32,
    /// `distance + safety_margin` that the cone had to exceed.
    pub required: i64,
}

impl fmt::Display for SafetyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SafetyValidator {
    config: SafetyConfig,
    table: DirectionTable,
    convention: ScanConvention,
}

impl SafetyValidator {
    pub fn new(config: SafetyConfig, table: DirectionTable, convention: ScanConvention) -> Self {
        Self {
            config,
            table,
            convention,
        }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn table(&self) -> &DirectionTable {
        &self.table
    }

    /// Check a move of `distance` mm toward `direction` while the robot
    /// faces `heading`.
    pub fn check(&self, scan: &ScanFrame, heading: i32, direction: Direction, distance: i32) -> SafetyVerdict {
        self.check_bearing(scan, heading, self.table.bearing(direction), distance)
    }

    /// Check a move of `distance` mm along world `bearing`.
    pub fn check_bearing(&self, scan: &ScanFrame, heading: i32, bearing: i32, distance: i32) -> SafetyVerdict {
        let half = self.config.angle_threshold.max(0);
        let mut min_distance = u32::MAX;
        let mut offending_bearing = geometry::normalize_angle(bearing);

        for offset in -half..=half {
            let b = geometry::normalize_angle(bearing + offset);
            let reading = scan.at(self.convention.index_for_bearing(b, heading) as i32);
            if reading < min_distance {
                min_distance = reading;
                offending_bearing = b;
            }
        }

        let required = i64::from(distance) + i64::from(self.config.safety_margin);
        let is_safe = i64::from(min_distance) > required;
        let reason = if is_safe {
            format!(
                "clear: nearest reading {min_distance} mm at bearing {offending_bearing}° exceeds required {required} mm"
            )
        } else {
            format!(
                "blocked: reading {min_distance} mm at bearing {offending_bearing}° is within required {required} mm (move {distance} + margin {})",
                self.config.safety_margin
            )
        };

        SafetyVerdict {
            is_safe,
            reason,
            min_distance,
            offending_bearing,
            required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(angle_threshold: i32, safety_margin: i32) -> SafetyValidator {
        SafetyValidator::new(
            SafetyConfig {
                angle_threshold,
                safety_margin,
            },
            DirectionTable::default(),
            ScanConvention::default(),
        )
    }

    #[test]
    fn uniform_scan_boundary() {
        let v = validator(15, 100);
        let scan = ScanFrame::uniform(1000);
        assert!(v.check(&scan, 0, Direction::North, 1000 - 100 - 1).is_safe);
        assert!(!v.check(&scan, 0, Direction::North, 1000 - 100 + 1).is_safe);
        // Equality is unsafe.
        assert!(!v.check(&scan, 0, Direction::North, 900).is_safe);
    }

    #[test]
    fn unsafe_reason_names_bearing_and_distance() {
        let v = validator(15, 100);
        // Robot faces 0°; world bearing 90° (E) sits at scan index 270.
        let scan = ScanFrame::uniform(6000).with_sector(275, 275, 150);
        let verdict = v.check(&scan, 0, Direction::East, 200);
        assert!(!verdict.is_safe);
        assert_eq!(verdict.min_distance, 150);
        assert_eq!(verdict.offending_bearing, 95);
        assert!(verdict.reason.contains("150 mm"));
        assert!(verdict.reason.contains("95°"));
    }

    #[test]
    fn obstacle_outside_cone_is_ignored() {
        let v = validator(15, 100);
        let scan = ScanFrame::uniform(6000).with_sector(290, 300, 50);
        // E cone covers indices 255..=285.
        assert!(v.check(&scan, 0, Direction::East, 500).is_safe);
    }

    #[test]
    fn cone_wraps_across_zero() {
        // WorldAbsolute makes index == bearing, so the N cone spans 345..=15.
        let v = SafetyValidator::new(
            SafetyConfig::default(),
            DirectionTable::default(),
            ScanConvention::WorldAbsolute,
        );
        let scan = ScanFrame::uniform(6000).with_sector(350, 350, 80);
        let verdict = v.check(&scan, 123, Direction::North, 10);
        assert!(!verdict.is_safe);
        assert_eq!(verdict.offending_bearing, 350);
    }

    #[test]
    fn ten_degree_gap_is_the_only_way_out() {
        // World 90° (E) sits at index 270 with heading 0; the gap is the ten
        // indices 265..=274 and a ±4° cone around 270 fits inside it.
        let scan = ScanFrame::uniform(50).with_sector(265, 274, 6000);
        assert_eq!(scan.readings().iter().filter(|&&r| r == 6000).count(), 10);

        let v = validator(4, 100);
        for dir in Direction::ALL {
            let verdict = v.check(&scan, 0, dir, 300);
            assert_eq!(verdict.is_safe, dir == Direction::East, "{dir}: {verdict}");
        }
        // An 11° cone no longer fits.
        assert!(!validator(5, 100).check(&scan, 0, Direction::East, 300).is_safe);
    }

    #[test]
    fn check_is_pure() {
        let v = validator(15, 100);
        let scan = ScanFrame::uniform(700);
        let a = v.check(&scan, 45, Direction::SouthWest, 300);
        let b = v.check(&scan, 45, Direction::SouthWest, 300);
        assert_eq!(a, b);
    }

    #[test]
    fn heading_rotates_the_cone() {
        let v = validator(15, 100);
        // Facing 90° (E), world N (0°) is 90° to the right → index 90.
        let scan = ScanFrame::uniform(6000).with_sector(88, 92, 100);
        assert!(!v.check(&scan, 90, Direction::North, 100).is_safe);
        assert!(v.check(&scan, 0, Direction::North, 100).is_safe);
    }
}

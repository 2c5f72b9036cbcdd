//! Lidar sweep container and the bearing ↔ scan-index calibration.

use serde::{Deserialize, Serialize};

use crate::RoamerError;
use crate::geometry::normalize_angle;

/// Number of readings in one full sweep (one per integer degree).
pub const SCAN_SIZE: usize = 360;

/// One immutable 360° lidar sweep.
///
/// Index `i` holds the range reading (mm) for scan index `i`.  How an index
/// relates to a world bearing is decided by a [`ScanConvention`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct ScanFrame {
    readings: Vec<u32>,
}

impl ScanFrame {
    /// Wrap a raw sweep.
    ///
    /// # Errors
    ///
    /// Returns [`RoamerError::InvalidScanData`] unless exactly
    /// [`SCAN_SIZE`] readings are supplied.
    pub fn new(readings: Vec<u32>) -> Result<Self, RoamerError> {
        if readings.len() != SCAN_SIZE {
            return Err(RoamerError::InvalidScanData(format!(
                "expected {SCAN_SIZE} readings, got {}",
                readings.len()
            )));
        }
        Ok(Self { readings })
    }

    /// A sweep where every reading equals `distance`.
    pub fn uniform(distance: u32) -> Self {
        Self {
            readings: vec![distance; SCAN_SIZE],
        }
    }

    /// Reading at `index`, wrapping circularly so any integer is accepted.
    pub fn at(&self, index: i32) -> u32 {
        self.readings[index.rem_euclid(SCAN_SIZE as i32) as usize]
    }

    /// Reading at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RoamerError::InvalidScanData`] if `index` is out of range.
    pub fn get(&self, index: usize) -> Result<u32, RoamerError> {
        self.readings.get(index).copied().ok_or_else(|| {
            RoamerError::InvalidScanData(format!("scan index {index} out of range"))
        })
    }

    /// Overwrite the readings in the circular range `from..=to` (wrapping
    /// past 359) with `distance`.  Handy for building synthetic sweeps.
    pub fn with_sector(mut self, from: i32, to: i32, distance: u32) -> Self {
        let span = (to - from).rem_euclid(SCAN_SIZE as i32);
        for offset in 0..=span {
            let idx = (from + offset).rem_euclid(SCAN_SIZE as i32) as usize;
            self.readings[idx] = distance;
        }
        self
    }

    pub fn readings(&self) -> &[u32] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl TryFrom<Vec<u32>> for ScanFrame {
    type Error = RoamerError;

    fn try_from(readings: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(readings)
    }
}

impl From<ScanFrame> for Vec<u32> {
    fn from(frame: ScanFrame) -> Self {
        frame.readings
    }
}

/// Calibration constant describing how scan indices map to bearings.
///
/// Different lidar bindings disagree here, so the mapping is configuration
/// rather than a literal.  Whatever is chosen must be used consistently by
/// the matcher, the safety validator and any simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanConvention {
    /// Index `front_index` points straight ahead of the robot and indices
    /// grow counter-clockwise with the robot-relative bearing.
    RobotRelative { front_index: u16 },
    /// Index equals the world bearing; the robot heading is ignored.
    WorldAbsolute,
}

impl Default for ScanConvention {
    fn default() -> Self {
        ScanConvention::RobotRelative { front_index: 180 }
    }
}

impl ScanConvention {
    /// Scan index observing world `bearing` when the robot faces `heading`.
    pub fn index_for_bearing(&self, bearing: i32, heading: i32) -> usize {
        let idx = match *self {
            ScanConvention::RobotRelative { front_index } => {
                normalize_angle(bearing - heading) + i32::from(front_index)
            }
            ScanConvention::WorldAbsolute => bearing,
        };
        normalize_angle(idx) as usize
    }

    /// World bearing observed by scan `index` when the robot faces `heading`.
    pub fn bearing_for_index(&self, index: usize, heading: i32) -> i32 {
        let idx = index as i32;
        match *self {
            ScanConvention::RobotRelative { front_index } => {
                normalize_angle(idx - i32::from(front_index) + heading)
            }
            ScanConvention::WorldAbsolute => normalize_angle(idx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_length_rejected() {
        assert!(matches!(
            ScanFrame::new(vec![0; 359]),
            Err(RoamerError::InvalidScanData(_))
        ));
        assert!(ScanFrame::new(vec![0; 360]).is_ok());
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let scan = ScanFrame::uniform(10);
        assert!(matches!(scan.get(360), Err(RoamerError::InvalidScanData(_))));
        assert_eq!(scan.get(359).unwrap(), 10);
        assert_eq!(scan.at(-1), 10);
    }

    #[test]
    fn sector_wraps_past_zero() {
        let scan = ScanFrame::uniform(6000).with_sector(355, 4, 50);
        assert_eq!(scan.at(355), 50);
        assert_eq!(scan.at(0), 50);
        assert_eq!(scan.at(4), 50);
        assert_eq!(scan.at(5), 6000);
        assert_eq!(scan.at(354), 6000);
    }

    #[test]
    fn deserialize_rejects_short_sweep() {
        let json = serde_json::to_string(&vec![1u32; 10]).unwrap();
        assert!(serde_json::from_str::<ScanFrame>(&json).is_err());
    }

    #[test]
    fn robot_relative_front_is_180() {
        let conv = ScanConvention::default();
        assert_eq!(conv.index_for_bearing(0, 0), 180);
        assert_eq!(conv.index_for_bearing(90, 90), 180);
        // Target on the robot's left.
        assert_eq!(conv.index_for_bearing(90, 0), 270);
        // Directly behind.
        assert_eq!(conv.index_for_bearing(180, 0), 0);
    }

    #[test]
    fn world_absolute_ignores_heading() {
        let conv = ScanConvention::WorldAbsolute;
        assert_eq!(conv.index_for_bearing(45, 270), 45);
        assert_eq!(conv.bearing_for_index(45, 270), 45);
    }

    #[test]
    fn index_and_bearing_are_inverse() {
        let conv = ScanConvention::default();
        for heading in (0..360).step_by(30) {
            for b in 0..360 {
                let idx = conv.index_for_bearing(b, heading);
                assert_eq!(conv.bearing_for_index(idx, heading), b);
            }
        }
    }
}

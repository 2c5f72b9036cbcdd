//! Camera-based target identification.
//!
//! Only used to mark targets as *identified*; safety decisions never depend
//! on it.

use roamer_hal::CameraFrame;
use roamer_types::{Pose, WorldObject, geometry};
use tracing::debug;

/// Pick which known target, if any, a camera frame is looking at.
pub trait VisualTargetDetector: Send + Sync {
    fn detect_visual_target(&self, frame: &CameraFrame, pose: &Pose, targets: &[WorldObject]) -> Option<u32>;
}

/// Red-blob detector for the can targets used in the arena.
///
/// 1. Count red pixels; fewer than `min_red_pixels` means nothing is seen.
/// 2. Map the centroid column of the red pixels to an angle relative to the
///    robot heading, spreading `camera_fov` degrees across the frame width.
///    The left edge of the image is `+camera_fov / 2` (counter-clockwise).
/// 3. Among targets closer than `search_radius` whose local bearing is
///    within `angle_tolerance` of that angle, return the nearest.
/// 4. Otherwise fall back to the nearest target overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedTargetDetector {
    pub min_red_pixels: usize,
    pub camera_fov: i32,
    pub angle_tolerance: i32,
    pub search_radius: i32,
}

impl Default for RedTargetDetector {
    fn default() -> Self {
        Self {
            min_red_pixels: 100,
            camera_fov: 180,
            angle_tolerance: 45,
            search_radius: 800,
        }
    }
}

fn is_red([r, g, b]: [u8; 3]) -> bool {
    r >= 128 && u16::from(r) > 2 * u16::from(g) && u16::from(r) > 2 * u16::from(b)
}

impl RedTargetDetector {
    /// Number of red pixels and the mean column they sit in.
    fn red_centroid(&self, frame: &CameraFrame) -> Option<(usize, f64)> {
        if !frame.is_well_formed() || frame.width == 0 {
            return None;
        }
        let mut count = 0usize;
        let mut column_sum = 0u64;
        for (i, px) in frame.data.chunks_exact(3).enumerate() {
            if is_red([px[0], px[1], px[2]]) {
                count += 1;
                column_sum += (i as u64) % u64::from(frame.width);
            }
        }
        (count > 0).then(|| (count, column_sum as f64 / count as f64))
    }
}

impl VisualTargetDetector for RedTargetDetector {
    fn detect_visual_target(&self, frame: &CameraFrame, pose: &Pose, targets: &[WorldObject]) -> Option<u32> {
        let (count, center_x) = self.red_centroid(frame)?;
        if count < self.min_red_pixels {
            return None;
        }

        let width = f64::from(frame.width);
        let relative = (width / 2.0 - center_x) * f64::from(self.camera_fov) / width;

        let candidates = targets.iter().filter(|t| t.is_target());
        let in_view = candidates
            .clone()
            .filter(|t| {
                let local = geometry::shortest_turn(
                    pose.heading(),
                    geometry::bearing(pose.x, pose.y, t.x, t.y),
                );
                (f64::from(local) - relative).abs() < f64::from(self.angle_tolerance)
                    && pose.distance_to(t.x, t.y) < self.search_radius
            })
            .min_by_key(|t| pose.distance_to(t.x, t.y));

        let chosen = in_view.or_else(|| candidates.min_by_key(|t| pose.distance_to(t.x, t.y)))?;
        debug!(target = chosen.id, red_pixels = count, relative_angle = relative, "visual target identified");
        Some(chosen.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roamer_types::ObjectKind;

    const RED: [u8; 3] = [220, 20, 20];

    fn targets() -> Vec<WorldObject> {
        vec![
            WorldObject::new(1, "Can1", ObjectKind::Target, 500, 300),
            WorldObject::new(2, "Can2", ObjectKind::Target, 500, -300),
            WorldObject::new(3, "Far", ObjectKind::Target, 3000, 0),
            WorldObject::new(9, "Crate", ObjectKind::Obstacle, 100, 0),
        ]
    }

    #[test]
    fn too_few_red_pixels_sees_nothing() {
        let mut frame = CameraFrame::filled(160, 120, [0, 0, 0]);
        frame.paint(0, 0, 5, 5, RED);
        let det = RedTargetDetector::default();
        assert_eq!(det.detect_visual_target(&frame, &Pose::default(), &targets()), None);
    }

    #[test]
    fn blob_on_left_picks_left_target() {
        // Red block in the left third: relative angle positive (CCW).
        let mut frame = CameraFrame::filled(160, 120, [0, 0, 0]);
        frame.paint(30, 40, 50, 80, RED);
        let det = RedTargetDetector::default();
        assert_eq!(det.detect_visual_target(&frame, &Pose::default(), &targets()), Some(1));
    }

    #[test]
    fn blob_on_right_picks_right_target() {
        let mut frame = CameraFrame::filled(160, 120, [0, 0, 0]);
        frame.paint(110, 40, 130, 80, RED);
        let det = RedTargetDetector::default();
        assert_eq!(det.detect_visual_target(&frame, &Pose::default(), &targets()), Some(2));
    }

    #[test]
    fn falls_back_to_nearest_target() {
        // Blob dead ahead, but nothing lies ahead within the search radius.
        let mut frame = CameraFrame::filled(160, 120, [0, 0, 0]);
        frame.paint(70, 40, 90, 80, RED);
        let det = RedTargetDetector::default();
        let pose = Pose::new(0, 0, 180);
        assert_eq!(det.detect_visual_target(&frame, &pose, &targets()), Some(1));
    }

    #[test]
    fn obstacles_are_never_identified() {
        let mut frame = CameraFrame::filled(160, 120, [0, 0, 0]);
        frame.paint(70, 40, 90, 80, RED);
        let det = RedTargetDetector::default();
        let only_crate = vec![WorldObject::new(9, "Crate", ObjectKind::Obstacle, 100, 0)];
        assert_eq!(det.detect_visual_target(&frame, &Pose::default(), &only_crate), None);
    }
}

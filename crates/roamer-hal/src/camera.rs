//! Raw camera frames exposed by a hardware binding.

/// An RGB24 image returned by [`HardwareActuator::capture`][crate::HardwareActuator::capture].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row-major RGB24 pixel data (`width * height * 3` bytes).
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// A frame filled with a single colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width * height) as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// `true` when `data` holds exactly one RGB triple per pixel.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == (self.width as usize) * (self.height as usize) * 3
    }

    /// RGB triple at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) as usize) * 3;
        let px = self.data.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Paint the rectangle `[x0, x1) × [y0, y1)` with `rgb`, clipped to the
    /// frame bounds.
    pub fn paint(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgb: [u8; 3]) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                let offset = ((y * self.width + x) as usize) * 3;
                if let Some(px) = self.data.get_mut(offset..offset + 3) {
                    px.copy_from_slice(&rgb);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_frame_is_well_formed() {
        let frame = CameraFrame::filled(4, 3, [1, 2, 3]);
        assert!(frame.is_well_formed());
        assert_eq!(frame.data.len(), 36);
        assert_eq!(frame.pixel(3, 2), Some([1, 2, 3]));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn paint_clips_to_bounds() {
        let mut frame = CameraFrame::filled(4, 4, [0, 0, 0]);
        frame.paint(2, 2, 10, 10, [255, 0, 0]);
        assert_eq!(frame.pixel(3, 3), Some([255, 0, 0]));
        assert_eq!(frame.pixel(1, 1), Some([0, 0, 0]));
    }
}

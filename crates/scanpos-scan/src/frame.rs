//! Greyscale video frame handed from a stream to a decoder.

use std::time::Instant;

/// One captured frame, 8-bit luma, row-major.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    captured_at: Instant,
    /// Monotonic per stream.
    sequence: u64,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Frame {
            pixels,
            width,
            height,
            captured_at: Instant::now(),
            sequence,
        }
    }

    /// Converts packed RGB8 to luma with the BT.601 weights.
    pub fn from_rgb(rgb: &[u8], width: u32, height: u32, sequence: u64) -> Self {
        let pixels = rgb
            .chunks_exact(3)
            .map(|px| ((px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000) as u8)
            .collect();
        Frame::new(pixels, width, height, sequence)
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns true if the buffer is non-empty and matches the dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixel_count() > 0 && self.pixels.len() == self.pixel_count()
    }

    /// Luma at `(x, y)`, or 0 outside the buffer.
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        self.pixels
            .get(y * self.width as usize + x)
            .copied()
            .unwrap_or(0)
    }

    /// Half-resolution copy made by averaging 2×2 blocks.
    ///
    /// Returns `None` when the frame is too small to halve.
    pub fn downscale_half(&self) -> Option<Frame> {
        let (w, h) = ((self.width / 2) as usize, (self.height / 2) as usize);
        if w == 0 || h == 0 || !self.is_valid() {
            return None;
        }
        let mut pixels = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let sum = self.luma(2 * x, 2 * y) as u32
                    + self.luma(2 * x + 1, 2 * y) as u32
                    + self.luma(2 * x, 2 * y + 1) as u32
                    + self.luma(2 * x + 1, 2 * y + 1) as u32;
                pixels.push((sum / 4) as u8);
            }
        }
        Some(Frame {
            pixels,
            width: w as u32,
            height: h as u32,
            captured_at: self.captured_at,
            sequence: self.sequence,
        })
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_validity() {
        assert!(Frame::new(vec![0; 640 * 480], 640, 480, 1).is_valid());
        assert!(!Frame::new(vec![0; 100], 640, 480, 1).is_valid());
        assert!(!Frame::new(Vec::new(), 0, 0, 1).is_valid());
    }

    #[test]
    fn test_from_rgb() {
        let frame = Frame::from_rgb(&[255, 255, 255, 0, 0, 0], 2, 1, 7);
        assert_eq!(frame.pixels(), &[255, 0]);
        assert_eq!(frame.sequence(), 7);
    }

    #[test]
    fn test_downscale_half_averages_blocks() {
        #[rustfmt::skip]
        let pixels = vec![
            0, 100, 200, 200,
            100, 200, 200, 200,
        ];
        let half = Frame::new(pixels, 4, 2, 1).downscale_half().unwrap();
        assert_eq!((half.width(), half.height()), (2, 1));
        assert_eq!(half.pixels(), &[100, 200]);

        assert!(Frame::new(vec![9], 1, 1, 1).downscale_half().is_none());
    }
}

//! The full-canvas RGB buffer that tiles are assembled into.  Only the
//! assembler ever holds one mutably; it is moved into the assembler
//! thread and handed back when the render is done.

use error::{reserve, RenderError};
use tiles::{Tile, CHANNELS};

/// Row-major RGB pixels for the whole canvas.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// Allocate a zeroed (black) frame.  Failing to get the memory is
    /// reported rather than aborting the process.
    pub fn new(width: usize, height: usize) -> Result<FrameBuffer, RenderError> {
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(RenderError::Allocation("frame buffer", usize::max_value()))?;
        let mut pixels = reserve("frame buffer", len)?;
        pixels.resize(len, 0);
        Ok(FrameBuffer {
            width,
            height,
            pixels,
        })
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The raw RGB bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Give up the frame and keep its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// The color of the pixel at (x, y).
    ///
    /// Panics if (x, y) lies outside the canvas.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({}, {}) outside {}x{} frame",
            x,
            y,
            self.width,
            self.height
        );
        let at = (y * self.width + x) * CHANNELS;
        [self.pixels[at], self.pixels[at + 1], self.pixels[at + 2]]
    }

    /// Copy a tile's buffer into place.  The tile's rows are shorter than
    /// the frame's, so each row is copied on its own.
    ///
    /// Panics if the tile lies outside the canvas or the buffer is not
    /// exactly the tile's size; either means the scheduler is broken.
    pub fn blit(&mut self, tile: &Tile, pixels: &[u8]) {
        assert!(
            tile.end_x <= self.width && tile.end_y <= self.height,
            "tile {:?} lies outside a {}x{} frame",
            tile,
            self.width,
            self.height
        );
        assert_eq!(
            pixels.len(),
            tile.byte_len(),
            "pixel buffer does not match tile {:?}",
            tile
        );

        let row_len = tile.width() * CHANNELS;
        if row_len == 0 {
            return;
        }
        let stride = self.width * CHANNELS;
        for (row, source) in pixels.chunks(row_len).enumerate() {
            let start = (tile.start_y + row) * stride + tile.start_x * CHANNELS;
            self.pixels[start..start + row_len].copy_from_slice(source);
        }
    }
}

impl ::std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_black() {
        let frame = FrameBuffer::new(4, 3).unwrap();
        assert_eq!(frame.as_bytes().len(), 4 * 3 * CHANNELS);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_frame_is_allowed() {
        let frame = FrameBuffer::new(0, 0).unwrap();
        assert!(frame.as_bytes().is_empty());
    }

    #[test]
    fn absurd_frames_are_refused() {
        assert!(FrameBuffer::new(usize::max_value(), 2).is_err());
    }

    #[test]
    fn blit_respects_frame_stride() {
        let mut frame = FrameBuffer::new(5, 4).unwrap();
        let tile = Tile {
            start_x: 1,
            start_y: 2,
            end_x: 3,
            end_y: 4,
        };
        let pixels: Vec<u8> = (1..=12).collect();
        frame.blit(&tile, &pixels);

        assert_eq!(frame.pixel(1, 2), [1, 2, 3]);
        assert_eq!(frame.pixel(2, 2), [4, 5, 6]);
        assert_eq!(frame.pixel(1, 3), [7, 8, 9]);
        assert_eq!(frame.pixel(2, 3), [10, 11, 12]);
        for y in 0..4 {
            for x in 0..5 {
                if !tile.contains(x, y) {
                    assert_eq!(frame.pixel(x, y), [0, 0, 0], "({}, {}) was touched", x, y);
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn blit_rejects_short_buffers() {
        let mut frame = FrameBuffer::new(4, 4).unwrap();
        let tile = Tile {
            start_x: 0,
            start_y: 0,
            end_x: 2,
            end_y: 2,
        };
        frame.blit(&tile, &[0; 3]);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn blit_rejects_tiles_off_the_canvas() {
        let mut frame = FrameBuffer::new(4, 4).unwrap();
        let tile = Tile {
            start_x: 2,
            start_y: 2,
            end_x: 6,
            end_y: 4,
        };
        frame.blit(&tile, &[0; 24]);
    }

    #[test]
    #[should_panic(expected = "outside 4x2 frame")]
    fn pixel_past_the_row_end_is_rejected() {
        // (4, 0) would otherwise read the first pixel of the next row.
        FrameBuffer::new(4, 2).unwrap().pixel(4, 0);
    }
}

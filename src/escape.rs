//! The per-pixel mathematics: the escape-time count of a point under
//! z = z² + c, and the mapping of that count to a color.  Everything in
//! here is pure, so any number of workers may share one renderer.

use itertools::iproduct;
use num::Complex;

use error::RenderError;
use planes::{Pixel, PlaneMapper};
use tiles::{Tile, CHANNELS};

/// The color used for points that never escape.
pub const INSIDE: [u8; 3] = [0, 0, 0];

/// Anything that can turn a tile into a row-major RGB buffer of
/// `tile.byte_len()` bytes.  Implementations are shared by every worker
/// at once.
pub trait TileRenderer: Sync {
    /// Render one tile.  An `Err` costs only that tile.
    fn render(&self, tile: &Tile) -> Result<Vec<u8>, RenderError>;
}

/// Count iterations of z = z² + c, starting at zero, until |z| exceeds
/// 2 or `limit` iterations have been made.  Returns `limit` for points
/// that stay bounded.
#[inline]
pub fn escape_time(c: Complex<f64>, limit: usize) -> usize {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    let mut i = 0;
    while z.norm_sqr() <= 4.0 && i < limit {
        z = z * z + c;
        i += 1;
    }
    i
}

/// Points inside the set are black; escaping points cycle through a
/// banded palette keyed on the iteration count.
pub fn colorize(iterations: usize, limit: usize) -> [u8; 3] {
    if iterations >= limit {
        return INSIDE;
    }
    [
        ((iterations * 7) % 256) as u8,
        ((iterations * 5) % 256) as u8,
        ((iterations * 11) % 256) as u8,
    ]
}

/// The classic Mandelbrot renderer: one escape-time count per pixel.
#[derive(Debug, Clone)]
pub struct MandelbrotRenderer {
    plane: PlaneMapper,
    limit: usize,
}

impl MandelbrotRenderer {
    /// Render `plane` with at most `limit` iterations per pixel.
    pub fn new(plane: PlaneMapper, limit: usize) -> Self {
        MandelbrotRenderer { plane, limit }
    }

    /// The iteration cap.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl TileRenderer for MandelbrotRenderer {
    fn render(&self, tile: &Tile) -> Result<Vec<u8>, RenderError> {
        let mut pixels = Vec::with_capacity(tile.byte_len());
        for (row, column) in iproduct!(tile.start_y..tile.end_y, tile.start_x..tile.end_x) {
            let c = self.plane.pixel_to_point(&Pixel(column, row));
            let rgb = colorize(escape_time(c, self.limit), self.limit);
            pixels.extend_from_slice(&rgb[..CHANNELS]);
        }
        Ok(pixels)
    }
}

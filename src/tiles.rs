//! Cuts the canvas into a grid of rectangular tiles, the unit of
//! parallel work.  Tiles are produced in row-major order; that order is
//! the tile's id for the rest of the pipeline.

use itertools::iproduct;

use error::{reserve, RenderError};

/// Bytes per pixel in every buffer the renderer produces.
pub const CHANNELS: usize = 3;

/// A half-open rectangle of pixels, in canvas coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    /// First column covered by the tile.
    pub start_x: usize,
    /// First row covered by the tile.
    pub start_y: usize,
    /// One past the last column covered by the tile.
    pub end_x: usize,
    /// One past the last row covered by the tile.
    pub end_y: usize,
}

impl Tile {
    /// Width of the tile in pixels.
    pub fn width(&self) -> usize {
        self.end_x - self.start_x
    }

    /// Height of the tile in pixels.
    pub fn height(&self) -> usize {
        self.end_y - self.start_y
    }

    /// Number of pixels in the tile.
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }

    /// Tiles built by `make_tiles` are never empty; this exists for
    /// hand-built ones.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the tile's RGB buffer.
    pub fn byte_len(&self) -> usize {
        self.len() * CHANNELS
    }

    /// Whether the canvas pixel (x, y) falls inside the tile.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.start_x && x < self.end_x && y >= self.start_y && y < self.end_y
    }
}

// Ceiling division that cannot overflow, whatever the edge.
fn spans(len: usize, edge: usize) -> usize {
    len / edge + (len % edge != 0) as usize
}

/// Partition a `width` x `height` canvas into tiles of at most `edge`
/// pixels on a side.  The last row and column are clipped to the
/// canvas.  A canvas with no area yields no tiles.
pub fn make_tiles(width: usize, height: usize, edge: usize) -> Result<Vec<Tile>, RenderError> {
    if edge == 0 {
        return Err(RenderError::Config("tile size must be at least 1".to_string()));
    }
    if width == 0 || height == 0 {
        return Ok(vec![]);
    }

    let count = spans(width, edge)
        .checked_mul(spans(height, edge))
        .ok_or(RenderError::Allocation("tile list", usize::max_value()))?;
    let mut tiles = reserve("tile list", count)?;
    tiles.extend(
        iproduct!((0..height).step_by(edge), (0..width).step_by(edge)).map(|(y, x)| Tile {
            start_x: x,
            start_y: y,
            end_x: x.saturating_add(edge).min(width),
            end_y: y.saturating_add(edge).min(height),
        }),
    );
    Ok(tiles)
}

//! Render parameters.  Read once at startup and never changed; the
//! launcher may override any of the defaults.

use num::Complex;
use std::path::PathBuf;

use error::RenderError;
use planes::PlaneMapper;

/// Everything the pipeline needs to know before it starts.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Canvas width in pixels.
    pub width: usize,
    /// Canvas height in pixels.
    pub height: usize,
    /// Edge length of a tile; edge tiles may be smaller.
    pub tile_size: usize,
    /// Number of rendering threads.
    pub workers: usize,
    /// Corner of the complex plane that pixel (0, 0) maps to.
    pub leftlower: Complex<f64>,
    /// Opposite corner of the complex plane.
    pub rightupper: Complex<f64>,
    /// Iteration cap per pixel.
    pub iterations: usize,
    /// Persist the frame after every this many assembled tiles.
    pub flush_every: usize,
    /// Results queue capacity; `None` means one slot per tile.
    pub queue_capacity: Option<usize>,
    /// Where snapshots go.
    pub output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 800,
            height: 600,
            tile_size: 64,
            workers: ::num_cpus::get(),
            leftlower: Complex::new(-2.0, -1.0),
            rightupper: Complex::new(1.0, 1.0),
            iterations: 1000,
            flush_every: 1,
            queue_capacity: None,
            output: PathBuf::from("mandelbrot.ppm"),
        }
    }
}

impl RenderConfig {
    /// Check every parameter, so that nothing fails once threads are
    /// running.
    pub fn validate(&self) -> Result<(), RenderError> {
        let positive = [
            (self.tile_size, "tile size"),
            (self.workers, "worker count"),
            (self.iterations, "iteration count"),
            (self.flush_every, "flush interval"),
            (self.queue_capacity.unwrap_or(1), "queue capacity"),
        ];
        if let Some(&(_, name)) = positive.iter().find(|&&(value, _)| value == 0) {
            return Err(RenderError::Config(format!("{} must be at least 1", name)));
        }
        self.plane().map(|_| ())
    }

    /// The mapping from canvas pixels to the complex plane.
    pub fn plane(&self) -> Result<PlaneMapper, RenderError> {
        PlaneMapper::new(self.width, self.height, self.leftlower, self.rightupper)
    }
}

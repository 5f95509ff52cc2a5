#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tiled Mandelbrot renderer
//!
//! The Mandelbrot set is drawn by taking each pixel of the canvas as a
//! point c on the complex plane, iterating z = z² + c from zero, and
//! coloring the pixel by how many iterations it took z to escape.
//! Every pixel is independent of every other, so the canvas is cut
//! into tiles and the tiles are rendered in parallel.
//!
//! A fixed pool of workers claims tiles one at a time from a shared
//! dispenser, renders them, and pushes the finished pixels into a
//! bounded blocking queue.  A single assembler drains the queue, copies
//! each tile into the frame, and writes the frame out after every tile
//! (or every few tiles), so the image on disk fills in as the render
//! progresses.  The final image does not depend on the number of
//! workers or the order in which they finish.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate tempfile;
extern crate tracing;

pub mod assembler;
pub mod config;
pub mod dispenser;
pub mod error;
pub mod escape;
pub mod frame;
pub mod pipeline;
pub mod planes;
pub mod queue;
pub mod snapshot;
pub mod tiles;

pub use assembler::{Assembler, TileResult};
pub use config::RenderConfig;
pub use dispenser::WorkDispenser;
pub use error::RenderError;
pub use escape::{MandelbrotRenderer, TileRenderer};
pub use frame::FrameBuffer;
pub use pipeline::{render, render_to_file, RenderReport};
pub use queue::ResultsQueue;
pub use snapshot::{PngFile, PpmFile, SnapshotSink};
pub use tiles::{make_tiles, Tile};

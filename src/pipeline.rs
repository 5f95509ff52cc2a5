// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The render itself: a fixed pool of workers pulling tiles from the
//! dispenser and pushing finished tiles into the results queue, with a
//! single assembler on the other end of the queue.
//!
//! Every shared buffer is allocated before the first thread starts, so
//! running out of memory is reported as an error instead of leaving a
//! half-started render behind.  Each thread is handed only the handles
//! it needs: workers get the dispenser and the queue, the assembler gets
//! the queue, the tile list and the frame.
//!
//! If the assembler dies, it closes the queue on its way out.  Workers
//! blocked on a full queue are released and stop claiming tiles, so the
//! panic reaches the caller as an error instead of a hang.

use crossbeam;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use assembler::{Assembler, Assembly, TileResult};
use config::RenderConfig;
use dispenser::WorkDispenser;
use error::RenderError;
use escape::{MandelbrotRenderer, TileRenderer};
use frame::FrameBuffer;
use queue::ResultsQueue;
use snapshot::{sink_for, SnapshotSink};
use tiles::{make_tiles, Tile};

/// The color of a tile the renderer could not produce.
pub const SENTINEL: [u8; 3] = [255, 0, 255];

/// What a render produced.
#[derive(Debug)]
pub struct RenderReport {
    /// The finished frame.
    pub frame: FrameBuffer,
    /// Number of tiles the canvas was cut into.
    pub tiles: usize,
    /// Tile ids in the order the assembler received them.
    pub arrival_order: Vec<usize>,
    /// Tiles rendered by each worker, indexed by worker id.
    pub tiles_per_worker: Vec<usize>,
    /// Tiles replaced with the sentinel color.
    pub sentinel_tiles: usize,
    /// Snapshots that reached storage.
    pub snapshots_written: usize,
    /// Snapshots that could not be written.
    pub snapshot_failures: usize,
}

impl RenderReport {
    /// Whether every tile rendered and every snapshot was written.
    pub fn is_clean(&self) -> bool {
        self.sentinel_tiles == 0 && self.snapshot_failures == 0
    }
}

struct WorkerStats {
    rendered: usize,
    sentinels: usize,
}

fn sentinel(tile: &Tile) -> Vec<u8> {
    SENTINEL
        .iter()
        .cloned()
        .cycle()
        .take(tile.byte_len())
        .collect()
}

// The renderer is outside our control; whatever it does wrong, the
// damage stays inside the one tile.
fn render_guarded<R>(renderer: &R, tile_id: usize, tile: &Tile) -> Result<Vec<u8>, RenderError>
where
    R: TileRenderer + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(tile))) {
        Ok(Ok(ref pixels)) if pixels.len() != tile.byte_len() => Err(RenderError::Tile(
            tile_id,
            format!("expected {} bytes, got {}", tile.byte_len(), pixels.len()),
        )),
        Ok(result) => result,
        Err(_) => Err(RenderError::Tile(tile_id, "renderer panicked".to_string())),
    }
}

struct Worker<'r, R: 'r + ?Sized> {
    id: usize,
    dispenser: Arc<WorkDispenser>,
    queue: Arc<ResultsQueue<TileResult>>,
    renderer: &'r R,
}

impl<'r, R: TileRenderer + ?Sized> Worker<'r, R> {
    fn run(self) -> WorkerStats {
        let mut stats = WorkerStats {
            rendered: 0,
            sentinels: 0,
        };
        debug!("worker {} started", self.id);
        while let Some((tile_id, tile)) = self.dispenser.claim_next() {
            let pixels = match render_guarded(self.renderer, tile_id, &tile) {
                Ok(pixels) => pixels,
                Err(e) => {
                    warn!("worker {}: {}; using sentinel color", self.id, e);
                    stats.sentinels += 1;
                    sentinel(&tile)
                }
            };
            if self.queue.enqueue(TileResult { tile_id, pixels }).is_err() {
                warn!("worker {}: results queue closed, stopping", self.id);
                break;
            }
            stats.rendered += 1;
        }
        debug!("worker {} finished after {} tiles", self.id, stats.rendered);
        stats
    }
}

/// Render the canvas described by `config` with `renderer`, persisting
/// progress to `sink`.  Returns once every tile is in the frame and the
/// final snapshot has been attempted.
pub fn render<R, S>(config: &RenderConfig, renderer: &R, sink: S) -> Result<RenderReport, RenderError>
where
    R: TileRenderer + ?Sized,
    S: SnapshotSink,
{
    config.validate()?;

    let tiles = Arc::new(make_tiles(config.width, config.height, config.tile_size)?);
    let total = tiles.len();
    let capacity = config.queue_capacity.unwrap_or_else(|| total.max(1));
    let queue = Arc::new(ResultsQueue::new(capacity)?);
    let frame = FrameBuffer::new(config.width, config.height)?;
    let dispenser = Arc::new(WorkDispenser::new(tiles.clone()));

    info!(
        "rendering {}x{} as {} tiles on {} workers (queue capacity {})",
        config.width, config.height, total, config.workers, capacity
    );
    let started = Instant::now();

    let assembler = Assembler::new(
        queue.clone(),
        tiles.clone(),
        frame,
        sink,
        config.flush_every,
    );

    let outcome = crossbeam::scope(
        |spawner| -> Result<(Vec<WorkerStats>, Assembly), RenderError> {
            let assembling = {
                let queue = queue.clone();
                spawner.spawn(move |_| {
                    match panic::catch_unwind(AssertUnwindSafe(|| assembler.run())) {
                        Ok(assembly) => assembly,
                        Err(cause) => {
                            queue.close();
                            panic::resume_unwind(cause)
                        }
                    }
                })
            };

            let workers: Vec<_> = (0..config.workers)
                .map(|id| {
                    let worker = Worker {
                        id,
                        dispenser: dispenser.clone(),
                        queue: queue.clone(),
                        renderer,
                    };
                    spawner.spawn(move |_| worker.run())
                })
                .collect();

            let mut stats = Vec::with_capacity(workers.len());
            for handle in workers {
                stats.push(handle.join().map_err(|_| RenderError::ThreadPanic("worker"))?);
            }
            let assembly = assembling
                .join()
                .map_err(|_| RenderError::ThreadPanic("assembler"))?;
            Ok((stats, assembly))
        },
    )
    .map_err(|_| RenderError::ThreadPanic("render"))?;
    let (stats, assembly) = outcome?;

    let report = RenderReport {
        frame: assembly.frame,
        tiles: total,
        arrival_order: assembly.arrival_order,
        tiles_per_worker: stats.iter().map(|s| s.rendered).collect(),
        sentinel_tiles: stats.iter().map(|s| s.sentinels).sum(),
        snapshots_written: assembly.snapshots_written,
        snapshot_failures: assembly.snapshot_failures,
    };
    let elapsed = started.elapsed();
    info!(
        "rendered {} tiles in {}.{:03}s ({} snapshots, {} failed, {} sentinel tiles)",
        report.tiles,
        elapsed.as_secs(),
        elapsed.subsec_millis(),
        report.snapshots_written,
        report.snapshot_failures,
        report.sentinel_tiles
    );
    Ok(report)
}

/// Render the Mandelbrot set described by `config` into `config.output`.
pub fn render_to_file(config: &RenderConfig) -> Result<RenderReport, RenderError> {
    let renderer = MandelbrotRenderer::new(config.plane()?, config.iterations);
    render(config, &renderer, sink_for(&config.output))
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The single consumer.  The assembler owns the frame buffer outright:
//! it takes finished tiles off the results queue in whatever order the
//! workers produced them, copies each into place by its tile id, and
//! persists the frame as it fills in.
//!
//! The assembler knows how many tiles there are, so it stops after the
//! last one without any signal from the workers.

use std::sync::Arc;
use tracing::{debug, warn};

use frame::FrameBuffer;
use queue::ResultsQueue;
use snapshot::SnapshotSink;
use tiles::Tile;

/// A rendered tile on its way to the frame.
#[derive(Debug)]
pub struct TileResult {
    /// Position of the tile in generation order.
    pub tile_id: usize,
    /// Row-major RGB bytes for exactly that tile.
    pub pixels: Vec<u8>,
}

/// What the assembler did.
#[derive(Debug)]
pub struct Assembly {
    /// The finished frame.
    pub frame: FrameBuffer,
    /// Tile ids in the order they came off the queue.
    pub arrival_order: Vec<usize>,
    /// Snapshots that reached storage.
    pub snapshots_written: usize,
    /// Snapshots that could not be written.
    pub snapshot_failures: usize,
}

/// Everything the consumer side needs, and nothing the workers touch.
pub struct Assembler<S> {
    queue: Arc<ResultsQueue<TileResult>>,
    tiles: Arc<Vec<Tile>>,
    frame: FrameBuffer,
    sink: S,
    flush_every: usize,
    snapshots_written: usize,
    snapshot_failures: usize,
}

impl<S: SnapshotSink> Assembler<S> {
    /// An assembler for `tiles`, reading from `queue` into `frame`, and
    /// persisting to `sink` after every `flush_every` tiles.
    pub fn new(
        queue: Arc<ResultsQueue<TileResult>>,
        tiles: Arc<Vec<Tile>>,
        frame: FrameBuffer,
        sink: S,
        flush_every: usize,
    ) -> Self {
        Assembler {
            queue,
            tiles,
            frame,
            sink,
            flush_every: flush_every.max(1),
            snapshots_written: 0,
            snapshot_failures: 0,
        }
    }

    // A failed snapshot costs nothing but the snapshot; the frame in
    // memory is still the truth and the next flush may well work.
    fn flush(&mut self) {
        match self.sink.save(&self.frame) {
            Ok(()) => self.snapshots_written += 1,
            Err(e) => {
                warn!("snapshot failed, continuing: {}", e);
                self.snapshot_failures += 1;
            }
        }
    }

    /// Consume exactly one result per tile, then hand back the frame.
    pub fn run(mut self) -> Assembly {
        let total = self.tiles.len();
        let mut arrival_order = Vec::with_capacity(total);
        let mut placed = vec![false; total];

        for assembled in 1..=total {
            let result = self.queue.dequeue();
            let tile = match self.tiles.get(result.tile_id) {
                Some(tile) => *tile,
                None => panic!("tile id {} out of range 0..{}", result.tile_id, total),
            };
            assert!(
                !placed[result.tile_id],
                "tile {} delivered twice",
                result.tile_id
            );
            placed[result.tile_id] = true;

            self.frame.blit(&tile, &result.pixels);
            arrival_order.push(result.tile_id);
            debug!(
                "assembled tile {} ({}/{}) at {},{}",
                result.tile_id, assembled, total, tile.start_x, tile.start_y
            );
            drop(result);

            if assembled % self.flush_every == 0 {
                self.flush();
            }
        }

        // The last flush must see the whole frame, even when there was
        // nothing to assemble.
        if total == 0 || total % self.flush_every != 0 {
            self.flush();
        }

        Assembly {
            frame: self.frame,
            arrival_order,
            snapshots_written: self.snapshots_written,
            snapshot_failures: self.snapshot_failures,
        }
    }
}

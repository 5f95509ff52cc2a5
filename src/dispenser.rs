//! Hands tiles out to workers, one at a time, each exactly once.  The
//! cursor is the only state the workers share on the input side.

use std::sync::{Arc, Mutex, PoisonError};

use tiles::Tile;

/// The ordered tile list and a cursor into it.
pub struct WorkDispenser {
    tiles: Arc<Vec<Tile>>,
    next: Mutex<usize>,
}

impl WorkDispenser {
    /// Dispense `tiles` in order, starting from the first.
    pub fn new(tiles: Arc<Vec<Tile>>) -> Self {
        WorkDispenser {
            tiles,
            next: Mutex::new(0),
        }
    }

    /// Claim the next unclaimed tile with its id, or `None` once every
    /// tile has been handed out.
    pub fn claim_next(&self) -> Option<(usize, Tile)> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next < self.tiles.len() {
            let id = *next;
            *next += 1;
            Some((id, self.tiles[id]))
        } else {
            None
        }
    }

    /// How many tiles there are in all.
    pub fn total(&self) -> usize {
        self.tiles.len()
    }

    /// How many tiles have not yet been claimed.
    pub fn remaining(&self) -> usize {
        let next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        self.tiles.len() - *next
    }
}

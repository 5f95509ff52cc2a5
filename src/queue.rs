// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A bounded, blocking, first-in first-out queue: the hand-off between
//! the workers that render tiles and the assembler that places them.
//!
//! The queue is a ring of slots behind a single mutex.  Producers wait
//! on `not_full` while every slot is taken, consumers wait on
//! `not_empty` while none is; both re-check their condition after every
//! wake-up, so spurious wake-ups and several waiters are harmless.
//!
//! A queue whose consumer has gone away can be closed.  Closing wakes
//! every blocked producer, and from then on `enqueue` hands the item
//! straight back instead of waiting for a slot that will never free up.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use error::{reserve, RenderError};

struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    count: usize,
    closed: bool,
}

impl<T> Ring<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, item: T) {
        assert!(self.count < self.capacity(), "results queue overflow");
        debug_assert!(self.slots[self.tail].is_none());
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
    }

    fn pop(&mut self) -> T {
        let item = match self.slots[self.head].take() {
            Some(item) => item,
            None => panic!("results queue slot {} is empty with count {}", self.head, self.count),
        };
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        item
    }
}

/// A fixed-capacity blocking queue.
pub struct ResultsQueue<T> {
    ring: Mutex<Ring<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> ResultsQueue<T> {
    /// Build a queue with room for `capacity` items.  The slots are
    /// allocated up front; a capacity of zero could never deliver
    /// anything and is refused.
    pub fn new(capacity: usize) -> Result<ResultsQueue<T>, RenderError> {
        if capacity == 0 {
            return Err(RenderError::Config(
                "results queue capacity must be at least 1".to_string(),
            ));
        }
        let mut slots = reserve("results queue", capacity)?;
        slots.extend((0..capacity).map(|_| None));
        Ok(ResultsQueue {
            ring: Mutex::new(Ring {
                slots,
                head: 0,
                tail: 0,
                count: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        })
    }

    // Every critical section leaves the ring consistent before anything
    // that could panic, so a poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an item at the tail, waiting for a free slot if the queue is
    /// full.  Once the queue is closed the item is returned unqueued.
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        let mut ring = self.lock();
        while ring.count == ring.capacity() && !ring.closed {
            ring = self
                .not_full
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if ring.closed {
            return Err(item);
        }
        ring.push(item);
        drop(ring);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the item at the head, waiting for one to arrive if the
    /// queue is empty.
    pub fn dequeue(&self) -> T {
        let mut ring = self.lock();
        while ring.count == 0 {
            ring = self
                .not_empty
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let item = ring.pop();
        drop(ring);
        self.not_full.notify_one();
        item
    }

    /// Refuse every further item and release any blocked producer.
    /// Items already queued stay where they are.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_full.notify_all();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.lock().count
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed number of slots.
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}

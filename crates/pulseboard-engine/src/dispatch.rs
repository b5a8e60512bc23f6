//! Deferred callback dispatch.
//!
//! The queue holds compiled callback batches in enqueue order. It is
//! double-buffered: [`poll`](DispatchQueue::poll) swaps the pending buffer
//! for the spare one before running anything, so callbacks that pulse
//! inputs land in the next cycle instead of extending the current one.
//! Each swap starts a new cycle; a runtime binding enqueues its batch at
//! most once per cycle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use pulseboard_core::{GrowBuffer, Timestamp};

use crate::traits::Callback;

/// Callbacks compiled for one input, de-duplicated and ordered.
pub type Batch = Rc<[Callback]>;

struct QueueState {
    pending: GrowBuffer<Batch>,
    spare: GrowBuffer<Batch>,
    cycle: u64,
}

/// Shared FIFO of callback batches.
///
/// Clones share the queue; runtime bindings hold one each.
#[derive(Clone)]
pub struct DispatchQueue(Rc<RefCell<QueueState>>);

impl DispatchQueue {
    /// Empty queue able to hold `capacity` batches before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Rc::new(RefCell::new(QueueState {
            pending: GrowBuffer::with_capacity(capacity),
            spare: GrowBuffer::with_capacity(capacity),
            cycle: 0,
        })))
    }

    /// Queue `batch` unless `last_cycle` says it was queued this cycle.
    ///
    /// Returns whether the batch was added.
    pub fn enqueue_once(&self, batch: &Batch, last_cycle: &Cell<Option<u64>>) -> bool {
        let mut state = self.0.borrow_mut();
        if last_cycle.get() == Some(state.cycle) {
            return false;
        }
        last_cycle.set(Some(state.cycle));
        state.pending.push(Rc::clone(batch));
        true
    }

    /// Run every pending batch with `now`, in enqueue order, then clear.
    ///
    /// Returns the number of batches run. No borrow is held while callbacks
    /// execute.
    pub fn poll(&self, now: Timestamp) -> usize {
        let mut running = {
            let mut state = self.0.borrow_mut();
            if state.pending.is_empty() {
                return 0;
            }
            let state = &mut *state;
            mem::swap(&mut state.pending, &mut state.spare);
            state.cycle += 1;
            mem::replace(&mut state.spare, GrowBuffer::with_capacity(0))
        };

        for batch in running.iter() {
            for callback in batch.iter() {
                callback(now);
            }
        }

        let ran = running.len();
        running.reset();
        self.0.borrow_mut().spare = running;
        ran
    }

    /// Drop every pending batch and resize both buffers to `capacity`.
    ///
    /// Starts a new cycle. Returns the number of batches dropped.
    pub fn reset(&self, capacity: usize) -> usize {
        let mut state = self.0.borrow_mut();
        let dropped = state.pending.len();
        state.pending.reset();
        state.pending.set_capacity(capacity);
        state.spare.reset();
        state.spare.set_capacity(capacity);
        state.cycle += 1;
        dropped
    }

    /// Batches waiting for the next poll.
    pub fn len(&self) -> usize {
        self.0.borrow().pending.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the pending buffer.
    pub fn capacity(&self) -> usize {
        self.0.borrow().pending.capacity()
    }

    /// Current cycle number.
    pub fn cycle(&self) -> u64 {
        self.0.borrow().cycle
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::with_capacity(GrowBuffer::<Batch>::DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("DispatchQueue")
            .field("pending", &state.pending.len())
            .field("cycle", &state.cycle)
            .finish()
    }
}

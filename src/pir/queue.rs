//! Bounded blocking FIFO connecting the pipeline stages.
//!
//! Producers block while the queue is full, consumers block while it is empty.
//! Once the producer calls [`BoundedQueue::finish`], consumers drain what is
//! left and then receive `None` instead of blocking.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Default number of in-flight elements per pipeline queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct QueueState<T> {
    items: VecDeque<T>,
    finished: bool,
}

/// Thread-safe bounded FIFO with an end-of-stream flag
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(1024)),
                finished: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item, blocking while the queue is full.
    ///
    /// Hands the item back if the queue has been finished.
    pub fn push(&self, item: T) -> Result<(), T> {
        let guard = self.lock();
        let mut state = self
            .not_full
            .wait_while(guard, |s| !s.finished && s.items.len() >= self.capacity)
            .unwrap_or_else(PoisonError::into_inner);
        if state.finished {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is finished and drained.
    pub fn pop(&self) -> Option<T> {
        let guard = self.lock();
        let mut state = self
            .not_empty
            .wait_while(guard, |s| !s.finished && s.items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        let item = state.items.pop_front();
        drop(state);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Mark the end of the stream and wake every blocked caller.
    ///
    /// Items already queued can still be popped; later pushes fail.
    pub fn finish(&self) {
        self.lock().finished = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Whether [`finish`](Self::finish) has been called
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Finishes a queue when dropped, so every exit path of a producer,
/// including errors and panics, ends the stream.
pub(crate) struct FinishOnDrop<'a, T>(pub(crate) &'a BoundedQueue<T>);

impl<T> Drop for FinishOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

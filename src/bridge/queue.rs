/*!
 * Chunk Queue
 * Unbounded FIFO of chunks with a one-way completion flag and blocking take
 */

use super::chunk::Chunk;
use crate::core::errors::{BridgeError, BridgeResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

struct QueueState {
    items: VecDeque<Chunk>,
    completed: bool,
}

/// Outcome of a bounded wait on the queue
#[derive(Debug)]
pub enum Dequeue {
    Item(Chunk),
    /// Completed and empty; nothing will ever arrive
    Ended,
    TimedOut,
}

/// Completion-aware chunk queue
///
/// Emptiness and the completion flag live under the same lock, so a
/// consumer cannot miss the wakeup from `signal_completion`.
pub struct ChunkQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                completed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append to the tail
    ///
    /// # Errors
    ///
    /// `AlreadyCompleted` once `signal_completion` has run.
    pub fn enqueue(&self, chunk: Chunk) -> BridgeResult<()> {
        self.try_enqueue(chunk)
            .map_err(|_| BridgeError::AlreadyCompleted)
    }

    /// Append to the tail, handing the chunk back if the queue is completed
    pub(crate) fn try_enqueue(&self, chunk: Chunk) -> Result<(), Chunk> {
        let mut state = self.state.lock();
        if state.completed {
            return Err(chunk);
        }
        state.items.push_back(chunk);
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Pop the head, blocking while empty and not completed
    ///
    /// Returns `None` once the queue is completed and drained.
    pub fn dequeue_blocking(&self) -> Option<Chunk> {
        let mut state = self.state.lock();
        loop {
            if let Some(chunk) = state.items.pop_front() {
                return Some(chunk);
            }
            if state.completed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Pop the head, waiting at most `timeout`
    pub fn dequeue_timeout(&self, timeout: Duration) -> Dequeue {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(chunk) = state.items.pop_front() {
                return Dequeue::Item(chunk);
            }
            if state.completed {
                return Dequeue::Ended;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return match state.items.pop_front() {
                    Some(chunk) => Dequeue::Item(chunk),
                    None if state.completed => Dequeue::Ended,
                    None => Dequeue::TimedOut,
                };
            }
        }
    }

    /// Close the ingestion side and wake every blocked consumer
    ///
    /// Returns true if this call performed the transition. Idempotent.
    pub fn signal_completion(&self) -> bool {
        let mut state = self.state.lock();
        if state.completed {
            return false;
        }
        state.completed = true;
        let pending = state.items.len();
        drop(state);

        self.available.notify_all();
        debug!(pending_chunks = pending, "Chunk queue completed");
        true
    }

    /// True once completion has been signaled, even if chunks remain
    pub fn is_adding_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// True once completion has been signaled and every chunk was taken
    pub fn is_completed(&self) -> bool {
        let state = self.state.lock();
        state.completed && state.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Remove every queued chunk without blocking
    pub(crate) fn take_pending(&self) -> Vec<Chunk> {
        self.state.lock().items.drain(..).collect()
    }
}

impl Default for ChunkQueue {
    fn default() -> Self {
        Self::new()
    }
}

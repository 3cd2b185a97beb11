//! Bounded, memory-limited FIFO channel of byte buffers.
//!
//! [`BufferQueue`] hands buffers from one producer thread to one consumer
//! thread. It bounds the total number of queued *bytes* rather than the
//! number of buffers, so a fast producer is held back once the consumer
//! falls behind.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::QueueConfig;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct QueueState {
    buffers: VecDeque<Vec<u8>>,
    /// Sum of the lengths of `buffers`.
    memory_usage: u64,
    finished: bool,
    cancelled: bool,
}

/// A bounded single-producer/single-consumer channel of byte buffers.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
/// use spanio::streaming::BufferQueue;
///
/// let queue = Arc::new(BufferQueue::new(1024));
/// let producer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         for chunk in [b"hello ".to_vec(), b"world".to_vec()] {
///             queue.push(chunk)?;
///         }
///         queue.notify_finished();
///         Ok::<(), spanio::Error>(())
///     })
/// };
///
/// let mut received = Vec::new();
/// loop {
///     let buffer = queue.pop();
///     if buffer.is_empty() {
///         break;
///     }
///     received.extend_from_slice(&buffer);
/// }
/// producer.join().unwrap()?;
/// assert_eq!(received, b"hello world");
/// # Ok::<(), spanio::Error>(())
/// ```
pub struct BufferQueue {
    state: Mutex<QueueState>,
    /// Signalled when memory is released.
    room_available: Condvar,
    /// Signalled when a buffer is queued or the producer finishes.
    data_available: Condvar,
    max_memory_usage: u64,
}

impl BufferQueue {
    /// Creates an empty queue bounded to `max_memory_usage` bytes.
    pub fn new(max_memory_usage: u64) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            room_available: Condvar::new(),
            data_available: Condvar::new(),
            max_memory_usage,
        }
    }

    /// Creates a queue sized by `config`.
    pub fn from_config(config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.max_memory_usage))
    }

    // A panicking peer leaves the counters consistent, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues `buffer`, blocking until it fits under the memory bound.
    ///
    /// The buffer is admitted once `memory_usage + buffer.len()` is strictly
    /// below the bound. A buffer that could never be admitted, even into an
    /// empty queue, is rejected with [`Error::BufferTooLarge`]. Empty
    /// buffers are ignored, since an empty buffer marks end-of-stream.
    /// After [`cancel`](Self::cancel), pushing fails with [`Error::Cancelled`].
    pub fn push(&self, buffer: Vec<u8>) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        let len = buffer.len() as u64;
        if len >= self.max_memory_usage {
            return Err(Error::BufferTooLarge {
                size: buffer.len(),
                max_memory_usage: self.max_memory_usage,
            });
        }

        let mut state = self
            .room_available
            .wait_while(self.lock(), |state| {
                !state.cancelled && state.memory_usage + len >= self.max_memory_usage
            })
            .unwrap_or_else(PoisonError::into_inner);
        if state.cancelled {
            return Err(Error::Cancelled);
        }

        state.memory_usage += len;
        state.buffers.push_back(buffer);
        log::trace!(
            "Queued {} bytes ({} of {} bytes in use)",
            len,
            state.memory_usage,
            self.max_memory_usage
        );
        drop(state);

        self.data_available.notify_one();
        Ok(())
    }

    /// Dequeues the oldest buffer, blocking until one is available.
    ///
    /// Once the producer has finished and every buffer has been taken, this
    /// returns an empty buffer without blocking.
    pub fn pop(&self) -> Vec<u8> {
        let mut state = self
            .data_available
            .wait_while(self.lock(), |state| {
                state.buffers.is_empty() && !state.finished && !state.cancelled
            })
            .unwrap_or_else(PoisonError::into_inner);

        let Some(buffer) = state.buffers.pop_front() else {
            return Vec::new();
        };
        state.memory_usage -= buffer.len() as u64;
        log::trace!(
            "Dequeued {} bytes ({} bytes still in use)",
            buffer.len(),
            state.memory_usage
        );
        drop(state);

        self.room_available.notify_one();
        buffer
    }

    /// Marks the stream as finished and wakes a waiting consumer.
    pub fn notify_finished(&self) {
        self.lock().finished = true;
        self.data_available.notify_all();
    }

    /// Abandons the stream from the consumer side.
    ///
    /// Queued buffers are dropped, a blocked producer wakes up, and every
    /// later [`push`](Self::push) fails with [`Error::Cancelled`]. Pops
    /// return the end-of-stream sentinel.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        state.buffers.clear();
        state.memory_usage = 0;
        drop(state);
        log::debug!("Streaming queue cancelled by consumer");

        self.room_available.notify_all();
        self.data_available.notify_all();
    }

    /// Clears the finished flag so the queue can carry another stream.
    ///
    /// Queued buffers are left untouched; reuse only after draining. A
    /// cancelled queue stays cancelled.
    pub fn reset(&self) {
        self.lock().finished = false;
    }

    /// Returns `true` if no buffer is queued right now.
    ///
    /// The answer may be stale by the time the caller looks at it.
    pub fn empty(&self) -> bool {
        self.lock().buffers.is_empty()
    }

    /// Returns the number of queued buffers.
    pub fn len(&self) -> usize {
        self.lock().buffers.len()
    }

    /// Returns the number of queued bytes.
    pub fn memory_usage(&self) -> u64 {
        self.lock().memory_usage
    }

    /// Returns the memory bound.
    pub fn max_memory_usage(&self) -> u64 {
        self.max_memory_usage
    }

    /// Returns `true` once [`notify_finished`](Self::notify_finished) was called.
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }
}

impl std::fmt::Debug for BufferQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("BufferQueue")
            .field("buffers", &state.buffers.len())
            .field("memory_usage", &state.memory_usage)
            .field("max_memory_usage", &self.max_memory_usage)
            .field("finished", &state.finished)
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

//! Push-style writer that feeds a [`BufferQueue`].

use std::io::{self, Write};
use std::sync::Arc;

use super::{BufferQueue, QueueConfig};
use crate::{Error, Result};

/// A [`Write`] adapter that copies every write into a [`BufferQueue`].
///
/// The caller's slice is copied before it is queued, since the queue outlives
/// the call. Writes larger than the chunk size are split, and a single
/// `write` call queues at most one chunk; [`Write::write_all`] loops.
/// Each chunk is kept strictly below the queue's memory bound.
///
/// Once the consumer cancels the queue, writes fail with a
/// [`io::ErrorKind::BrokenPipe`] error so the producer stops early.
///
/// Dropping the writer releases it without finishing the queue; the driver
/// that owns the session calls [`BufferQueue::notify_finished`].
pub struct SynchronizedWriter {
    queue: Arc<BufferQueue>,
    chunk_size: usize,
    bytes_written: u64,
}

impl SynchronizedWriter {
    /// Creates a writer using the default chunk size.
    pub fn new(queue: Arc<BufferQueue>) -> Result<Self> {
        Self::with_chunk_size(queue, QueueConfig::default().chunk_size)
    }

    /// Creates a writer that splits writes into chunks of at most `chunk_size` bytes.
    ///
    /// The chunk size is lowered to fit under the queue's bound.
    pub fn with_chunk_size(queue: Arc<BufferQueue>, chunk_size: usize) -> Result<Self> {
        let limit = queue.max_memory_usage().saturating_sub(1);
        let chunk_size = (chunk_size as u64).min(limit) as usize;
        if chunk_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "queue bound of {} bytes admits no buffer",
                queue.max_memory_usage()
            )));
        }
        Ok(Self {
            queue,
            chunk_size,
            bytes_written: 0,
        })
    }

    /// Returns the effective chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the total number of bytes queued by this writer.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns the queue this writer feeds.
    pub fn queue(&self) -> &Arc<BufferQueue> {
        &self.queue
    }
}

impl Write for SynchronizedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.queue.is_cancelled() {
            return Err(Error::Cancelled.into());
        }
        let len = buf.len().min(self.chunk_size);
        self.queue.push(buf[..len].to_vec())?;
        self.bytes_written += len as u64;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for SynchronizedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynchronizedWriter")
            .field("chunk_size", &self.chunk_size)
            .field("bytes_written", &self.bytes_written)
            .finish()
    }
}

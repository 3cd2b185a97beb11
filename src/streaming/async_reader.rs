//! Tokio consumer for a [`BufferQueue`].
//!
//! [`AsyncQueueReader`] lets an async task consume what a synchronous
//! producer pushes. The blocking [`BufferQueue::pop`] runs on Tokio's
//! blocking pool, so the async executor is never stalled.

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::task::JoinHandle;

use super::sync_reader::{FailureSlot, run_producer, writer_task};
use super::{BufferQueue, QueueConfig};
use crate::{Error, Result};

/// An [`AsyncRead`] over the buffers of a [`BufferQueue`].
///
/// # Example
///
/// ```rust,no_run
/// use std::io::Write;
/// use tokio::io::AsyncReadExt;
/// use spanio::streaming::{AsyncQueueReader, QueueConfig};
///
/// # async fn example() -> spanio::Result<()> {
/// let mut reader = AsyncQueueReader::spawn(&QueueConfig::low_memory(), |out| {
///     out.write_all(b"decoded bytes")?;
///     Ok(())
/// })?;
///
/// let mut data = Vec::new();
/// reader.read_to_end(&mut data).await?;
/// # Ok(())
/// # }
/// ```
pub struct AsyncQueueReader {
    queue: Arc<BufferQueue>,
    pending: Option<JoinHandle<Vec<u8>>>,
    failure: Option<FailureSlot>,
    current: Vec<u8>,
    offset: usize,
    done: bool,
}

impl AsyncQueueReader {
    /// Creates a reader over a queue fed by some other producer.
    pub fn new(queue: Arc<BufferQueue>) -> Self {
        Self {
            queue,
            pending: None,
            failure: None,
            current: Vec::new(),
            offset: 0,
            done: false,
        }
    }

    /// Runs `producer` on Tokio's blocking pool and reads what it writes.
    ///
    /// Must be called from within a Tokio runtime. Producer failures are
    /// reported after the bytes produced before the failure.
    pub fn spawn<F>(config: &QueueConfig, producer: F) -> Result<Self>
    where
        F: FnOnce(&mut dyn Write) -> Result<()> + Send + 'static,
    {
        config.validate()?;
        let queue = Arc::new(BufferQueue::new(config.max_memory_usage));
        let failure = FailureSlot::default();
        let task = writer_task(config.chunk_size, producer);

        let producer_queue = Arc::clone(&queue);
        let producer_failure = failure.clone();
        // Detached; the queue is finished when the task ends.
        drop(tokio::task::spawn_blocking(move || {
            run_producer(producer_queue, producer_failure, task)
        }));

        let mut reader = Self::new(queue);
        reader.failure = Some(failure);
        Ok(reader)
    }

    /// Returns the queue being drained.
    pub fn queue(&self) -> &Arc<BufferQueue> {
        &self.queue
    }

    fn end_of_stream(&self) -> io::Result<()> {
        match self.failure.as_ref().and_then(FailureSlot::get) {
            Some(message) => Err(Error::ProducerFailed(message).into()),
            None => Ok(()),
        }
    }
}

impl AsyncRead for AsyncQueueReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if this.offset < this.current.len() {
                let available = &this.current[this.offset..];
                let n = available.len().min(buf.remaining());
                buf.put_slice(&available[..n]);
                this.offset += n;
                return Poll::Ready(Ok(()));
            }
            if this.done {
                return Poll::Ready(this.end_of_stream());
            }

            let pending = this.pending.get_or_insert_with(|| {
                let queue = Arc::clone(&this.queue);
                tokio::task::spawn_blocking(move || queue.pop())
            });
            let next = match Pin::new(pending).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => {
                    this.pending = None;
                    result.map_err(io::Error::other)?
                }
            };

            if next.is_empty() {
                this.done = true;
            } else {
                this.current = next;
                this.offset = 0;
            }
        }
    }
}

impl Drop for AsyncQueueReader {
    fn drop(&mut self) {
        // Only an owned producer can be left blocked by an early drop.
        if self.done || self.failure.is_none() {
            return;
        }
        self.queue.cancel();
    }
}

impl std::fmt::Debug for AsyncQueueReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncQueueReader")
            .field("queue", &self.queue)
            .field("buffered", &(self.current.len() - self.offset))
            .field("done", &self.done)
            .finish()
    }
}

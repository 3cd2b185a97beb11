//! Pull-style reader that drains a [`BufferQueue`] filled by a producer thread.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::{BufferQueue, QueueConfig, SynchronizedWriter};
use crate::{Error, Result};

pub(crate) type Task = Box<dyn FnOnce(Arc<BufferQueue>) -> Result<()> + Send + 'static>;

/// Failure reported by a producer, shared with its consumer.
#[derive(Debug, Clone, Default)]
pub(crate) struct FailureSlot(Arc<Mutex<Option<String>>>);

impl FailureSlot {
    pub(crate) fn set(&self, message: String) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(message);
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Finishes the queue when the producer returns or unwinds.
struct FinishGuard {
    queue: Arc<BufferQueue>,
    failure: FailureSlot,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.failure.set("producer panicked".into());
        }
        self.queue.notify_finished();
    }
}

/// Runs a producer task against `queue`, always finishing the queue.
pub(crate) fn run_producer(
    queue: Arc<BufferQueue>,
    failure: FailureSlot,
    task: impl FnOnce(Arc<BufferQueue>) -> Result<()>,
) {
    let _guard = FinishGuard {
        queue: Arc::clone(&queue),
        failure: failure.clone(),
    };
    match task(queue) {
        Ok(()) => {}
        Err(Error::Cancelled) => log::debug!("Streaming producer stopped by consumer"),
        Err(Error::Io(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            log::debug!("Streaming producer stopped by consumer: {}", err);
        }
        Err(err) => {
            log::warn!("Streaming producer failed: {}", err);
            failure.set(match err {
                Error::ProducerFailed(message) => message,
                other => other.to_string(),
            });
        }
    }
}

/// Wraps a write-style producer into a queue task.
pub(crate) fn writer_task<F>(chunk_size: usize, producer: F) -> Task
where
    F: FnOnce(&mut dyn Write) -> Result<()> + Send + 'static,
{
    Box::new(move |queue| {
        let mut writer = SynchronizedWriter::with_chunk_size(queue, chunk_size)?;
        producer(&mut writer)
    })
}

/// A [`Read`] adapter over the bytes a producer thread pushes into a queue.
///
/// The producer runs on its own thread, started lazily on the first read.
/// Reads return bytes in the order they were produced and `Ok(0)` once the
/// producer is done. If the producer fails, the failure is returned as an
/// [`Error::ProducerFailed`] I/O error after every byte it produced before
/// failing has been read.
///
/// Dropping the reader early cancels the queue, so the producer's next
/// write fails and it stops, then joins its thread.
///
/// # Example
///
/// ```rust
/// use std::io::{Read, Write};
/// use spanio::streaming::{QueueConfig, SynchronizedReader};
///
/// let config = QueueConfig::new().max_memory_usage(64).chunk_size(16);
/// let mut reader = SynchronizedReader::new(&config, |out| {
///     for line in ["first\n", "second\n"] {
///         out.write_all(line.as_bytes())?;
///     }
///     Ok(())
/// })?;
///
/// let mut text = String::new();
/// reader.read_to_string(&mut text)?;
/// assert_eq!(text, "first\nsecond\n");
/// # Ok::<(), spanio::Error>(())
/// ```
pub struct SynchronizedReader {
    queue: Arc<BufferQueue>,
    task: Option<Task>,
    handle: Option<JoinHandle<()>>,
    failure: FailureSlot,
    current: Vec<u8>,
    offset: usize,
    done: bool,
}

impl SynchronizedReader {
    /// Creates a reader over the bytes `producer` writes.
    pub fn new<F>(config: &QueueConfig, producer: F) -> Result<Self>
    where
        F: FnOnce(&mut dyn Write) -> Result<()> + Send + 'static,
    {
        config.validate()?;
        let task = writer_task(config.chunk_size, producer);
        Ok(Self::with_task(
            Arc::new(BufferQueue::new(config.max_memory_usage)),
            task,
        ))
    }

    pub(crate) fn with_task(queue: Arc<BufferQueue>, task: Task) -> Self {
        Self {
            queue,
            task: Some(task),
            handle: None,
            failure: FailureSlot::default(),
            current: Vec::new(),
            offset: 0,
            done: false,
        }
    }

    /// Returns `true` once the producer thread has been started.
    pub fn is_started(&self) -> bool {
        self.task.is_none()
    }

    /// Returns the queue between the producer and this reader.
    pub fn queue(&self) -> &Arc<BufferQueue> {
        &self.queue
    }

    fn start(&mut self) -> io::Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let queue = Arc::clone(&self.queue);
        let failure = self.failure.clone();
        let handle = thread::Builder::new()
            .name("spanio-producer".into())
            .spawn(move || run_producer(queue, failure, task))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Streaming producer thread panicked");
            }
        }
    }

    fn end_of_stream(&self) -> io::Result<usize> {
        match self.failure.get() {
            Some(message) => Err(Error::ProducerFailed(message).into()),
            None => Ok(0),
        }
    }
}

impl Read for SynchronizedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.done {
            return self.end_of_stream();
        }
        self.start()?;

        if self.offset == self.current.len() {
            let next = self.queue.pop();
            if next.is_empty() {
                self.done = true;
                self.join();
                return self.end_of_stream();
            }
            self.current = next;
            self.offset = 0;
        }

        let available = &self.current[self.offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }
}

impl Drop for SynchronizedReader {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        if !self.done {
            self.queue.cancel();
        }
        self.join();
    }
}

impl std::fmt::Debug for SynchronizedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynchronizedReader")
            .field("queue", &self.queue)
            .field("started", &self.is_started())
            .field("buffered", &(self.current.len() - self.offset))
            .field("done", &self.done)
            .finish()
    }
}

//! Streaming extraction driver.
//!
//! An [`ItemProducer`] is the engine that knows how to produce the bytes of
//! an item (for example a decoder for one archive entry). The
//! [`SequentialExtractor`] feeds those bytes into a [`BufferQueue`] through
//! a fresh [`SynchronizedWriter`] per item, while the consumer drains the
//! queue on another thread. [`stream_item`] and [`stream_items`] wire both
//! halves together and hand back a [`SynchronizedReader`].

use std::io::Write;
use std::sync::Arc;

use super::sync_reader::Task;
use super::{BufferQueue, QueueConfig, SynchronizedReader, SynchronizedWriter};
use crate::{Error, Result};

/// A source of item contents, driven synchronously on the producer thread.
pub trait ItemProducer: Send {
    /// Returns the number of items.
    fn item_count(&self) -> usize;

    /// Returns `true` if the item has no contents to stream.
    fn is_directory(&self, index: usize) -> bool;

    /// Writes the contents of item `index` to `out`.
    fn produce(&mut self, index: usize, out: &mut dyn Write) -> Result<()>;
}

fn check_index<P: ItemProducer + ?Sized>(producer: &P, index: usize) -> Result<()> {
    let count = producer.item_count();
    if index >= count {
        return Err(Error::ItemIndex { index, count });
    }
    Ok(())
}

/// Extracts items one after another into a shared queue.
#[derive(Debug)]
pub struct SequentialExtractor {
    queue: Arc<BufferQueue>,
    chunk_size: usize,
}

impl SequentialExtractor {
    /// Creates an extractor feeding `queue`.
    pub fn new(queue: Arc<BufferQueue>) -> Self {
        Self {
            queue,
            chunk_size: QueueConfig::default().chunk_size,
        }
    }

    /// Sets the largest buffer pushed per write.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Returns the queue being fed.
    pub fn queue(&self) -> &Arc<BufferQueue> {
        &self.queue
    }

    /// Streams one item into the queue and returns the bytes it produced.
    ///
    /// Directories produce nothing. The item's writer is released when the
    /// item completes, whether or not the producer succeeded.
    pub fn extract_item<P: ItemProducer + ?Sized>(
        &self,
        producer: &mut P,
        index: usize,
    ) -> Result<u64> {
        check_index(producer, index)?;
        if producer.is_directory(index) {
            log::debug!("Skipping directory item {}", index);
            return Ok(0);
        }

        let mut writer = SynchronizedWriter::with_chunk_size(Arc::clone(&self.queue), self.chunk_size)?;
        producer.produce(index, &mut writer)?;
        log::debug!("Streamed item {} ({} bytes)", index, writer.bytes_written());
        Ok(writer.bytes_written())
    }

    /// Streams each item of `indices` in order, stopping at the first failure.
    pub fn extract<P: ItemProducer + ?Sized>(
        &self,
        producer: &mut P,
        indices: &[usize],
    ) -> Result<u64> {
        let mut total = 0;
        for &index in indices {
            total += self.extract_item(producer, index)?;
        }
        Ok(total)
    }

    /// Like [`extract`](Self::extract), then finishes the queue.
    ///
    /// The queue is finished on failure too, so the consumer never waits
    /// on a producer that has given up.
    pub fn run<P: ItemProducer + ?Sized>(self, producer: &mut P, indices: &[usize]) -> Result<u64> {
        let result = self.extract(producer, indices);
        self.queue.notify_finished();
        result
    }
}

/// Streams a single item through a bounded queue.
///
/// The index is checked up front; the producer itself only runs once the
/// returned reader is first read.
///
/// # Example
///
/// ```rust
/// use std::io::{Read, Write};
/// use spanio::streaming::{stream_item, ItemProducer, QueueConfig};
///
/// struct Greeting;
///
/// impl ItemProducer for Greeting {
///     fn item_count(&self) -> usize { 1 }
///     fn is_directory(&self, _index: usize) -> bool { false }
///     fn produce(&mut self, _index: usize, out: &mut dyn Write) -> spanio::Result<()> {
///         out.write_all(b"hello")?;
///         Ok(())
///     }
/// }
///
/// let mut reader = stream_item(Greeting, 0, &QueueConfig::low_memory())?;
/// let mut text = String::new();
/// reader.read_to_string(&mut text)?;
/// assert_eq!(text, "hello");
/// # Ok::<(), spanio::Error>(())
/// ```
pub fn stream_item<P>(producer: P, index: usize, config: &QueueConfig) -> Result<SynchronizedReader>
where
    P: ItemProducer + 'static,
{
    stream_items(producer, vec![index], config)
}

/// Streams several items, back to back, through one bounded queue.
pub fn stream_items<P>(
    mut producer: P,
    indices: Vec<usize>,
    config: &QueueConfig,
) -> Result<SynchronizedReader>
where
    P: ItemProducer + 'static,
{
    config.validate()?;
    for &index in &indices {
        check_index(&producer, index)?;
    }

    let chunk_size = config.chunk_size;
    let task: Task = Box::new(move |queue| {
        SequentialExtractor::new(queue)
            .with_chunk_size(chunk_size)
            .extract(&mut producer, &indices)
            .map(|_| ())
    });
    Ok(SynchronizedReader::with_task(
        Arc::new(BufferQueue::new(config.max_memory_usage)),
        task,
    ))
}

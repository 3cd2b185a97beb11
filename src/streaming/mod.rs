//! Bounded producer/consumer streaming.
//!
//! This module moves bytes from a synchronous, push-driven producer (for
//! example a decoder writing an extracted item) to a pull-driven consumer on
//! another thread, holding at most a fixed number of bytes in between.
//!
//! # Overview
//!
//! - **[`BufferQueue`]**: the bounded FIFO channel of byte buffers
//! - **[`QueueConfig`]**: memory bound and chunk size of a session
//! - **[`SynchronizedWriter`]**: a [`Write`](std::io::Write) that pushes copies into the queue
//! - **[`SynchronizedReader`]**: a [`Read`](std::io::Read) that drains the queue while a
//!   producer thread fills it
//! - **[`ItemProducer`]** / **[`SequentialExtractor`]**: the per-item driver
//! - **`AsyncQueueReader`**: a Tokio consumer (feature `async`)
//!
//! # Example
//!
//! ```rust
//! use std::io::{Read, Write};
//! use spanio::streaming::{QueueConfig, SynchronizedReader};
//!
//! let config = QueueConfig::new()
//!     .max_memory_usage(1024)  // at most 1 KiB in flight
//!     .chunk_size(256);
//!
//! let mut reader = SynchronizedReader::new(&config, |out| {
//!     for _ in 0..100 {
//!         out.write_all(&[0xAB; 100])?;
//!     }
//!     Ok(())
//! })?;
//!
//! let mut total = 0;
//! let mut buf = [0u8; 4096];
//! loop {
//!     let n = reader.read(&mut buf)?;
//!     if n == 0 {
//!         break;
//!     }
//!     total += n;
//! }
//! assert_eq!(total, 10_000);
//! # Ok::<(), spanio::Error>(())
//! ```
//!
//! # Shutdown
//!
//! The queue carries no errors. A producer that stops, successfully or not,
//! must call [`BufferQueue::notify_finished`] so the consumer receives the
//! empty end-of-stream buffer; [`SynchronizedReader`] and
//! [`SequentialExtractor::run`] do this for you.

#[cfg(feature = "async")]
mod async_reader;
mod config;
mod driver;
mod queue;
mod sync_reader;
mod sync_writer;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use async_reader::AsyncQueueReader;
pub use config::{MIN_MAX_MEMORY_USAGE, QueueConfig};
pub use driver::{ItemProducer, SequentialExtractor, stream_item, stream_items};
pub use queue::BufferQueue;
pub use sync_reader::SynchronizedReader;
pub use sync_writer::SynchronizedWriter;

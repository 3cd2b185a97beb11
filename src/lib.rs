//! # spanio
//!
//! Split-volume byte streams and bounded producer/consumer streaming for
//! archive engines.
//!
//! This crate provides the storage side of an archive tool: a single logical
//! byte stream spread over numbered volume files, and a memory-bounded
//! channel that carries decoded bytes from a synchronous producer to a
//! consumer on another thread.
//!
//! ## Quick Start
//!
//! ### Writing a Split Stream
//!
//! ```rust,no_run
//! use std::io::Write;
//! use spanio::{MultiVolumeWriter, Result, VolumeConfig};
//!
//! fn main() -> Result<()> {
//!     // 64 MiB volumes: backup.7z.001, backup.7z.002, ...
//!     let config = VolumeConfig::new("backup.7z", 64 * 1024 * 1024);
//!     let mut writer = MultiVolumeWriter::create(config)?;
//!     writer.write_all(b"archive bytes")?;
//!     let sizes = writer.finish()?;
//!     println!("Wrote {} volumes", sizes.len());
//!     Ok(())
//! }
//! ```
//!
//! ### Reading it Back
//!
//! ```rust,no_run
//! use std::io::Read;
//! use spanio::{MultiVolumeReader, Result};
//!
//! fn main() -> Result<()> {
//!     // Either the first volume or the base name works
//!     let mut reader = MultiVolumeReader::open("backup.7z")?;
//!     let mut data = Vec::new();
//!     reader.read_to_end(&mut data)?;
//!     Ok(())
//! }
//! ```
//!
//! ### Streaming Through a Bounded Queue
//!
//! ```rust
//! use std::io::{Read, Write};
//! use spanio::streaming::{QueueConfig, SynchronizedReader};
//!
//! let mut reader = SynchronizedReader::new(&QueueConfig::low_memory(), |out| {
//!     out.write_all(b"decoded")?;
//!     Ok(())
//! })?;
//! let mut data = Vec::new();
//! reader.read_to_end(&mut data)?;
//! assert_eq!(data, b"decoded");
//! # Ok::<(), spanio::Error>(())
//! ```
//!
//! ## Stream Backends
//!
//! An engine that only needs "something readable and seekable" or "something
//! writable, seekable and resizable" can take an [`InputStream`] or
//! [`OutputStream`], which cover single files, in-memory buffers, split
//! streams and caller-supplied streams behind one interface.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `sysinfo` | No | Size the queue bound from available RAM |
//! | `async` | No | Tokio consumer for the bounded queue |

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod stream;
pub mod streaming;
pub mod volume;

pub use error::{Error, Result};

// Stream backends
pub use stream::{InputStream, OutputStream, ReadStream, SetSize, WriteStream};

// Split volumes
pub use volume::{MultiVolumeReader, MultiVolumeWriter, VolumeConfig, VolumeReader};

// Bounded streaming
pub use streaming::{BufferQueue, QueueConfig, SynchronizedReader, SynchronizedWriter};

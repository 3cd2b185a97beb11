//! Split-volume stream support.
//!
//! This module presents a single logical byte stream on top of a sequence of
//! bounded-size files ("volumes"), e.g. `archive.7z.001`, `archive.7z.002`.
//!
//! # Overview
//!
//! Split streams are useful for:
//! - Storing large archives on media with size limits (USB drives, DVDs)
//! - Splitting archives for easier transfer or upload
//! - Working around file system limitations
//!
//! # Reading Split Streams
//!
//! ```rust,no_run
//! use std::io::{Read, Seek, SeekFrom};
//! use spanio::volume::{MultiVolumeReader, VolumeReader};
//!
//! // Open the first volume (other volumes are discovered automatically)
//! let mut reader = MultiVolumeReader::open("archive.7z.001")?;
//! println!("Stream spans {} volumes", reader.volume_count());
//!
//! reader.seek(SeekFrom::Start(1024))?;
//! let mut header = [0u8; 32];
//! reader.read_exact(&mut header)?;
//! # Ok::<(), spanio::Error>(())
//! ```
//!
//! # Writing Split Streams
//!
//! ```rust,no_run
//! use std::io::Write;
//! use spanio::volume::{MultiVolumeWriter, VolumeConfig};
//!
//! // Configure volume size (e.g., 100 MB per volume)
//! let config = VolumeConfig::new("archive.7z", 100 * 1024 * 1024);
//! let mut writer = MultiVolumeWriter::create(config)?;
//! writer.write_all(b"payload")?;
//! writer.finish()?;
//! # Ok::<(), spanio::Error>(())
//! ```
//!
//! # Volume Naming Convention
//!
//! - `archive.7z.001` - First volume
//! - `archive.7z.002` - Second volume
//! - `archive.7z.1000` - Volume numbers past 999 widen naturally
//!
//! # Open Files
//!
//! Both sides keep every volume open for the lifetime of the stream. When a
//! stream reaches [`OPEN_FILES_THRESHOLD`] volumes, the process open-file
//! ceiling is raised once (see [`FileLimit`]).

mod config;
mod file_limit;
mod reader;
mod segment;
mod writer;

pub use config::VolumeConfig;
pub(crate) use config::volume_path_for;
pub use file_limit::{FileLimit, OPEN_FILES_THRESHOLD, RaiseFileLimit, SystemFileLimit};
pub use reader::{MultiVolumeReader, VolumeReader};
pub use segment::{VolumeSource, VolumeWriter};
pub use writer::MultiVolumeWriter;

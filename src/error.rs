//! Error types for split-volume streams and the buffer channel.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes of the crate, along with a convenient [`Result<T>`] type
//! alias.
//!
//! # Error Handling
//!
//! All fallible operations return `Result<T, Error>`. The `std::io` trait
//! implementations ([`Read`], [`Write`], [`Seek`]) convert these errors into
//! [`io::Error`] values, preserving the most specific [`io::ErrorKind`]:
//!
//! ```rust
//! use spanio::Error;
//! use std::io;
//!
//! let err = Error::InvalidSeek { origin: "start", offset: -1 };
//! let io_err: io::Error = err.into();
//! assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
//! ```
//!
//! [`Read`]: std::io::Read
//! [`Write`]: std::io::Write
//! [`Seek`]: std::io::Seek

use std::io;

/// The main error type for volume and streaming operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | File system operations |
/// | Volumes | [`VolumeCreate`][Self::VolumeCreate], [`VolumeMissing`][Self::VolumeMissing], [`Truncate`][Self::Truncate] | Segment files |
/// | Arguments | [`InvalidSeek`][Self::InvalidSeek], [`InvalidConfig`][Self::InvalidConfig] | Caller input |
/// | Channel | [`BufferTooLarge`][Self::BufferTooLarge], [`ProducerFailed`][Self::ProducerFailed], [`Cancelled`][Self::Cancelled], [`ItemIndex`][Self::ItemIndex] | Streaming sessions |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A volume file could not be created while writing.
    ///
    /// Volumes created earlier in the session are left on disk; removing
    /// them after an aborted write is the caller's responsibility.
    #[error("Failed to create volume {volume} at '{path}': {source}")]
    VolumeCreate {
        /// The volume number (1-indexed).
        volume: u32,
        /// The path that could not be created.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A volume file is missing or could not be opened for reading.
    ///
    /// # Recovery
    ///
    /// - Ensure all volume files are present in the same directory
    /// - Check that volume files haven't been renamed
    #[error("Volume {volume} missing: expected at '{path}'")]
    VolumeMissing {
        /// The volume number (1-indexed) that is missing.
        volume: u32,
        /// The expected path of the missing volume.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Truncating or removing a volume failed during a resize.
    ///
    /// The stream is left partially truncated and its logical length is
    /// undefined until the next successful resize.
    #[error("Failed to truncate volume {volume} at '{path}': {source}")]
    Truncate {
        /// The volume number (1-indexed) being truncated or removed.
        volume: u32,
        /// The path of the volume.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A seek would move the position below zero or past `u64::MAX`.
    ///
    /// The stream position is left unchanged.
    #[error("Invalid seek: offset {offset} from {origin} is out of range")]
    InvalidSeek {
        /// The seek origin (`"start"`, `"current"` or `"end"`).
        origin: &'static str,
        /// The requested relative offset.
        offset: i128,
    },

    /// A buffer can never fit in the channel's memory bound.
    ///
    /// Every pushed buffer must be strictly smaller than the bound,
    /// otherwise the producer would wait forever.
    #[error("Buffer of {size} bytes cannot fit in a queue bounded to {max_memory_usage} bytes")]
    BufferTooLarge {
        /// Size of the rejected buffer.
        size: usize,
        /// The queue's memory bound.
        max_memory_usage: u64,
    },

    /// The producer side of a streaming session failed.
    ///
    /// The channel itself carries no error; the failure is reported out of
    /// band once the consumer has drained every buffer pushed before it.
    #[error("Producer failed: {0}")]
    ProducerFailed(String),

    /// The consumer of a streaming session went away.
    ///
    /// Producers see this from `push` after the consumer cancelled the
    /// queue, and should stop producing.
    #[error("Streaming consumer cancelled the session")]
    Cancelled,

    /// An item index does not name an item of the producer.
    #[error("Item index {index} out of range ({count} items)")]
    ItemIndex {
        /// The requested index.
        index: usize,
        /// Number of items the producer exposes.
        count: usize,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns `true` if this error might be recoverable.
    ///
    /// - `VolumeMissing`: the user can provide the missing volume file
    /// - `Io` (transient kinds only): retry may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::VolumeMissing { .. } => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns the volume number associated with this error, if any.
    pub fn volume(&self) -> Option<u32> {
        match self {
            Error::VolumeCreate { volume, .. }
            | Error::VolumeMissing { volume, .. }
            | Error::Truncate { volume, .. } => Some(*volume),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::InvalidSeek { .. }
            | Error::BufferTooLarge { .. }
            | Error::ItemIndex { .. }
            | Error::InvalidConfig(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::VolumeMissing { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            Error::Cancelled => io::Error::new(io::ErrorKind::BrokenPipe, err),
            other => io::Error::other(other),
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_invalid_seek_maps_to_invalid_input() {
        let err = Error::InvalidSeek {
            origin: "current",
            offset: -10,
        };
        assert!(err.to_string().contains("-10"));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_io_roundtrip_keeps_kind() {
        let err = Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_volume_missing_with_source() {
        let err = Error::VolumeMissing {
            volume: 3,
            path: "/data/archive.7z.003".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(err.volume(), Some(3));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("archive.7z.003"));
        assert!(std::error::Error::source(&err).is_some());

        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_buffer_too_large() {
        let err = Error::BufferTooLarge {
            size: 1000,
            max_memory_usage: 1000,
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.volume(), None);
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_cancelled_maps_to_broken_pipe() {
        assert!(!Error::Cancelled.is_recoverable());
        let io_err: io::Error = Error::Cancelled.into();
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_is_recoverable_transient_io_errors() {
        for kind in [
            io::ErrorKind::WouldBlock,
            io::ErrorKind::Interrupted,
            io::ErrorKind::TimedOut,
        ] {
            assert!(Error::Io(io::Error::new(kind, "transient")).is_recoverable());
        }
        assert!(!Error::Io(io::Error::new(io::ErrorKind::InvalidData, "bad")).is_recoverable());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}

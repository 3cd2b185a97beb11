//! Multi-volume writer.

use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

use super::file_limit::FileLimit;
use super::segment::VolumeWriter;
use super::VolumeConfig;
use crate::{Error, Result};

/// A writer that presents a sequence of volume files as one seekable stream.
///
/// Volumes are created lazily the first time a write touches an offset
/// inside them and stay open until the writer is dropped. A single call to
/// [`write`](Write::write) never crosses a volume boundary: it returns the
/// number of bytes that fit in the current volume, and
/// [`write_all`](Write::write_all) continues on the next one.
///
/// # Example
///
/// ```rust,no_run
/// use std::io::Write;
/// use spanio::volume::{MultiVolumeWriter, VolumeConfig};
///
/// let config = VolumeConfig::new("archive.7z", 50 * 1024 * 1024); // 50 MB volumes
/// let mut writer = MultiVolumeWriter::create(config)?;
///
/// // Write data - automatically splits across volumes
/// writer.write_all(&[0u8; 1024])?;
///
/// // Finish and get volume sizes
/// let sizes = writer.finish()?;
/// println!("Created {} volumes", sizes.len());
/// # Ok::<(), spanio::Error>(())
/// ```
pub struct MultiVolumeWriter {
    /// Configuration for volume generation.
    config: VolumeConfig,
    /// Volumes created so far, in order.
    volumes: Vec<VolumeWriter>,
    /// Current volume index (0-based, may be stale until the next write).
    current_volume: usize,
    /// Offset relative to `current_volume` (may exceed the volume size).
    volume_offset: u64,
    /// Absolute position in the logical stream.
    position: u64,
    /// Highest absolute offset ever written.
    full_size: u64,
    file_limit: Arc<FileLimit>,
}

impl MultiVolumeWriter {
    /// Creates a new multi-volume writer.
    ///
    /// No file is created until the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn create(config: VolumeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            volumes: Vec::new(),
            current_volume: 0,
            volume_offset: 0,
            position: 0,
            full_size: 0,
            file_limit: FileLimit::global(),
        })
    }

    /// Replaces the open-file-limit guard used by this writer.
    pub fn with_file_limit(mut self, file_limit: Arc<FileLimit>) -> Self {
        self.file_limit = file_limit;
        self
    }

    /// Returns the volume configuration.
    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Returns the number of volumes created so far.
    pub fn volume_count(&self) -> u32 {
        self.volumes.len() as u32
    }

    /// Returns the paths of all volumes created so far.
    pub fn volume_paths(&self) -> Vec<PathBuf> {
        self.volumes.iter().map(|v| v.path().to_path_buf()).collect()
    }

    /// Returns the realized size of each volume.
    pub fn volume_sizes(&self) -> Vec<u64> {
        self.volumes.iter().map(VolumeWriter::current_size).collect()
    }

    /// Returns the logical size of the stream.
    pub fn size(&self) -> u64 {
        self.full_size
    }

    /// Returns the absolute position of the cursor.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Sets the logical size of the stream.
    ///
    /// Shrinking truncates the volume that contains `new_size` and removes
    /// every volume starting at or after it. Growing zero-fills up to
    /// `new_size`, creating volumes as needed. The cursor is left where it
    /// was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncate`] if a volume cannot be truncated or
    /// removed; the stream is then partially truncated.
    pub fn set_size(&mut self, new_size: u64) -> Result<()> {
        if new_size > self.full_size {
            self.grow_to(new_size)?;
        } else {
            self.shrink_to(new_size)?;
        }
        self.full_size = new_size;
        self.current_volume = 0;
        self.volume_offset = self.position;
        Ok(())
    }

    /// Flushes all volumes and returns their sizes.
    pub fn finish(mut self) -> Result<Vec<u64>> {
        self.flush()?;
        Ok(self.volume_sizes())
    }

    fn volume_size(&self) -> u64 {
        self.config.volume_size()
    }

    /// Folds whole volumes out of `volume_offset` into `current_volume`.
    fn normalize(&mut self) -> io::Result<()> {
        let size = self.volume_size();
        let skip = usize::try_from(self.volume_offset / size).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "volume index out of range")
        })?;
        self.current_volume += skip;
        self.volume_offset %= size;
        Ok(())
    }

    /// Makes sure volume `index` exists, padding every volume before it to
    /// the full volume size so the concatenation has no holes.
    fn ensure_volume(&mut self, index: usize) -> Result<()> {
        if index < self.volumes.len() {
            return Ok(());
        }

        let size = self.volume_size();
        if let Some(last) = self.volumes.last_mut() {
            if last.current_size() < size {
                let number = last.number();
                let path = last.path().display().to_string();
                last.set_size(size).map_err(|source| Error::Truncate {
                    volume: number,
                    path,
                    source,
                })?;
            }
        }

        while self.volumes.len() <= index {
            let number = u32::try_from(self.volumes.len() + 1).map_err(|_| {
                Error::InvalidConfig("too many volumes for a 32-bit volume number".into())
            })?;
            let path = self.config.volume_path(number);
            let mut volume = VolumeWriter::create(&path, number)?;
            if self.volumes.len() < index {
                volume.set_size(size).map_err(|source| Error::VolumeCreate {
                    volume: number,
                    path: path.display().to_string(),
                    source,
                })?;
            }
            self.volumes.push(volume);
            self.file_limit.note_open_files(self.volumes.len());
        }
        Ok(())
    }

    fn grow_to(&mut self, new_size: u64) -> Result<()> {
        let size = self.volume_size();
        let last_index = usize::try_from((new_size - 1) / size)
            .map_err(|_| Error::InvalidConfig("volume index out of range".into()))?;
        self.ensure_volume(last_index)?;

        let tail = new_size - last_index as u64 * size;
        let volume = &mut self.volumes[last_index];
        if volume.current_size() < tail {
            let number = volume.number();
            let path = volume.path().display().to_string();
            volume.set_size(tail).map_err(|source| Error::Truncate {
                volume: number,
                path,
                source,
            })?;
        }
        Ok(())
    }

    fn shrink_to(&mut self, new_size: u64) -> Result<()> {
        let mut start = 0u64;
        let mut keep = self.volumes.len();
        for (i, volume) in self.volumes.iter_mut().enumerate() {
            if new_size <= start {
                keep = i;
                break;
            }
            let end = start + volume.current_size();
            if new_size < end {
                let number = volume.number();
                let path = volume.path().display().to_string();
                volume
                    .set_size(new_size - start)
                    .map_err(|source| Error::Truncate {
                        volume: number,
                        path,
                        source,
                    })?;
                keep = i + 1;
                break;
            }
            start = end;
        }

        while self.volumes.len() > keep {
            let Some(volume) = self.volumes.pop() else {
                break;
            };
            let number = volume.number();
            let path = volume.path().to_path_buf();
            drop(volume);
            std::fs::remove_file(&path).map_err(|source| Error::Truncate {
                volume: number,
                path: path.display().to_string(),
                source,
            })?;
            log::debug!("Removed volume {} at '{}'", number, path.display());
        }
        Ok(())
    }
}

impl Write for MultiVolumeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.normalize()?;
        let index = self.current_volume;
        self.ensure_volume(index)?;

        let room = self.volume_size() - self.volume_offset;
        let to_write = (buf.len() as u64).min(room) as usize;

        let volume = &mut self.volumes[index];
        if volume.current_offset() != self.volume_offset {
            volume.seek(self.volume_offset)?;
        }
        let n = volume.write(&buf[..to_write])?;

        self.volume_offset += n as u64;
        self.position += n as u64;
        self.full_size = self.full_size.max(self.position);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        for volume in &mut self.volumes {
            volume.flush()?;
        }
        Ok(())
    }
}

impl Seek for MultiVolumeWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::Current(d) => self.position.checked_add_signed(d),
            SeekFrom::End(d) => self.full_size.checked_add_signed(d),
        };
        let new_pos = new_pos.ok_or_else(|| invalid_seek(pos))?;

        self.position = new_pos;
        self.current_volume = 0;
        self.volume_offset = new_pos;
        Ok(new_pos)
    }
}

/// Builds the error for a seek that leaves the representable range.
pub(crate) fn invalid_seek(pos: SeekFrom) -> Error {
    let (origin, offset) = match pos {
        SeekFrom::Start(p) => ("start", p as i128),
        SeekFrom::Current(d) => ("current", d as i128),
        SeekFrom::End(d) => ("end", d as i128),
    };
    Error::InvalidSeek { origin, offset }
}

impl std::fmt::Debug for MultiVolumeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiVolumeWriter")
            .field("config", &self.config)
            .field("volume_count", &self.volumes.len())
            .field("position", &self.position)
            .field("full_size", &self.full_size)
            .finish()
    }
}
